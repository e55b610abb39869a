//! Variable interpolation against the execution context.
//!
//! Templates reference prior node outputs with `{{path}}` markers, where the
//! path uses dot and bracket notation, e.g. `{{users[0].id}}` or
//! `{{response.data["user name"]}}`. Unresolved markers are left verbatim in
//! the output rather than failing the node; a diagnostic is logged so the
//! behavior is observable.

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::common::Vars;

/// Regex pattern for template variables.
/// Format: `{{path.to.value}}`, no nested braces.
const TEMPLATE_PATTERN: &str = r"\{\{([^}]+)\}\}";

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a dotted/bracketed path into segments.
///
/// Bracket content is an array index when it parses as a non-negative
/// integer, otherwise an object key; surrounding quotes are stripped.
/// Mixed notation like `a.b[0].c` is accepted.
fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let mut content = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    content.push(inner);
                }
                let content = content.trim_matches(|c| c == '\'' || c == '"');
                match content.parse::<usize>() {
                    Ok(index) => segments.push(Segment::Index(index)),
                    Err(_) => segments.push(Segment::Key(content.to_string())),
                }
            }
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }

    segments
}

/// Resolve a dotted/bracketed path against the execution context.
///
/// Returns `None` when the path does not resolve; a resolved JSON `null` is
/// returned as `Some(&Value::Null)` so callers can tell the two apart.
pub fn resolve_path<'a>(
    ctx: &'a Vars,
    path: &str,
) -> Option<&'a Value> {
    let mut segments = parse_path(path).into_iter();

    let mut current = match segments.next()? {
        Segment::Key(key) => ctx.get_value(&key)?,
        // the context root is a map, numeric first segments cannot resolve
        Segment::Index(_) => return None,
    };

    for segment in segments {
        current = match (current, segment) {
            (Value::Object(map), Segment::Key(key)) => map.get(&key)?,
            // object keys written as [0] address the literal string key
            (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string())?,
            (Value::Array(items), Segment::Index(index)) => items.get(index)?,
            (Value::Array(items), Segment::Key(key)) => {
                let index = key.parse::<usize>().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Replace all `{{path}}` markers in `template` with values resolved from
/// the context.
///
/// Strings render verbatim, numbers and booleans via their natural string
/// form, objects and arrays as canonical JSON. Markers that resolve to
/// nothing (or to `null`) are left untouched in the output. Idempotent on
/// strings without markers.
pub fn interpolate(
    template: &str,
    ctx: &Vars,
) -> String {
    let re = Regex::new(TEMPLATE_PATTERN).unwrap();

    re.replace_all(template, |caps: &regex::Captures| {
        let token = &caps[0];
        let path = caps[1].trim();

        match resolve_path(ctx, path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Null) | None => {
                warn!(path, available = ?ctx.keys().collect::<Vec<_>>(), "variable not found");
                token.to_string()
            }
            Some(value) => value.to_string(),
        }
    })
    .into_owned()
}

/// Default variable name for HTTP request nodes, counted across the HTTP
/// nodes of one run.
pub fn http_request_variable_name(index: usize) -> String {
    format!("httpRequest{}", index + 1)
}
