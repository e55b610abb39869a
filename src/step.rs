//! Durable step primitive.
//!
//! Executors wrap their side-effecting work in named steps. A step runner
//! records the JSON result of every completed step; replaying a run with the
//! same runner returns recorded results instead of re-executing the body, so
//! a resumed run re-does only the steps that never finished. Step names are
//! scoped per run and carry the node id, keeping two nodes of the same kind
//! from sharing state.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::Result;

/// Deferred step body. Only polled when the step has no recorded result.
pub type StepBody<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Value>> + Send + 'a>;

/// Memoizing runner for named side-effecting steps.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `body` under `name`, or return the recorded result if this step
    /// already completed in a previous attempt of the same run.
    async fn run(
        &self,
        name: &str,
        body: StepBody<'_>,
    ) -> Result<Value>;
}

/// In-memory step journal for a single run.
///
/// Keep one instance alive across retries of the same execution to get
/// resume semantics; a fresh instance replays nothing.
#[derive(Default)]
pub struct MemoryStepRunner {
    completed: RwLock<HashMap<String, Value>>,
}

impl MemoryStepRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StepRunner for MemoryStepRunner {
    async fn run(
        &self,
        name: &str,
        body: StepBody<'_>,
    ) -> Result<Value> {
        if let Some(recorded) = self.completed.read().unwrap().get(name) {
            debug!("step {} replayed from journal", name);
            return Ok(recorded.clone());
        }

        let value = body().await?;
        self.completed.write().unwrap().insert(name.to_string(), value.clone());
        Ok(value)
    }
}
