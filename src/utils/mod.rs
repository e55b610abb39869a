pub mod time;

use nanoid::nanoid;

/// Generate a url-safe unique identifier.
pub fn longid() -> String {
    nanoid!(21)
}
