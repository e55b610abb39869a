//! Run coordination.

mod runner;

pub use runner::{RunRequest, Runner};
