//! # Weft
//!
//! Weft is a lightweight workflow execution engine written in Rust. Users
//! compose directed acyclic graphs of typed trigger and action nodes; the
//! engine orders them, threads a shared JSON context through per-type
//! executors, and reports per-node status while every side effect runs
//! inside a durable, replayable step.
//!
//! ## Core Features
//!
//! - **Typed nodes**: a closed set of triggers and integrations (HTTP, LLM
//!   providers, chat, search) with per-type config schemas
//! - **`{{path}}` templating**: node configuration reads upstream output
//!   straight out of the run context
//! - **Durable steps**: side effects are journaled so an interrupted run
//!   resumes without repeating completed work
//! - **Live status**: every node broadcasts `loading`/`success`/`error`
//!   events for subscribers to render
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weft::{EngineBuilder, RunRequest, WorkflowModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.launch();
//!
//! let workflow = WorkflowModel::from_json(json_str)?;
//! engine.deploy(&workflow)?;
//! let execution = engine.execute(&RunRequest::new(&workflow.id, "manual")).await?;
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
pub mod executors;
pub mod graph;
mod model;
mod runtime;
mod secrets;
mod status;
mod step;
pub mod store;
pub mod template;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::Vars;
pub use config::{Config, HttpConfig};
pub use engine::Engine;
pub use error::WeftError;
pub use model::*;
pub use runtime::RunRequest;
pub use secrets::{MemSecretStore, Secret, SecretStore};
pub use status::{NodeStatus, StatusEvent, StatusFilter, StatusHub};
pub use step::{MemoryStepRunner, StepBody, StepRunner};
pub use store::{DbCollection, MemStore, Store};

/// Result type alias for Weft operations.
pub type Result<T> = std::result::Result<T, WeftError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
