//! Persistent document shapes.
//!
//! The workflow definition is stored as its serialized JSON under `data`;
//! executions are stored as-is since their model is already flat.

use serde::{Deserialize, Serialize};

use crate::{
    model::Execution,
    store::{DbCollectionIden, StoreIden},
};

/// Stored workflow definition.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Workflow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    /// serialized [`crate::model::WorkflowModel`]
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl DbCollectionIden for Workflow {
    fn iden() -> StoreIden {
        StoreIden::Workflows
    }
}

impl DbCollectionIden for Execution {
    fn iden() -> StoreIden {
        StoreIden::Executions
    }
}
