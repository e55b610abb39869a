use serde::{Deserialize, Serialize};

use crate::{common::Vars, utils};

/// Terminal-or-running state of one workflow run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Running,
    Success,
    Error,
}

/// One run of a workflow.
///
/// Created with status `running`; receives exactly one terminal update
/// (success plus result, or error plus message) and is never mutated
/// afterward.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    /// free-form trigger label, e.g. "manual", "webhook-form", "webhook-payment"
    pub trigger_type: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    /// final merged context, present only on success
    pub result: Option<Vars>,
    /// raised message, present only on error
    pub error: Option<String>,
}

impl Execution {
    pub fn start(
        workflow_id: impl Into<String>,
        trigger_type: impl Into<String>,
    ) -> Self {
        Self {
            id: utils::longid(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            trigger_type: trigger_type.into(),
            started_at: utils::time::time_millis(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Close the record successfully with the final cleaned context.
    pub fn succeed(
        mut self,
        result: Vars,
    ) -> Self {
        self.status = ExecutionStatus::Success;
        self.result = Some(result);
        self.completed_at = Some(utils::time::time_millis());
        self
    }

    /// Close the record with the raised message. No partial result is kept.
    pub fn fail(
        mut self,
        error: impl Into<String>,
    ) -> Self {
        self.status = ExecutionStatus::Error;
        self.error = Some(error.into());
        self.result = None;
        self.completed_at = Some(utils::time::time_millis());
        self
    }
}
