//! The engine facade.
//!
//! Owns the storage, executor registry, secret store, status hub and the
//! outbound HTTP client, and exposes deploy/execute/resume on top of the run
//! coordinator. One engine serves many workflows; each run is sequential
//! within itself.

use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    Config, Result, WeftError,
    executors::ExecutorRegistry,
    model::{Execution, WorkflowModel},
    runtime::{RunRequest, Runner},
    secrets::SecretStore,
    status::StatusHub,
    step::{MemoryStepRunner, StepRunner},
    store::Store,
};

pub struct Engine {
    store: Arc<Store>,
    hub: Arc<StatusHub>,
    runner: Runner,
}

impl Engine {
    pub(crate) fn new(
        config: &Config,
        store: Arc<Store>,
        registry: ExecutorRegistry,
        secrets: Arc<dyn SecretStore>,
    ) -> Result<Self> {
        let mut http = reqwest::Client::builder().timeout(Duration::from_secs(config.http.timeout_secs));
        if let Some(user_agent) = &config.http.user_agent {
            http = http.user_agent(user_agent.clone());
        }
        let http = http.build().map_err(|e| WeftError::Engine(format!("failed to build http client: {}", e)))?;

        let hub = StatusHub::new();
        let runner = Runner::new(store.clone(), Arc::new(registry), secrets, hub.clone(), http);

        Ok(Self {
            store,
            hub,
            runner,
        })
    }

    /// Start the status dispatch loop. Must be called from within a tokio
    /// runtime; raw [`StatusHub::subscribe`] works without it.
    pub fn launch(&self) {
        self.hub.listen();
    }

    /// Validate and persist a workflow definition.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<()> {
        info!("engine::deploy({})", workflow.id);
        workflow.validate()?;
        self.store.deploy(workflow)?;
        Ok(())
    }

    /// Run a workflow to its terminal state under a fresh in-process step
    /// journal. Retries within the run are the caller's concern.
    pub async fn execute(
        &self,
        req: &RunRequest,
    ) -> Result<Execution> {
        let step = MemoryStepRunner::new();
        self.resume(req, &step).await
    }

    /// Run a workflow under an externally owned step substrate, replaying
    /// the steps it has already recorded.
    pub async fn resume(
        &self,
        req: &RunRequest,
        step: &dyn StepRunner,
    ) -> Result<Execution> {
        self.runner.run(req, step).await
    }

    /// The status hub carrying per-node lifecycle events.
    pub fn status(&self) -> Arc<StatusHub> {
        self.hub.clone()
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn workflow(
        &self,
        id: &str,
    ) -> Result<WorkflowModel> {
        self.store.load_workflow(id)
    }

    pub fn execution(
        &self,
        id: &str,
    ) -> Result<Execution> {
        self.store.executions().find(id)
    }

    /// All executions of one workflow, newest first.
    pub fn executions(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<Execution>> {
        let mut executions = self.store.executions().list_by("workflow_id", workflow_id)?;
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }

    /// Delete a workflow and every execution record it produced.
    pub fn remove_workflow(
        &self,
        id: &str,
    ) -> Result<bool> {
        for execution in self.store.executions().list_by("workflow_id", id)? {
            self.store.executions().delete(&execution.id)?;
        }
        self.store.workflows().delete(id)
    }
}
