//! The run coordinator.
//!
//! Walks a workflow's nodes in topological order, one at a time, threading
//! the shared context through the executors. An execution record moves from
//! `running` to exactly one of `success` or `error`; a failed node skips
//! everything after it. All durable work happens through the injected
//! [`StepRunner`], so re-running a failed execution with the same runner
//! replays completed steps instead of re-executing them.

use std::{collections::HashMap, sync::Arc};

use tracing::{info, warn};

use crate::{
    Result, WeftError,
    common::Vars,
    executors::{ALL_RESPONSES_KEY, ExecutorInput, ExecutorRegistry},
    graph,
    model::{Execution, ExecutionStatus, NodeModel, NodeType, WorkflowModel},
    secrets::SecretStore,
    status::{NodeStatus, StatusEvent, StatusHub},
    step::StepRunner,
    store::Store,
    template,
};

/// One request to run a workflow.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub workflow_id: String,
    /// free-form trigger label, e.g. "manual", "webhook-form"
    pub trigger_type: String,
    /// payload seeded into the context before the first node
    pub initial_data: Vars,
    /// maps stored node ids to the ids the subscriber correlates status
    /// events by; unmapped ids pass through unchanged
    pub node_id_mapping: HashMap<String, String>,
    /// resume an existing execution instead of opening a new record
    pub execution_id: Option<String>,
}

impl RunRequest {
    pub fn new(
        workflow_id: impl Into<String>,
        trigger_type: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            trigger_type: trigger_type.into(),
            ..Default::default()
        }
    }

    pub fn with_initial_data(
        mut self,
        initial_data: Vars,
    ) -> Self {
        self.initial_data = initial_data;
        self
    }
}

/// Drives a single workflow run to its terminal state.
#[derive(Clone)]
pub struct Runner {
    store: Arc<Store>,
    registry: Arc<ExecutorRegistry>,
    secrets: Arc<dyn SecretStore>,
    hub: Arc<StatusHub>,
    http: reqwest::Client,
}

impl Runner {
    pub fn new(
        store: Arc<Store>,
        registry: Arc<ExecutorRegistry>,
        secrets: Arc<dyn SecretStore>,
        hub: Arc<StatusHub>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            registry,
            secrets,
            hub,
            http,
        }
    }

    /// Run the workflow named by `req` under the given step substrate.
    pub async fn run(
        &self,
        req: &RunRequest,
        step: &dyn StepRunner,
    ) -> Result<Execution> {
        let (workflow, execution) = self.prepare(req, step).await?;
        info!("runner::run({}) execution {}", workflow.id, execution.id);

        if let Err(e) = workflow.validate() {
            self.close_error(&execution, &e);
            return Err(e);
        }

        // a cycle aborts before any node executes
        let ordered = match graph::order_nodes(&workflow.nodes, &workflow.connections) {
            Ok(ordered) => ordered,
            Err(e) => {
                self.close_error(&execution, &e);
                return Err(e);
            }
        };

        let mut context = req.initial_data.clone();
        let mut http_index = 0;
        for node in ordered {
            let node = self.prepare_node(node, req, &mut http_index);
            self.hub.publish(StatusEvent::new(&execution.id, &node, NodeStatus::Loading));

            let result = match self.registry.get(node.node_type) {
                Ok(executor) => {
                    executor
                        .execute(ExecutorInput {
                            node: &node,
                            execution_id: &execution.id,
                            owner_id: &workflow.owner_id,
                            context: context.clone(),
                            step,
                            secrets: self.secrets.as_ref(),
                            hub: &self.hub,
                            http: &self.http,
                        })
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(next) => {
                    context = next;
                    self.hub.publish(StatusEvent::new(&execution.id, &node, NodeStatus::Success));
                }
                Err(e) => {
                    self.hub.publish(StatusEvent::new(&execution.id, &node, NodeStatus::Error));
                    self.close_error(&execution, &e);
                    return Err(e);
                }
            }
        }

        context.remove(ALL_RESPONSES_KEY);
        let closed = execution.succeed(context);
        self.store.executions().update(&closed)?;
        Ok(closed)
    }

    /// Load the workflow and open (or re-open) the execution record inside a
    /// durable step, so a resumed run keeps its workflow snapshot and id.
    async fn prepare(
        &self,
        req: &RunRequest,
        step: &dyn StepRunner,
    ) -> Result<(WorkflowModel, Execution)> {
        let store = self.store.clone();
        let workflow_id = req.workflow_id.clone();
        let trigger_type = req.trigger_type.clone();
        let execution_id = req.execution_id.clone();

        let prepared = step
            .run(
                "prepare-workflow",
                Box::new(move || {
                    Box::pin(async move {
                        let workflow = store.load_workflow(&workflow_id)?;
                        let execution = match &execution_id {
                            Some(id) => store.executions().find(id)?,
                            None => {
                                let execution = Execution::start(&workflow_id, &trigger_type);
                                store.executions().create(&execution)?;
                                execution
                            }
                        };
                        Ok(serde_json::to_value((workflow, execution))?)
                    })
                }),
            )
            .await?;
        let (workflow, mut execution): (WorkflowModel, Execution) = serde_json::from_value(prepared)?;

        // re-open the record when resuming a failed run
        execution.status = ExecutionStatus::Running;
        execution.error = None;
        execution.result = None;
        execution.completed_at = None;
        self.store.executions().update(&execution)?;

        Ok((workflow, execution))
    }

    /// Remap the node id for status correlation and assign the positional
    /// default output variable to unnamed HTTP nodes.
    fn prepare_node(
        &self,
        mut node: NodeModel,
        req: &RunRequest,
        http_index: &mut usize,
    ) -> NodeModel {
        if let Some(mapped) = req.node_id_mapping.get(&node.id) {
            node.id = mapped.clone();
        }
        if node.node_type == NodeType::HttpRequest {
            if node.data.get_str("variableName").is_none() {
                node.data.set("variableName", template::http_request_variable_name(*http_index));
            }
            *http_index += 1;
        }
        node
    }

    /// Close the record as failed. A storage failure here must not mask the
    /// node error that is being raised.
    fn close_error(
        &self,
        execution: &Execution,
        error: &WeftError,
    ) {
        let closed = execution.clone().fail(error.to_string());
        if let Err(store_err) = self.store.executions().update(&closed) {
            warn!("failed to record execution {} error: {}", execution.id, store_err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        executors::{Executor, step_name, variable_name},
        model::{ConnectionModel, NodeModel},
        secrets::MemSecretStore,
        step::MemoryStepRunner,
        store::{DbStore, MemStore},
        template,
    };

    /// Stands in for the HTTP executor; records the canned payload inside a
    /// durable step like the real one does.
    struct StubHttp {
        payload: Value,
        calls: Arc<AtomicUsize>,
        fail_first: Arc<AtomicUsize>,
    }

    impl StubHttp {
        fn new(payload: Value) -> Self {
            Self {
                payload,
                calls: Arc::new(AtomicUsize::new(0)),
                fail_first: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Executor for StubHttp {
        fn node_type(&self) -> NodeType {
            NodeType::HttpRequest
        }

        async fn execute(
            &self,
            input: ExecutorInput<'_>,
        ) -> Result<Vars> {
            let payload = self.payload.clone();
            let calls = self.calls.clone();
            let value = input
                .step
                .run(
                    &step_name(input.node),
                    Box::new(move || {
                        Box::pin(async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(payload)
                        })
                    }),
                )
                .await?;
            let variable = variable_name(&input.node.data, "response");
            let mut context = input.context;
            context.set(variable, value);
            Ok(context)
        }
    }

    /// Stands in for an LLM executor; "generates" by echoing the rendered
    /// prompt, optionally failing a configured number of times first.
    struct StubLlm {
        fail_times: Arc<AtomicUsize>,
    }

    impl StubLlm {
        fn new() -> Self {
            Self {
                fail_times: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(times: usize) -> Self {
            Self {
                fail_times: Arc::new(AtomicUsize::new(times)),
            }
        }
    }

    #[async_trait]
    impl Executor for StubLlm {
        fn node_type(&self) -> NodeType {
            NodeType::Openai
        }

        async fn execute(
            &self,
            input: ExecutorInput<'_>,
        ) -> Result<Vars> {
            let prompt = input
                .node
                .data
                .get_str("prompt")
                .ok_or_else(|| WeftError::Validation("Prompt is required".to_string()))?;
            let rendered = template::interpolate(&prompt, &input.context);

            let fail_times = self.fail_times.clone();
            let generated = input
                .step
                .run(
                    &step_name(input.node),
                    Box::new(move || {
                        Box::pin(async move {
                            if fail_times.load(Ordering::SeqCst) > 0 {
                                fail_times.fetch_sub(1, Ordering::SeqCst);
                                return Err(WeftError::Upstream("provider unavailable".to_string()));
                            }
                            Ok(Value::String(rendered))
                        })
                    }),
                )
                .await?;

            let mut context = input.context;
            context.set(variable_name(&input.node.data, "openai"), generated);
            Ok(context)
        }
    }

    struct Fixture {
        runner: Runner,
        store: Arc<Store>,
        hub: Arc<StatusHub>,
        workflow: WorkflowModel,
        node_ids: Vec<String>,
    }

    /// trigger -> http -> llm, with the llm prompt reading the http output.
    fn linear_fixture(
        http: StubHttp,
        llm: StubLlm,
    ) -> Fixture {
        let store = Arc::new(Store::new());
        MemStore::new().init(&store);

        let mut registry = ExecutorRegistry::default();
        registry.register(Arc::new(http));
        registry.register(Arc::new(llm));

        let hub = StatusHub::new();
        let runner = Runner::new(
            store.clone(),
            Arc::new(registry),
            Arc::new(MemSecretStore::new()),
            hub.clone(),
            reqwest::Client::new(),
        );

        let mut workflow = WorkflowModel::new("user1", "flow", "");
        let trigger = NodeModel::new(workflow.id.clone(), "Start", NodeType::ManualTrigger, Vars::new());
        let mut data = Vars::new();
        data.set("endpoint", "https://api.test/users");
        data.set("variableName", "users");
        let fetch = NodeModel::new(workflow.id.clone(), "Fetch", NodeType::HttpRequest, data);
        let mut data = Vars::new();
        data.set("prompt", "id={{users[0].id}}");
        let generate = NodeModel::new(workflow.id.clone(), "Generate", NodeType::Openai, data);

        let node_ids = vec![trigger.id.clone(), fetch.id.clone(), generate.id.clone()];
        let connections = vec![
            ConnectionModel::new(workflow.id.clone(), trigger.id.clone(), fetch.id.clone()),
            ConnectionModel::new(workflow.id.clone(), fetch.id.clone(), generate.id.clone()),
        ];
        workflow.replace_graph(vec![trigger, fetch, generate], connections).unwrap();
        store.deploy(&workflow).unwrap();

        Fixture {
            runner,
            store,
            hub,
            workflow,
            node_ids,
        }
    }

    fn drain(receiver: &mut tokio::sync::broadcast::Receiver<StatusEvent>) -> Vec<(String, NodeStatus)> {
        let mut events = Vec::new();
        while let Ok(e) = receiver.try_recv() {
            events.push((e.node_id, e.status));
        }
        events
    }

    #[tokio::test]
    async fn test_linear_run_threads_context_through() {
        let fixture = linear_fixture(StubHttp::new(json!([{"id": 7}])), StubLlm::new());
        let mut receiver = fixture.hub.subscribe();

        let req = RunRequest::new(&fixture.workflow.id, "manual");
        let step = MemoryStepRunner::new();
        let execution = fixture.runner.run(&req, &step).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Success);
        let result = execution.result.unwrap();
        assert_eq!(result.get::<String>("openai"), Some("id=7".to_string()));
        assert_eq!(result.get_value("users"), Some(&json!([{"id": 7}])));
        assert!(!result.contains_key("allHttpResponses"));

        let events = drain(&mut receiver);
        let expected: Vec<(String, NodeStatus)> = fixture
            .node_ids
            .iter()
            .flat_map(|id| vec![(id.clone(), NodeStatus::Loading), (id.clone(), NodeStatus::Success)])
            .collect();
        assert_eq!(events, expected);

        // terminal record persisted
        let stored = fixture.store.executions().find(&execution.id).unwrap();
        assert_eq!(stored.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_failure_skips_downstream_and_keeps_no_result() {
        struct Failing;

        #[async_trait]
        impl Executor for Failing {
            fn node_type(&self) -> NodeType {
                NodeType::HttpRequest
            }

            async fn execute(
                &self,
                _input: ExecutorInput<'_>,
            ) -> Result<Vars> {
                Err(WeftError::Upstream("boom".to_string()))
            }
        }

        let fixture = linear_fixture(StubHttp::new(json!(null)), StubLlm::new());
        // swap the stub http for one that always fails
        let mut registry = ExecutorRegistry::default();
        registry.register(Arc::new(Failing));
        registry.register(Arc::new(StubLlm::new()));
        let runner = Runner::new(
            fixture.store.clone(),
            Arc::new(registry),
            Arc::new(MemSecretStore::new()),
            fixture.hub.clone(),
            reqwest::Client::new(),
        );
        let mut receiver = fixture.hub.subscribe();

        let req = RunRequest::new(&fixture.workflow.id, "manual");
        let step = MemoryStepRunner::new();
        let err = runner.run(&req, &step).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let events = drain(&mut receiver);
        let [trigger_id, fetch_id, generate_id] = &fixture.node_ids[..] else {
            unreachable!()
        };
        assert_eq!(
            events,
            vec![
                (trigger_id.clone(), NodeStatus::Loading),
                (trigger_id.clone(), NodeStatus::Success),
                (fetch_id.clone(), NodeStatus::Loading),
                (fetch_id.clone(), NodeStatus::Error),
            ]
        );
        assert!(!events.iter().any(|(id, _)| id == generate_id));

        let executions = fixture.store.executions().list_by("workflow_id", &fixture.workflow.id).unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Error);
        assert_eq!(executions[0].error.as_deref(), Some("boom"));
        assert!(executions[0].result.is_none());
    }

    #[tokio::test]
    async fn test_resume_replays_completed_steps() {
        let http = StubHttp::new(json!([{"id": 7}]));
        let http_calls = http.calls.clone();
        let fixture = linear_fixture(http, StubLlm::failing(1));

        let req = RunRequest::new(&fixture.workflow.id, "manual");
        let step = MemoryStepRunner::new();

        let err = fixture.runner.run(&req, &step).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(http_calls.load(Ordering::SeqCst), 1);

        // same journal: trigger and http replay, only the llm re-executes
        let execution = fixture.runner.run(&req, &step).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(http_calls.load(Ordering::SeqCst), 1);
        assert_eq!(execution.result.unwrap().get::<String>("openai"), Some("id=7".to_string()));

        // both attempts share one execution record
        let executions = fixture.store.executions().list_by("workflow_id", &fixture.workflow.id).unwrap();
        assert_eq!(executions.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_closes_record_before_any_node_runs() {
        let http = StubHttp::new(json!({"ok": true}));
        let http_calls = http.calls.clone();
        let fixture = linear_fixture(http, StubLlm::new());
        let mut receiver = fixture.hub.subscribe();

        // wire the stored snapshot into a cycle, bypassing deploy-time checks
        let mut workflow = fixture.workflow.clone();
        let [trigger_id, fetch_id, generate_id] = &fixture.node_ids[..] else {
            unreachable!()
        };
        workflow.connections = vec![
            ConnectionModel::new(workflow.id.clone(), trigger_id.clone(), fetch_id.clone()),
            ConnectionModel::new(workflow.id.clone(), fetch_id.clone(), generate_id.clone()),
            ConnectionModel::new(workflow.id.clone(), generate_id.clone(), fetch_id.clone()),
        ];
        fixture.store.deploy(&workflow).unwrap();

        let req = RunRequest::new(&workflow.id, "manual");
        let step = MemoryStepRunner::new();
        let err = fixture.runner.run(&req, &step).await.unwrap_err();
        assert!(matches!(err, WeftError::Cycle(_)));

        assert_eq!(http_calls.load(Ordering::SeqCst), 0);
        assert!(drain(&mut receiver).is_empty());

        let executions = fixture.store.executions().list_by("workflow_id", &workflow.id).unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn test_unnamed_http_nodes_get_positional_variables() {
        let store = Arc::new(Store::new());
        MemStore::new().init(&store);

        let mut registry = ExecutorRegistry::default();
        registry.register(Arc::new(StubHttp::new(json!({"ok": true}))));

        let hub = StatusHub::new();
        let runner = Runner::new(
            store.clone(),
            Arc::new(registry),
            Arc::new(MemSecretStore::new()),
            hub,
            reqwest::Client::new(),
        );

        let mut workflow = WorkflowModel::new("user1", "flow", "");
        let trigger = NodeModel::new(workflow.id.clone(), "Start", NodeType::ManualTrigger, Vars::new());
        let mut data = Vars::new();
        data.set("endpoint", "https://api.test/a");
        let first = NodeModel::new(workflow.id.clone(), "A", NodeType::HttpRequest, data);
        let mut data = Vars::new();
        data.set("endpoint", "https://api.test/b");
        let second = NodeModel::new(workflow.id.clone(), "B", NodeType::HttpRequest, data);
        let connections = vec![
            ConnectionModel::new(workflow.id.clone(), trigger.id.clone(), first.id.clone()),
            ConnectionModel::new(workflow.id.clone(), first.id.clone(), second.id.clone()),
        ];
        workflow.replace_graph(vec![trigger, first, second], connections).unwrap();
        store.deploy(&workflow).unwrap();

        let req = RunRequest::new(&workflow.id, "manual");
        let step = MemoryStepRunner::new();
        let execution = runner.run(&req, &step).await.unwrap();

        let result = execution.result.unwrap();
        assert!(result.contains_key("httpRequest1"));
        assert!(result.contains_key("httpRequest2"));
    }
}
