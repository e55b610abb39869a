//! Per-node status events for live run observation.
//!
//! Every node emits `loading` when it is picked up, then exactly one of
//! `success` or `error`. Delivery is fire-and-forget: a run never fails or
//! blocks because nobody is watching.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    Result, ShareLock, WeftError,
    common::BroadcastQueue,
    model::{NodeId, NodeModel, NodeType},
    utils,
};

const STATUS_QUEUE_SIZE: usize = 2048;

pub type StatusHandle = Arc<dyn Fn(&StatusEvent) + Send + Sync>;
pub type StatusHandleAsync = Arc<dyn Fn(&StatusEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle phase of one node within one run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeStatus {
    Loading,
    Success,
    Error,
}

/// One status transition of one node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub workflow_id: String,
    pub execution_id: String,
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub timestamp: i64,
}

impl StatusEvent {
    pub fn new(
        execution_id: impl Into<String>,
        node: &NodeModel,
        status: NodeStatus,
    ) -> Self {
        Self {
            workflow_id: node.workflow_id.clone(),
            execution_id: execution_id.into(),
            node_id: node.id.clone(),
            node_type: node.node_type,
            status,
            timestamp: utils::time::time_millis(),
        }
    }
}

/// Glob filters for selective subscription.
///
/// `*` matches everything; `wf42*` narrows to ids with that prefix.
#[derive(Debug, Clone)]
pub struct StatusFilter {
    pub workflow_id: String,
    pub node_id: String,
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self {
            workflow_id: "*".to_string(),
            node_id: "*".to_string(),
        }
    }
}

impl StatusFilter {
    pub fn with_workflow(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            node_id: "*".to_string(),
        }
    }

    pub fn with_node(node_id: impl Into<String>) -> Self {
        Self {
            workflow_id: "*".to_string(),
            node_id: node_id.into(),
        }
    }

    fn compile(&self) -> Result<(globset::GlobMatcher, globset::GlobMatcher)> {
        let workflow = globset::Glob::new(&self.workflow_id)
            .map_err(|e| WeftError::Validation(format!("bad workflow filter: {}", e)))?
            .compile_matcher();
        let node = globset::Glob::new(&self.node_id)
            .map_err(|e| WeftError::Validation(format!("bad node filter: {}", e)))?
            .compile_matcher();
        Ok((workflow, node))
    }
}

/// Broadcast hub that fans node status events out to subscribers.
#[derive(Clone)]
pub struct StatusHub {
    queue: Arc<BroadcastQueue<StatusEvent>>,
    handles: ShareLock<Vec<StatusHandle>>,
    handles_async: ShareLock<Vec<StatusHandleAsync>>,
}

impl StatusHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: BroadcastQueue::new(STATUS_QUEUE_SIZE),
            handles: Arc::new(RwLock::new(Vec::new())),
            handles_async: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Publish an event. Never fails the caller; a full or unwatched queue is
    /// logged and dropped.
    pub fn publish(
        &self,
        event: StatusEvent,
    ) {
        if self.queue.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.queue.send(event) {
            warn!("status event dropped: {}", e);
        }
    }

    /// Raw subscription; the receiver sees every event from this point on.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StatusEvent> {
        self.queue.subscribe()
    }

    /// Register a callback for events matching the filter.
    ///
    /// Requires [`StatusHub::listen`] to have been started.
    pub fn on_status(
        &self,
        filter: StatusFilter,
        f: impl Fn(&StatusEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        let glob = filter.compile()?;
        self.handles.write().unwrap().push(Arc::new(move |e: &StatusEvent| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
        Ok(())
    }

    /// Register an async callback for events matching the filter.
    pub fn on_status_async<F>(
        &self,
        filter: StatusFilter,
        f: F,
    ) -> Result<()>
    where
        F: Fn(&StatusEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = filter.compile()?;
        self.handles_async.write().unwrap().push(Arc::new(move |e: &StatusEvent| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
        Ok(())
    }

    /// Start the dispatch loop feeding registered callbacks.
    ///
    /// The loop ends when the hub is dropped. Callbacks registered after
    /// `listen` still receive subsequent events.
    pub fn listen(self: &Arc<Self>) {
        let mut receiver = self.queue.subscribe();
        let handles = self.handles.clone();
        let handles_async = self.handles_async.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let handlers = handles.read().unwrap().clone();
                        for handle in handlers.iter() {
                            (handle)(&event);
                        }

                        let handlers = handles_async.read().unwrap().clone();
                        let event = event.clone();
                        tokio::spawn(async move {
                            for handle in handlers.iter() {
                                (handle)(&event).await;
                            }
                        });
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("status subscriber lagged, skipped {} events", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &StatusEvent,
) -> bool {
    let (pat_workflow, pat_node) = glob;
    pat_workflow.is_match(&e.workflow_id) && pat_node.is_match(&e.node_id)
}
