mod connection;
mod execution;
mod node;
mod workflow;

pub use connection::ConnectionModel;
pub use execution::{Execution, ExecutionStatus};
pub use node::{NodeId, NodeModel, NodeType, Position};
pub use workflow::WorkflowModel;
