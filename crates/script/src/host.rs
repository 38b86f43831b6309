//! Port traits for the host execution context.
//!
//! The engine wires a script node to its surrounding execution session
//! through these ports instead of handing guest code (or this crate) a
//! live host object. The runtime implements them; tests use local
//! stubs.

use std::sync::Arc;

use async_trait::async_trait;
use quasar_core::{ExecutionId, NodeId, RunMode, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ScriptError;
use crate::item::Batch;
use crate::port::{OutputPort, SupplyKind};

/// Identity of the node whose script is executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHandle {
    /// The node's unique id.
    pub id: NodeId,
    /// The node's display name, used in error messages and log fields.
    pub name: String,
}

impl NodeHandle {
    /// Create a node handle.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Which configured code text a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSlot {
    /// The produce-records script.
    Execute,
    /// The supply-capability-object script.
    Supply,
}

impl CodeSlot {
    /// Label used in configuration error messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Execute => "Execute",
            Self::Supply => "Supply",
        }
    }
}

/// Port trait for script-level structured logging.
///
/// Guest code gets a logger binding backed by this port; the runtime
/// routes entries into its logging infrastructure.
pub trait ScriptLogger: Send + Sync {
    /// Log a debug message.
    fn debug(&self, message: &str);
    /// Log an info message.
    fn info(&self, message: &str);
    /// Log a warning.
    fn warn(&self, message: &str);
    /// Log an error.
    fn error(&self, message: &str);
}

/// Port trait for the live inspection channel of interactive runs.
///
/// Fire-and-forget: implementations must not block the caller.
pub trait MessageChannel: Send + Sync {
    /// Forward one guest diagnostic message to the watching user.
    fn send(&self, message: &str);
}

/// Port trait wrapping supplied capability objects with observability.
///
/// Applied to every value returned from a supply run; implementations
/// add tracing without altering behavior and are opaque to this crate.
pub trait SupplyDecorator: Send + Sync {
    /// Wrap a supplied value.
    fn decorate(&self, value: Value, node: &NodeHandle) -> Value;
}

/// Port trait for the host execution session a run is bound to.
///
/// One implementation instance represents one node execution within one
/// workflow run. Everything a guest context exposes is bound through
/// this session, so concurrent runs (different items, nodes, workflows)
/// never cross-talk.
#[async_trait]
pub trait HostSession: Send + Sync {
    /// Unique id of the current workflow execution.
    fn execution_id(&self) -> ExecutionId;

    /// Id of the workflow being executed.
    fn workflow_id(&self) -> WorkflowId;

    /// Identity of the node being executed.
    fn node(&self) -> NodeHandle;

    /// How this execution was started.
    fn run_mode(&self) -> RunMode;

    /// The execution's cancellation token, observed cooperatively.
    fn cancellation(&self) -> CancellationToken;

    /// Whether a failed produce-records run should continue with a
    /// synthetic error item instead of aborting.
    fn continue_on_fail(&self) -> bool;

    /// The configured code text for a slot, if any.
    fn configured_code(&self, slot: CodeSlot) -> Option<String>;

    /// A configured parameter value resolved for an item, if any.
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;

    /// Snapshot of the current input batch. Each call returns a fresh
    /// copy; mutations by the receiver are never visible to the host.
    fn input_items(&self) -> Batch;

    /// The declared output ports, resolved before the run.
    fn output_ports(&self) -> Vec<OutputPort>;

    /// Structured logger handle for this session.
    fn logger(&self) -> Arc<dyn ScriptLogger>;

    /// Live inspection channel for interactive runs.
    fn message_channel(&self) -> Arc<dyn MessageChannel>;

    /// Build the data-proxy value guest code uses for workflow-level
    /// expression lookups, resolved for an item.
    fn data_proxy(&self, item_index: usize) -> Value;

    /// Fetch data supplied by the capability provider connected to the
    /// given input slot.
    async fn connection_data(&self, kind: SupplyKind, index: usize)
    -> Result<Value, ScriptError>;

    /// Execute a nested workflow with the given input items.
    async fn run_workflow(&self, workflow: Value, items: Batch) -> Result<Batch, ScriptError>;

    /// Record an incoming sub-node payload in the execution trace.
    fn record_trace_input(&self, _kind: SupplyKind, _data: Value) {}

    /// Record an outgoing sub-node payload in the execution trace.
    fn record_trace_output(&self, _kind: SupplyKind, _data: Value) {}
}
