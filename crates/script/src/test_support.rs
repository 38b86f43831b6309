//! Shared fixtures for the crate's unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use quasar_core::{ExecutionId, NodeId, RunMode, WorkflowId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ScriptError;
use crate::evaluator::{EvalRequest, ScriptEvaluator};
use crate::host::{CodeSlot, HostSession, MessageChannel, NodeHandle, ScriptLogger};
use crate::item::{Batch, Item};
use crate::policy::{ModulePolicy, PolicyConfig};
use crate::port::{OutputPort, SupplyKind};

/// A policy with empty allow-lists (baseline family only).
pub(crate) fn test_policy() -> Arc<ModulePolicy> {
    Arc::new(ModulePolicy::new(PolicyConfig::default(), "/vendored"))
}

// ── Host stub ───────────────────────────────────────────────────────────────

pub(crate) struct TestHost {
    execution_id: ExecutionId,
    workflow_id: WorkflowId,
    node: NodeHandle,
    mode: RunMode,
    items: Batch,
    ports: Vec<OutputPort>,
    continue_on_fail: bool,
    execute_code: Option<String>,
    supply_code: Option<String>,
    connection: Option<Value>,
    cancellation: CancellationToken,
    logged: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        Self {
            execution_id: ExecutionId::v4(),
            workflow_id: WorkflowId::v4(),
            node: NodeHandle::new(NodeId::v4(), "Test Node"),
            mode: RunMode::Trigger,
            items: Batch::new(),
            ports: vec![OutputPort::flow("out")],
            continue_on_fail: false,
            execute_code: None,
            supply_code: None,
            connection: None,
            cancellation: CancellationToken::new(),
            logged: Arc::new(Mutex::new(Vec::new())),
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_items(mut self, items: Vec<Value>) -> Self {
        self.items = items
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => Item::new(map),
                other => panic!("test items must be objects, got {other:?}"),
            })
            .collect();
        self
    }

    pub(crate) fn with_node_name(mut self, name: &str) -> Self {
        self.node.name = name.to_owned();
        self
    }

    pub(crate) fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn with_ports(mut self, ports: Vec<OutputPort>) -> Self {
        self.ports = ports;
        self
    }

    pub(crate) fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub(crate) fn with_execute_code(mut self, code: &str) -> Self {
        self.execute_code = Some(code.to_owned());
        self
    }

    pub(crate) fn with_supply_code(mut self, code: &str) -> Self {
        self.supply_code = Some(code.to_owned());
        self
    }

    pub(crate) fn with_connection(mut self, data: Value) -> Self {
        self.connection = Some(data);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn logged(&self) -> Vec<String> {
        self.logged.lock().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub(crate) fn cancel(&self) {
        self.cancellation.cancel();
    }
}

#[async_trait]
impl HostSession for TestHost {
    fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    fn node(&self) -> NodeHandle {
        self.node.clone()
    }

    fn run_mode(&self) -> RunMode {
        self.mode
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    fn configured_code(&self, slot: CodeSlot) -> Option<String> {
        match slot {
            CodeSlot::Execute => self.execute_code.clone(),
            CodeSlot::Supply => self.supply_code.clone(),
        }
    }

    fn parameter(&self, _name: &str, _item_index: usize) -> Option<Value> {
        None
    }

    fn input_items(&self) -> Batch {
        self.items.clone()
    }

    fn output_ports(&self) -> Vec<OutputPort> {
        self.ports.clone()
    }

    fn logger(&self) -> Arc<dyn ScriptLogger> {
        Arc::new(BufferLogger {
            buffer: Arc::clone(&self.logged),
        })
    }

    fn message_channel(&self) -> Arc<dyn MessageChannel> {
        Arc::new(BufferChannel {
            buffer: Arc::clone(&self.messages),
        })
    }

    fn data_proxy(&self, item_index: usize) -> Value {
        serde_json::json!({
            "workflow_id": self.workflow_id.to_string(),
            "item_index": item_index,
        })
    }

    async fn connection_data(
        &self,
        kind: SupplyKind,
        _index: usize,
    ) -> Result<Value, ScriptError> {
        self.connection
            .clone()
            .ok_or_else(|| ScriptError::guest(format!("no {kind:?} connection"), 0))
    }

    async fn run_workflow(&self, _workflow: Value, items: Batch) -> Result<Batch, ScriptError> {
        Ok(items)
    }
}

struct BufferLogger {
    buffer: Arc<Mutex<Vec<String>>>,
}

impl ScriptLogger for BufferLogger {
    fn debug(&self, message: &str) {
        self.buffer.lock().push(format!("debug: {message}"));
    }

    fn info(&self, message: &str) {
        self.buffer.lock().push(format!("info: {message}"));
    }

    fn warn(&self, message: &str) {
        self.buffer.lock().push(format!("warn: {message}"));
    }

    fn error(&self, message: &str) {
        self.buffer.lock().push(format!("error: {message}"));
    }
}

struct BufferChannel {
    buffer: Arc<Mutex<Vec<String>>>,
}

impl MessageChannel for BufferChannel {
    fn send(&self, message: &str) {
        self.buffer.lock().push(message.to_owned());
    }
}

// ── Evaluator stub ──────────────────────────────────────────────────────────

type StubFn = Box<dyn Fn(EvalRequest) -> Result<Value, ScriptError> + Send + Sync>;

/// Evaluator double driven by a synchronous closure.
pub(crate) struct StubEvaluator {
    respond: StubFn,
}

impl StubEvaluator {
    pub(crate) fn new(
        respond: impl Fn(EvalRequest) -> Result<Value, ScriptError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
        }
    }

    /// Always returns the given value.
    pub(crate) fn returning(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Always fails with a guest error carrying the given message.
    pub(crate) fn failing(message: &str) -> Self {
        let message = message.to_owned();
        Self::new(move |request| {
            Err(ScriptError::guest(message.clone(), request.context.item_index))
        })
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ScriptEvaluator for StubEvaluator {
    async fn evaluate(&self, request: EvalRequest) -> Result<Value, ScriptError> {
        (self.respond)(request)
    }
}
