//! Guest context construction.
//!
//! A [`ScriptContext`] is the curated capability surface one run exposes
//! to guest code. The evaluator injects its entries as ambient top-level
//! bindings in guest scope; the guest never receives the host session
//! itself.

use std::sync::Arc;

use quasar_core::{ExecutionId, RunMode, WorkflowId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ScriptError;
use crate::host::{HostSession, NodeHandle, ScriptLogger};
use crate::item::{Batch, Item};
use crate::port::{OutputPort, SupplyKind};

/// Capability surface for one guest evaluation.
///
/// Built fresh for every run and owned by it exclusively — a context is
/// deliberately not `Clone` and must never be shared between two runs,
/// which is what keeps state from leaking across items and invocations.
/// Every capability method is bound to the session the context was built
/// from, so concurrent runs never observe each other's bindings.
pub struct ScriptContext {
    /// Index of the item this run is bound to.
    pub item_index: usize,
    /// Identity of the executing node.
    pub node: NodeHandle,
    /// How the surrounding execution was started.
    pub mode: RunMode,
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// The surrounding workflow execution.
    pub execution_id: ExecutionId,
    /// Cancellation signal — observed cooperatively by guest code.
    pub cancellation: CancellationToken,
    /// Materialized input batch, present only for whole-batch runs.
    items: Option<Batch>,
    host: Arc<dyn HostSession>,
    logger: Arc<dyn ScriptLogger>,
}

impl ScriptContext {
    /// Build the context for one run.
    ///
    /// `include_full_batch` snapshots the entire input batch into the
    /// context (exposed to the guest as `items`); whole-batch runs need
    /// it, per-item runs skip the copy. Construction reads
    /// already-available host state only — it performs no I/O and never
    /// invokes guest code.
    #[must_use]
    pub fn build(host: Arc<dyn HostSession>, item_index: usize, include_full_batch: bool) -> Self {
        let items = include_full_batch.then(|| host.input_items());
        Self {
            item_index,
            node: host.node(),
            mode: host.run_mode(),
            workflow_id: host.workflow_id(),
            execution_id: host.execution_id(),
            cancellation: host.cancellation(),
            items,
            logger: host.logger(),
            host,
        }
    }

    /// The materialized input batch, when built for a whole-batch run.
    #[must_use]
    pub fn items(&self) -> Option<&Batch> {
        self.items.as_ref()
    }

    /// Snapshot of the current input batch.
    #[must_use]
    pub fn input_items(&self) -> Batch {
        self.host.input_items()
    }

    /// The item this run is bound to, if the batch has one at that index.
    #[must_use]
    pub fn current_item(&self) -> Option<Item> {
        self.host.input_items().into_iter().nth(self.item_index)
    }

    /// A configured parameter value resolved for the bound item.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.host.parameter(name, self.item_index)
    }

    /// The declared output ports.
    #[must_use]
    pub fn output_ports(&self) -> Vec<OutputPort> {
        self.host.output_ports()
    }

    /// The data-proxy value for workflow-level expression lookups,
    /// resolved for the bound item.
    #[must_use]
    pub fn data_proxy(&self) -> Value {
        self.host.data_proxy(self.item_index)
    }

    /// Fetch data from the capability provider connected to an input
    /// slot. Suspends the guest until the provider resolves.
    pub async fn connection_data(
        &self,
        kind: SupplyKind,
        index: usize,
    ) -> Result<Value, ScriptError> {
        self.host.connection_data(kind, index).await
    }

    /// Execute a nested workflow. Suspends the guest until it finishes.
    pub async fn run_workflow(
        &self,
        workflow: Value,
        items: Batch,
    ) -> Result<Batch, ScriptError> {
        self.host.run_workflow(workflow, items).await
    }

    /// Record an incoming sub-node payload in the execution trace.
    pub fn record_trace_input(&self, kind: SupplyKind, data: Value) {
        self.host.record_trace_input(kind, data);
    }

    /// Record an outgoing sub-node payload in the execution trace.
    pub fn record_trace_output(&self, kind: SupplyKind, data: Value) {
        self.host.record_trace_output(kind, data);
    }

    /// Check whether the execution has been cancelled.
    ///
    /// Guest code and long-running capability calls **should** check
    /// this cooperatively; nothing interrupts a run from outside.
    pub fn check_cancelled(&self) -> Result<(), ScriptError> {
        if self.cancellation.is_cancelled() {
            Err(ScriptError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Log a debug message through the session logger.
    pub fn log_debug(&self, message: &str) {
        self.logger.debug(message);
    }

    /// Log an info message through the session logger.
    pub fn log_info(&self, message: &str) {
        self.logger.info(message);
    }

    /// Log a warning through the session logger.
    pub fn log_warn(&self, message: &str) {
        self.logger.warn(message);
    }

    /// Log an error through the session logger.
    pub fn log_error(&self, message: &str) {
        self.logger.error(message);
    }

    pub(crate) fn session(&self) -> &Arc<dyn HostSession> {
        &self.host
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("item_index", &self.item_index)
            .field("node", &self.node)
            .field("mode", &self.mode)
            .field("workflow_id", &self.workflow_id)
            .field("execution_id", &self.execution_id)
            .field("has_items", &self.items.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHost;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn build_without_full_batch_omits_items() {
        let host = TestHost::new().with_items(vec![json!({"a": 1})]).shared();
        let ctx = ScriptContext::build(host, 0, false);
        assert!(ctx.items().is_none());
        // The batch stays reachable through the data-access helper.
        assert_eq!(ctx.input_items().len(), 1);
    }

    #[test]
    fn build_with_full_batch_materializes_items() {
        let host = TestHost::new()
            .with_items(vec![json!({"a": 1}), json!({"b": 2})])
            .shared();
        let ctx = ScriptContext::build(host, 0, true);
        assert_eq!(ctx.items().map(Vec::len), Some(2));
    }

    #[test]
    fn items_are_snapshots() {
        let host = TestHost::new().with_items(vec![json!({"a": 1})]).shared();
        let ctx = ScriptContext::build(Arc::clone(&host) as Arc<dyn HostSession>, 0, true);
        let mut copy = ctx.input_items();
        copy[0].json.insert("a".into(), json!(999));
        // Host data is untouched by mutating the snapshot.
        assert_eq!(host.input_items()[0].json["a"], json!(1));
        assert_eq!(ctx.items().unwrap()[0].json["a"], json!(1));
    }

    #[test]
    fn current_item_follows_item_index() {
        let host = TestHost::new()
            .with_items(vec![json!({"a": 1}), json!({"b": 2})])
            .shared();
        let ctx = ScriptContext::build(host, 1, false);
        assert_eq!(ctx.current_item().unwrap().json["b"], json!(2));
    }

    #[test]
    fn current_item_out_of_range_is_none() {
        let host = TestHost::new().with_items(vec![json!({"a": 1})]).shared();
        let ctx = ScriptContext::build(host, 5, false);
        assert!(ctx.current_item().is_none());
    }

    #[test]
    fn identity_comes_from_the_bound_session() {
        let host = TestHost::new().with_node_name("Classifier").shared();
        let ctx = ScriptContext::build(Arc::clone(&host) as Arc<dyn HostSession>, 0, false);
        assert_eq!(ctx.node.name, "Classifier");
        assert_eq!(ctx.workflow_id, host.workflow_id());
        assert_eq!(ctx.execution_id, host.execution_id());
    }

    #[test]
    fn two_contexts_bind_their_own_sessions() {
        let host_a = TestHost::new().with_items(vec![json!({"who": "a"})]).shared();
        let host_b = TestHost::new().with_items(vec![json!({"who": "b"})]).shared();
        let ctx_a = ScriptContext::build(host_a, 0, true);
        let ctx_b = ScriptContext::build(host_b, 0, true);
        assert_eq!(ctx_a.items().unwrap()[0].json["who"], json!("a"));
        assert_eq!(ctx_b.items().unwrap()[0].json["who"], json!("b"));
        assert_ne!(ctx_a.execution_id, ctx_b.execution_id);
    }

    #[test]
    fn check_cancelled_follows_token() {
        let host = TestHost::new().shared();
        let ctx = ScriptContext::build(host, 0, false);
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancellation.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(ScriptError::Cancelled)));
    }

    #[test]
    fn logging_goes_to_the_session_logger() {
        let host = TestHost::new().shared();
        let ctx = ScriptContext::build(Arc::clone(&host) as Arc<dyn HostSession>, 0, false);
        ctx.log_info("hello");
        ctx.log_warn("careful");
        assert_eq!(host.logged(), vec!["info: hello", "warn: careful"]);
    }

    #[tokio::test]
    async fn connection_data_comes_from_the_session() {
        let host = TestHost::new()
            .with_connection(json!({"model": "m1"}))
            .shared();
        let ctx = ScriptContext::build(host, 0, false);
        let value = ctx
            .connection_data(SupplyKind::LanguageModel, 0)
            .await
            .unwrap();
        assert_eq!(value, json!({"model": "m1"}));
    }

    #[tokio::test]
    async fn missing_connection_is_a_guest_error() {
        let host = TestHost::new().shared();
        let ctx = ScriptContext::build(host, 0, false);
        let err = ctx.connection_data(SupplyKind::Memory, 0).await.unwrap_err();
        assert!(matches!(err, ScriptError::Guest { .. }));
    }

    #[tokio::test]
    async fn nested_workflow_roundtrips_items() {
        let host = TestHost::new().shared();
        let ctx = ScriptContext::build(host, 0, false);
        let sent = vec![Item::error("probe")];
        let back = ctx.run_workflow(json!({"id": "wf"}), sent.clone()).await.unwrap();
        assert_eq!(back, sent);
    }

    #[test]
    fn debug_elides_internals() {
        let host = TestHost::new().shared();
        let ctx = ScriptContext::build(host, 0, false);
        let debug = format!("{ctx:?}");
        assert!(debug.contains("ScriptContext"));
        assert!(debug.contains("item_index"));
        assert!(!debug.contains("TestHost"));
    }
}
