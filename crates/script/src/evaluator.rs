//! Evaluator port.
//!
//! The guest script runtime is not implemented in this crate; the
//! sandbox depends on this port and drivers implement it (the
//! `eval-inprocess` driver dispatches to natively registered programs,
//! an embedded-interpreter driver would wrap its engine here).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ScriptContext;
use crate::error::ScriptError;
use crate::policy::ModulePolicy;

/// Sink for diagnostics emitted by guest code during a run.
///
/// Exactly one sink exists per sandbox, chosen at construction from the
/// run mode. This replaces direct guest access to the host's console:
/// emissions stay attributable and never bypass the sandbox boundary.
pub trait DiagnosticSink: Send + Sync {
    /// Deliver one guest diagnostic message.
    fn emit(&self, message: &str);
}

/// Everything an evaluator needs for one evaluation.
#[derive(Clone)]
pub struct EvalRequest {
    /// The guest code text.
    pub code: String,
    /// The capability surface, injected as ambient bindings in guest
    /// scope. Fresh per run.
    pub context: Arc<ScriptContext>,
    /// The import resolver. Every module request guest code issues must
    /// go through [`ModulePolicy::resolve`]; a denial surfaces as a
    /// guest-visible load failure.
    pub resolver: Arc<ModulePolicy>,
    /// Where guest diagnostic output goes.
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for EvalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalRequest")
            .field("code_len", &self.code.len())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Port trait for evaluating guest code.
///
/// Contract for implementations:
/// - expose each context entry as a top-level binding in guest scope;
///   never hand guest code the host session itself;
/// - resolve every import through `request.resolver`;
/// - route guest print/diagnostic output through `request.diagnostics`;
/// - return the evaluation's produced value, or a [`ScriptError`]
///   carrying the guest's failure message.
///
/// Evaluation is sequential within one call; guest code suspends on
/// `await`-ing host capabilities without blocking the runtime threads
/// driving other sandboxes.
#[async_trait]
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluate the request's code once and return the produced value.
    async fn evaluate(&self, request: EvalRequest) -> Result<Value, ScriptError>;
}
