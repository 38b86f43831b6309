#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Quasar In-Process Evaluator Driver
//!
//! Implements the [`ScriptEvaluator`] port by dispatching the node's
//! configured code text to **natively registered guest programs** —
//! Rust closures that receive the run's [`EvalRequest`] and return the
//! produced value.
//!
//! This driver is used for trusted single-process deployments where
//! scripts are precompiled into the binary, and for test harnesses
//! driving the engine end-to-end. Untrusted user scripts belong in an
//! embedded-interpreter driver instead; the engine only ever talks to
//! the port.
//!
//! # Architecture
//!
//! Programs are registered at construction time, keyed by the exact
//! code text the node configuration carries. The driver's
//! responsibility is limited to dispatch and attribution — capability
//! checks stay with the context, import decisions with the resolver.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use quasar_script::{EvalRequest, ScriptError, ScriptEvaluator};
use serde_json::Value;

/// Boxed future returned by a guest program.
pub type ProgramFuture = Pin<Box<dyn Future<Output = Result<Value, ScriptError>> + Send>>;

/// A natively registered guest program.
///
/// Receives the full evaluation request: the capability context, the
/// import resolver and the diagnostic sink, exactly as an interpreter
/// driver would expose them to script code.
pub type GuestProgram = Arc<dyn Fn(EvalRequest) -> ProgramFuture + Send + Sync>;

/// Box an async closure into a [`GuestProgram`].
pub fn program<F, Fut>(body: F) -> GuestProgram
where
    F: Fn(EvalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ScriptError>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(body(request)))
}

/// In-process evaluator dispatching code texts to registered programs.
///
/// # Examples
///
/// ```rust,ignore
/// use quasar_eval_inprocess::{program, InProcessEvaluator};
///
/// let evaluator = InProcessEvaluator::new().with_program(
///     "return items",
///     program(|request| async move {
///         let items = request.context.input_items();
///         Ok(serde_json::to_value(items)?)
///     }),
/// );
/// ```
#[derive(Default)]
pub struct InProcessEvaluator {
    programs: HashMap<String, GuestProgram>,
}

impl InProcessEvaluator {
    /// Create an evaluator with no programs registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under the code text that invokes it.
    #[must_use]
    pub fn with_program(mut self, code: impl Into<String>, program: GuestProgram) -> Self {
        self.programs.insert(code.into(), program);
        self
    }

    /// Share the finished registry.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ScriptEvaluator for InProcessEvaluator {
    async fn evaluate(&self, request: EvalRequest) -> Result<Value, ScriptError> {
        let program = self.programs.get(request.code.trim()).cloned();
        let Some(program) = program else {
            return Err(ScriptError::guest(
                "no native program is registered for this code text",
                request.context.item_index,
            ));
        };

        tracing::debug!(
            node = %request.context.node.name,
            "dispatching native guest program"
        );
        let result = program(request).await;

        match &result {
            Ok(_) => tracing::debug!("guest program completed"),
            Err(e) => tracing::warn!(error = %e, "guest program failed"),
        }
        result
    }
}
