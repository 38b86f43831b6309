//! One bound guest evaluation session.
//!
//! A [`Sandbox`] ties together a code text, a fresh [`ScriptContext`],
//! the process module policy as the evaluator's resolver, and the
//! diagnostic sink for the run mode. It exposes the two run operations
//! the orchestrator chooses between and performs no retries — failures
//! propagate as typed errors.

use std::sync::Arc;

use quasar_core::WorkflowId;
use serde_json::Value;

use crate::context::ScriptContext;
use crate::error::ScriptError;
use crate::evaluator::{DiagnosticSink, EvalRequest, ScriptEvaluator};
use crate::host::{MessageChannel, NodeHandle};
use crate::item::{items_from_guest, value_kind, Batch, Item};
use crate::policy::ModulePolicy;

/// Options for a whole-batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunAllOptions {
    /// When `true`, the guest must return one sequence of items per
    /// declared record-flow output channel.
    pub multi_output: bool,
}

/// Items produced by a whole-batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// One batch for the sole record-flow channel.
    Single(Batch),
    /// One batch per record-flow channel, in channel order.
    Multi(Vec<Batch>),
}

/// A single guest evaluation session.
///
/// Sessions are built per run by the orchestrator. The context is owned
/// by the session and never reused — repeating a run means building a
/// fresh context and a fresh sandbox.
pub struct Sandbox {
    code: String,
    context: Arc<ScriptContext>,
    policy: Arc<ModulePolicy>,
    evaluator: Arc<dyn ScriptEvaluator>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Sandbox {
    /// Bind a session from its parts.
    ///
    /// The diagnostic sink is chosen here, once, from the run mode:
    /// interactive runs forward guest output to the session's live
    /// message channel, production runs land it in the process log
    /// annotated with the owning workflow and node.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        context: ScriptContext,
        policy: Arc<ModulePolicy>,
        evaluator: Arc<dyn ScriptEvaluator>,
    ) -> Self {
        let diagnostics: Arc<dyn DiagnosticSink> = if context.mode.is_interactive() {
            Arc::new(InteractiveSink {
                channel: context.session().message_channel(),
            })
        } else {
            Arc::new(ExecutionLogSink {
                workflow_id: context.workflow_id,
                node: context.node.clone(),
            })
        };
        Self {
            code: code.into(),
            context: Arc::new(context),
            policy,
            evaluator,
            diagnostics,
        }
    }

    /// Evaluate once and return the produced value as-is.
    ///
    /// Used for supply runs: the value is the capability object handed
    /// to the connected node.
    pub async fn run_supply(&self) -> Result<Value, ScriptError> {
        self.context.check_cancelled()?;
        tracing::debug!(node = %self.context.node.name, "evaluating supply script");
        self.evaluator.evaluate(self.request()).await
    }

    /// Evaluate once against the whole input batch and convert the
    /// produced value into output items.
    ///
    /// Single-channel runs accept a sequence of items (or a lone item
    /// object). Multi-channel runs demand one sequence per channel —
    /// any other shape is a [`ScriptError::OutputShapeMismatch`], never
    /// silently flattened.
    pub async fn run_all_items(&self, options: RunAllOptions) -> Result<RunOutput, ScriptError> {
        self.context.check_cancelled()?;
        tracing::debug!(
            node = %self.context.node.name,
            multi_output = options.multi_output,
            "evaluating whole-batch script"
        );
        let value = self.evaluator.evaluate(self.request()).await?;
        let item_index = self.context.item_index;
        if options.multi_output {
            Self::split_channels(value, item_index)
        } else {
            items_from_guest(value, item_index).map(RunOutput::Single)
        }
    }

    fn split_channels(value: Value, item_index: usize) -> Result<RunOutput, ScriptError> {
        let Value::Array(channels) = value else {
            return Err(ScriptError::shape(format!("got {}", value_kind(&value))));
        };
        let mut batches = Vec::with_capacity(channels.len());
        for channel in channels {
            let Value::Array(entries) = channel else {
                return Err(ScriptError::shape(format!(
                    "channel entry is {}, expected an array",
                    value_kind(&channel)
                )));
            };
            batches.push(
                entries
                    .into_iter()
                    .map(|v| Item::from_guest(v, item_index))
                    .collect::<Result<Batch, _>>()?,
            );
        }
        Ok(RunOutput::Multi(batches))
    }

    fn request(&self) -> EvalRequest {
        EvalRequest {
            code: self.code.clone(),
            context: Arc::clone(&self.context),
            resolver: Arc::clone(&self.policy),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}

// ── Diagnostic sinks ────────────────────────────────────────────────────────

/// Forwards guest diagnostics to the live inspection channel.
struct InteractiveSink {
    channel: Arc<dyn MessageChannel>,
}

impl DiagnosticSink for InteractiveSink {
    fn emit(&self, message: &str) {
        self.channel.send(message);
    }
}

/// Lands guest diagnostics in the process log, attributable to the
/// owning workflow and node.
struct ExecutionLogSink {
    workflow_id: WorkflowId,
    node: NodeHandle,
}

impl DiagnosticSink for ExecutionLogSink {
    fn emit(&self, message: &str) {
        tracing::info!(
            workflow_id = %self.workflow_id,
            node = %self.node.name,
            message,
            "guest diagnostic"
        );
    }
}
