//! Execution orchestration for a script node.
//!
//! [`ScriptRunner`] decides which run operation a node invocation maps
//! to, negotiates the output shape from the declared ports before any
//! guest code runs, applies the continue-on-failure policy, and
//! canonicalizes produced items before handing them back to the engine.

use std::sync::Arc;

use serde_json::Value;

use crate::context::ScriptContext;
use crate::error::ScriptError;
use crate::evaluator::ScriptEvaluator;
use crate::host::{CodeSlot, HostSession, SupplyDecorator};
use crate::item::Item;
use crate::policy::ModulePolicy;
use crate::sandbox::{RunAllOptions, RunOutput, Sandbox};

/// Orchestrates script runs for one node execution.
pub struct ScriptRunner {
    host: Arc<dyn HostSession>,
    evaluator: Arc<dyn ScriptEvaluator>,
    policy: Arc<ModulePolicy>,
    decorator: Option<Arc<dyn SupplyDecorator>>,
}

impl ScriptRunner {
    /// Create a runner bound to a host session and an evaluator.
    #[must_use]
    pub fn new(
        host: Arc<dyn HostSession>,
        evaluator: Arc<dyn ScriptEvaluator>,
        policy: Arc<ModulePolicy>,
    ) -> Self {
        Self {
            host,
            evaluator,
            policy,
            decorator: None,
        }
    }

    /// Attach the host's observability wrapper for supplied objects.
    #[must_use]
    pub fn with_decorator(mut self, decorator: Arc<dyn SupplyDecorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// Run the Execute script against the whole input batch and produce
    /// record-flow output.
    ///
    /// The single/multi decision comes from the declared ports alone and
    /// is fixed before evaluation begins; what the script returns can
    /// fail validation but never change the shape. With
    /// continue-on-failure enabled, a failed run turns into a single
    /// `{"error": message}` item (nested once more for multi-channel
    /// runs) and is reported as success. The zero-flow-port
    /// configuration error is checked *after* the run so the run's own
    /// failure wins when both apply.
    pub async fn produce_records(&self) -> Result<RunOutput, ScriptError> {
        let node = self.host.node();
        let code = self.host.configured_code(CodeSlot::Execute).ok_or_else(|| {
            ScriptError::configuration(format!(
                "no code for `{}` set on node `{}`",
                CodeSlot::Execute.label(),
                node.name
            ))
        })?;

        let context = ScriptContext::build(Arc::clone(&self.host), 0, true);
        let sandbox = Sandbox::new(code, context, Arc::clone(&self.policy), Arc::clone(&self.evaluator));

        let flow_ports = self
            .host
            .output_ports()
            .into_iter()
            .filter(|p| p.is_flow())
            .count();
        let multi_output = flow_ports != 1;

        let mut output = match sandbox.run_all_items(RunAllOptions { multi_output }).await {
            Ok(output) => output,
            Err(err) if self.host.continue_on_fail() => {
                tracing::warn!(
                    node = %node.name,
                    error = %err,
                    "script failed, continuing with an error item"
                );
                let errors = vec![Item::error(&err.to_string())];
                if multi_output {
                    RunOutput::Multi(vec![errors])
                } else {
                    RunOutput::Single(errors)
                }
            }
            Err(err) => return Err(err),
        };

        if flow_ports == 0 {
            return Err(ScriptError::configuration(format!(
                "node `{}` has no record-flow output port to deliver items to",
                node.name
            )));
        }

        match &mut output {
            RunOutput::Single(batch) => {
                for item in batch {
                    item.standardize();
                }
            }
            RunOutput::Multi(batches) => {
                for item in batches.iter_mut().flatten() {
                    item.standardize();
                }
            }
        }
        Ok(output)
    }

    /// Run the Supply script for one item and return the capability
    /// object it produced, wrapped by the host's decorator.
    ///
    /// Failures always propagate — a missing supplied object is fatal to
    /// the consuming node, so continue-on-failure never applies here.
    pub async fn supply_value(&self, item_index: usize) -> Result<Value, ScriptError> {
        let node = self.host.node();
        let code = self.host.configured_code(CodeSlot::Supply).ok_or_else(|| {
            ScriptError::configuration(format!(
                "no code for `{}` set on node `{}`",
                CodeSlot::Supply.label(),
                node.name
            ))
        })?;

        let context = ScriptContext::build(Arc::clone(&self.host), item_index, false);
        let sandbox = Sandbox::new(code, context, Arc::clone(&self.policy), Arc::clone(&self.evaluator));

        let value = sandbox.run_supply().await?;
        Ok(match &self.decorator {
            Some(decorator) => decorator.decorate(value, &node),
            None => value,
        })
    }
}
