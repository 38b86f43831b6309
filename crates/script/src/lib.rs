//! # Quasar Script Engine
//!
//! Sandboxed execution of user-authored scripts inside a workflow node.
//!
//! Guest code runs in a restricted evaluator with a curated capability
//! surface: it can read the current item batch, call back into the host
//! (connected capability providers, nested workflows, data proxies),
//! emit attributable diagnostics — and nothing else. Which modules it
//! may import is decided by an immutable per-process policy. Produced
//! values are validated against the node's declared output shape and
//! canonicalized before re-entering the engine.
//!
//! This crate follows the Ports & Drivers architecture: the guest
//! interpreter is consumed through the [`ScriptEvaluator`] port, the
//! host execution session through [`HostSession`]. Drivers and runtimes
//! implement the ports; the engine calls [`ScriptRunner`].
//!
//! ## Core Types
//!
//! - [`ModulePolicy`] — per-process import allow-list and resolver
//! - [`ScriptContext`] — per-run capability surface for guest code
//! - [`Sandbox`] — one bound evaluation session
//! - [`ScriptRunner`] — orchestrates produce-records and supply runs
//! - [`Item`] / [`Batch`] — data crossing the sandbox boundary
//! - [`OutputPort`] / [`InputPort`] — declared connection points
//! - [`ScriptError`] — typed failures with item/node attribution
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quasar_script::{ModulePolicy, ScriptRunner};
//!
//! let runner = ScriptRunner::new(host, evaluator, Arc::clone(ModulePolicy::shared()));
//! let output = runner.produce_records().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Guest context construction.
pub mod context;
/// Error types with item and node attribution.
pub mod error;
/// Evaluator and diagnostic-sink ports.
pub mod evaluator;
/// Host collaborator port traits.
pub mod host;
/// Item data model crossing the sandbox boundary.
pub mod item;
/// Module access policy for guest imports.
pub mod policy;
/// Port descriptors for node connection points.
pub mod port;
/// Execution orchestration for a script node.
pub mod runner;
/// One bound guest evaluation session.
pub mod sandbox;

#[cfg(test)]
mod test_support;

// ── Public re-exports ───────────────────────────────────────────────────────

pub use context::ScriptContext;
pub use error::ScriptError;
pub use evaluator::{DiagnosticSink, EvalRequest, ScriptEvaluator};
pub use host::{
    CodeSlot, HostSession, MessageChannel, NodeHandle, ScriptLogger, SupplyDecorator,
};
pub use item::{Batch, Item};
pub use policy::{LoadTarget, ModulePattern, ModulePolicy, PolicyConfig};
pub use port::{InputPort, OutputPort, PortKey, SupplyInput, SupplyKind};
pub use runner::ScriptRunner;
pub use sandbox::{RunAllOptions, RunOutput, Sandbox};
