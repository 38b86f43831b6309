//! # Quasar Core
//!
//! Core types shared by the Quasar workflow engine crates.
//!
//! ## Key Components
//!
//! - **Identifiers**: [`ExecutionId`], [`WorkflowId`], [`NodeId`] —
//!   strongly-typed UUID wrappers that cannot be mixed up at compile time
//! - **Run modes**: [`RunMode`] — how a workflow execution was started,
//!   which downstream code uses to route interactive-only behavior
//!
//! ## Usage
//!
//! ```rust
//! use quasar_core::{ExecutionId, NodeId, RunMode, WorkflowId};
//!
//! let execution_id = ExecutionId::v4();
//! let node_id = NodeId::v4();
//! let workflow_id = WorkflowId::v4();
//!
//! assert!(RunMode::Manual.is_interactive());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod id;
pub mod mode;

pub use id::{ExecutionId, NodeId, WorkflowId};
pub use mode::RunMode;
