//! Port descriptors for script-node connection points.
//!
//! A script node's ports are configured externally (the editor builds
//! them from node configuration); the engine resolves the lists before a
//! run and the orchestrator only reads them. Two port semantics exist:
//!
//! - **Flow** — ordinary item batches flowing through the workflow.
//! - **Supply** — a typed capability object (chain, memory, tool, ...)
//!   handed to a connected root node instead of flowing as items.

use serde::{Deserialize, Serialize};

/// Type alias for port keys (e.g. `"in"`, `"out"`, `"tools"`).
pub type PortKey = String;

// ── SupplyKind ──────────────────────────────────────────────────────────────

/// The capability family a supply port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyKind {
    /// A runnable chain of model calls.
    Chain,
    /// A document loader / document set.
    Document,
    /// An embedding model.
    Embedding,
    /// A language model.
    LanguageModel,
    /// A conversation memory store.
    Memory,
    /// A model output parser.
    OutputParser,
    /// A text splitter.
    TextSplitter,
    /// A callable tool.
    Tool,
    /// A vector store.
    VectorStore,
}

// ── OutputPort ──────────────────────────────────────────────────────────────

/// An output port declaration on a script node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputPort {
    /// Main item-batch output.
    Flow {
        /// Port key (e.g. `"out"`).
        key: PortKey,
    },
    /// Typed capability-object output.
    Supply {
        /// Port key (e.g. `"tool"`).
        key: PortKey,
        /// Capability family this port supplies.
        kind: SupplyKind,
    },
}

impl OutputPort {
    /// Create a flow output port.
    #[must_use]
    pub fn flow(key: impl Into<PortKey>) -> Self {
        Self::Flow { key: key.into() }
    }

    /// Create a supply output port.
    #[must_use]
    pub fn supply(key: impl Into<PortKey>, kind: SupplyKind) -> Self {
        Self::Supply {
            key: key.into(),
            kind,
        }
    }

    /// Returns the port key regardless of variant.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Flow { key } | Self::Supply { key, .. } => key,
        }
    }

    /// Returns `true` if this port carries item batches.
    #[must_use]
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::Flow { .. })
    }

    /// Returns `true` if this port supplies a capability object.
    #[must_use]
    pub fn is_supply(&self) -> bool {
        matches!(self, Self::Supply { .. })
    }
}

// ── InputPort ───────────────────────────────────────────────────────────────

/// A supply input slot with connection cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyInput {
    /// Port key (e.g. `"model"`, `"tools"`).
    pub key: PortKey,
    /// Capability family accepted by this slot.
    pub kind: SupplyKind,
    /// Whether a connection is required for the node to run.
    #[serde(default)]
    pub required: bool,
    /// Maximum simultaneous connections; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

/// An input port declaration on a script node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPort {
    /// Main item-batch input.
    Flow {
        /// Port key (e.g. `"in"`).
        key: PortKey,
    },
    /// Typed capability-object input.
    Supply(SupplyInput),
}

impl InputPort {
    /// Create a flow input port.
    #[must_use]
    pub fn flow(key: impl Into<PortKey>) -> Self {
        Self::Flow { key: key.into() }
    }

    /// Create a supply input port with defaults.
    ///
    /// Defaults: `required = false`, unlimited connections.
    #[must_use]
    pub fn supply(key: impl Into<PortKey>, kind: SupplyKind) -> Self {
        Self::Supply(SupplyInput {
            key: key.into(),
            kind,
            required: false,
            max_connections: None,
        })
    }

    /// Returns the port key regardless of variant.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Flow { key } => key,
            Self::Supply(p) => &p.key,
        }
    }

    /// Returns `true` if this port carries item batches.
    #[must_use]
    pub fn is_flow(&self) -> bool {
        matches!(self, Self::Flow { .. })
    }

    /// Returns `true` if this port accepts a capability object.
    #[must_use]
    pub fn is_supply(&self) -> bool {
        matches!(self, Self::Supply(_))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
