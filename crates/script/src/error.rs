/// Error type for all script-node operations.
///
/// Distinguishes configuration mistakes (caught before any guest code
/// runs, or after it for delivery problems) from failures raised while
/// evaluating guest code, so the orchestrator can apply the
/// continue-on-failure policy to the latter only.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ScriptError {
    /// The node is not configured in a runnable way.
    ///
    /// Missing code text for the invoked slot, or no record-flow output
    /// port to deliver produced items to. Always fatal, never retried,
    /// never converted to an error item.
    #[error("configuration: {message}")]
    Configuration {
        /// Human-readable description naming the offending node.
        message: String,
    },

    /// Guest code requested a module not covered by the access policy.
    ///
    /// Surfaces to the guest as a load failure; the import never
    /// silently resolves to an empty module.
    #[error("module `{module}` is not allowed by the module access policy")]
    ModuleAccessDenied {
        /// The module name as requested by guest code.
        module: String,
    },

    /// Guest code failed while evaluating.
    ///
    /// Syntax errors, thrown values, rejected capability calls. The
    /// orchestrator may convert this into a synthetic error item when
    /// continue-on-failure is enabled for a produce-records run.
    #[error("{message}")]
    Guest {
        /// The guest error message, verbatim.
        message: String,
        /// Index of the item the run was bound to.
        item_index: usize,
    },

    /// A multi-channel run returned a value that is not one sequence of
    /// items per output channel.
    #[error("multi-output run must return one array of items per output channel ({detail})")]
    OutputShapeMismatch {
        /// What the guest actually returned.
        detail: String,
    },

    /// Execution cancelled via the cancellation token.
    #[error("cancelled")]
    Cancelled,
}

impl ScriptError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a module-access denial for the given module name.
    pub fn denied(module: impl Into<String>) -> Self {
        Self::ModuleAccessDenied {
            module: module.into(),
        }
    }

    /// Create a guest execution error bound to an item index.
    pub fn guest(message: impl Into<String>, item_index: usize) -> Self {
        Self::Guest {
            message: message.into(),
            item_index,
        }
    }

    /// Create an output-shape mismatch describing the actual shape.
    pub fn shape(detail: impl Into<String>) -> Self {
        Self::OutputShapeMismatch {
            detail: detail.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// The originating item index, when the failure is bound to one.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::Guest { item_index, .. } => Some(*item_index),
            _ => None,
        }
    }
}
