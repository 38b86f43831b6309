//! Module access policy for guest imports.
//!
//! Every `import`/`require` a guest script issues is resolved through
//! [`ModulePolicy::resolve`] — a pure decision function over the
//! requested name and the requesting location. The policy is built once
//! at process start from the environment and shared read-only by every
//! sandbox; there is no per-run weakening.
//!
//! Three request categories exist:
//!
//! - **built-in** — modules the guest runtime ships itself; allowed only
//!   when named in `QUASAR_SCRIPT_ALLOW_BUILTIN` (empty list denies all).
//! - **external** — third-party modules; allowed on an exact or
//!   namespaced-wildcard match against `QUASAR_SCRIPT_ALLOW_EXTERNAL`.
//! - **baseline family** — the LLM-orchestration modules (`aichain`,
//!   `@aichain/*`), always importable and always rewritten to the
//!   engine's vendored copy so every node runs one consistent version
//!   no matter where its code executes from.
//!
//! The policy is non-transitive: a module reachable only through an
//! allowed module's internals must still pass the same check when
//! requested independently. Denial surfaces to the guest as a load
//! failure, never as a silently empty module.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::ScriptError;

/// Environment variable listing allowed built-in modules (comma-separated).
pub const ALLOW_BUILTIN_ENV: &str = "QUASAR_SCRIPT_ALLOW_BUILTIN";
/// Environment variable listing allowed external modules (comma-separated).
pub const ALLOW_EXTERNAL_ENV: &str = "QUASAR_SCRIPT_ALLOW_EXTERNAL";
/// Environment variable overriding the vendored-module directory.
pub const VENDOR_DIR_ENV: &str = "QUASAR_SCRIPT_VENDOR_DIR";

/// The always-allowed LLM-orchestration module family.
pub const BASELINE_EXTERNAL: &[&str] = &["aichain", "@aichain/*"];

const DEFAULT_VENDOR_DIR: &str = "/var/lib/quasar/vendored-modules";

static SHARED: OnceLock<Arc<ModulePolicy>> = OnceLock::new();

// ── Patterns ────────────────────────────────────────────────────────────────

/// One entry of the external allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulePattern {
    /// Matches the module name exactly.
    Exact(String),
    /// Matches every module under a namespace prefix (`@scope/*`,
    /// `family/*`). Stores the prefix including the trailing slash.
    Namespace(String),
}

impl ModulePattern {
    /// Parse a raw allow-list entry.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix("/*") {
            Some(prefix) => Self::Namespace(format!("{prefix}/")),
            None => Self::Exact(raw.to_owned()),
        }
    }

    /// Check whether a requested module name matches this entry.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == exact,
            Self::Namespace(prefix) => {
                name.len() > prefix.len() && name.starts_with(prefix.as_str())
            }
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Raw allow-list configuration, before baseline patterns are appended.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    /// Allowed built-in module names.
    pub builtin: Vec<String>,
    /// Allowed external module names / namespace patterns.
    pub external: Vec<String>,
}

impl PolicyConfig {
    /// Read the allow-lists from the environment.
    ///
    /// Both variables are optional and default to empty. Entries are
    /// comma-separated; surrounding whitespace is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            builtin: split_env(ALLOW_BUILTIN_ENV),
            external: split_env(ALLOW_EXTERNAL_ENV),
        }
    }
}

fn split_env(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

// ── Policy ──────────────────────────────────────────────────────────────────

/// Where an allowed module loads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    /// A guest-runtime built-in, loaded by name.
    Builtin(String),
    /// An external module, resolved relative to the requesting location.
    External(PathBuf),
    /// A baseline-family module, rewritten to the vendored copy.
    Vendored(PathBuf),
}

/// Immutable per-process import policy.
#[derive(Debug)]
pub struct ModulePolicy {
    builtin: BTreeSet<String>,
    external: Vec<ModulePattern>,
    vendor_root: PathBuf,
}

impl ModulePolicy {
    /// Build a policy from explicit configuration.
    ///
    /// The baseline family is appended to the external allow-list
    /// regardless of `config`.
    #[must_use]
    pub fn new(config: PolicyConfig, vendor_root: impl Into<PathBuf>) -> Self {
        let mut external: Vec<ModulePattern> = config
            .external
            .iter()
            .map(|raw| ModulePattern::parse(raw))
            .collect();
        external.extend(BASELINE_EXTERNAL.iter().map(|raw| ModulePattern::parse(raw)));
        Self {
            builtin: config.builtin.into_iter().collect(),
            external,
            vendor_root: vendor_root.into(),
        }
    }

    /// The process-wide shared policy, built from the environment on
    /// first access and identical across all sandboxes thereafter.
    pub fn shared() -> &'static Arc<Self> {
        SHARED.get_or_init(|| {
            let vendor_root = std::env::var(VENDOR_DIR_ENV)
                .unwrap_or_else(|_| DEFAULT_VENDOR_DIR.to_owned());
            Arc::new(Self::new(PolicyConfig::from_env(), vendor_root))
        })
    }

    /// Decide one import request.
    ///
    /// `requesting_dir` only influences *where* an allowed external
    /// module loads from, never *whether* it is allowed — so the policy
    /// cannot be weakened by importing from a privileged location.
    pub fn resolve(
        &self,
        requested: &str,
        requesting_dir: &Path,
    ) -> Result<LoadTarget, ScriptError> {
        // Baseline family wins before any allow-list consultation: the
        // external list can add modules but can never override this
        // rewrite (version consistency for the vendored family).
        if Self::is_baseline(requested) {
            return Ok(LoadTarget::Vendored(self.vendor_root.join(requested)));
        }
        if self.builtin.contains(requested) {
            return Ok(LoadTarget::Builtin(requested.to_owned()));
        }
        if self.external.iter().any(|p| p.matches(requested)) {
            return Ok(LoadTarget::External(
                requesting_dir.join("modules").join(requested),
            ));
        }
        Err(ScriptError::denied(requested))
    }

    fn is_baseline(name: &str) -> bool {
        BASELINE_EXTERNAL
            .iter()
            .any(|raw| ModulePattern::parse(raw).matches(name))
    }
}
