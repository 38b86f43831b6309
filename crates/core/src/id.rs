//! Unique identifiers for Quasar entities.
//!
//! Strongly-typed UUID identifiers built on
//! [`domain-key`](https://crates.io/crates/domain-key) `Uuid<D>` wrappers.
//! Each identifier type is parameterized by its own domain marker, so an
//! `ExecutionId` can never be passed where a `NodeId` is expected.
//!
//! All ID types are `Copy` (16 bytes, stack-allocated) and support:
//! - `v4()` for random UUID generation
//! - `nil()` for zero-valued default
//! - `parse(&str)` for string parsing
//! - Full serde support (serializes as UUID string)
//! - `Display`, `FromStr`, `Eq`, `Ord`, `Hash`

use domain_key::define_uuid;

// Re-export for downstream parse error handling
pub use domain_key::UuidParseError;

// Entity identifiers — UUID-based, Copy, 16 bytes each
define_uuid!(pub ExecutionIdDomain => ExecutionId);
define_uuid!(pub WorkflowIdDomain => WorkflowId);
define_uuid!(pub NodeIdDomain => NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_v4_creates_non_nil_uuid() {
        let id = ExecutionId::v4();
        assert!(!id.is_nil());
    }

    #[test]
    fn workflow_id_v4_creates_non_nil_uuid() {
        let id = WorkflowId::v4();
        assert!(!id.is_nil());
    }

    #[test]
    fn node_id_v4_creates_non_nil_uuid() {
        let id = NodeId::v4();
        assert!(!id.is_nil());
    }

    #[test]
    fn ids_display_and_parse_roundtrip() {
        let id = NodeId::v4();
        let text = id.to_string();
        let back = NodeId::parse(&text).expect("parse display output");
        assert_eq!(id, back);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = WorkflowId::v4();
        let json = serde_json::to_string(&id).unwrap();
        let back: WorkflowId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
