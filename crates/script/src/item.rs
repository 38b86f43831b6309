//! Item data model crossing the sandbox boundary.
//!
//! An [`Item`] is one structured value flowing through a workflow; a
//! [`Batch`] is an ordered sequence of them. Batches are snapshots —
//! guest code receives copies and produced output is built from fresh
//! values, so the sandbox never holds a live alias into host-owned data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScriptError;

/// An ordered sequence of items, one run's worth of input or output.
pub type Batch = Vec<Item>;

/// One workflow item: a schemaless JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// The item's payload map.
    pub json: serde_json::Map<String, Value>,
}

impl Item {
    /// Create an item from a payload map.
    #[must_use]
    pub fn new(json: serde_json::Map<String, Value>) -> Self {
        Self { json }
    }

    /// Create the synthetic item used when a failed run continues:
    /// `{"error": message}`.
    #[must_use]
    pub fn error(message: &str) -> Self {
        let mut json = serde_json::Map::new();
        json.insert("error".to_owned(), Value::String(message.to_owned()));
        Self { json }
    }

    /// Convert one guest-returned value into an item.
    ///
    /// A guest object carrying a `json` object field is taken as that
    /// map; a bare object is taken as the payload itself. Anything else
    /// is a guest error attributed to `item_index`.
    pub fn from_guest(value: Value, item_index: usize) -> Result<Self, ScriptError> {
        match value {
            Value::Object(mut map) => match map.remove("json") {
                Some(Value::Object(json)) => Ok(Self::new(json)),
                Some(other) => Err(ScriptError::guest(
                    format!(
                        "the `json` property of a returned item must be an object, got {}",
                        value_kind(&other)
                    ),
                    item_index,
                )),
                None => Ok(Self::new(map)),
            },
            other => Err(ScriptError::guest(
                format!("returned items must be objects, got {}", value_kind(&other)),
                item_index,
            )),
        }
    }

    /// Canonicalize the payload in place.
    ///
    /// Guest runtimes with a single numeric type hand back `1.0` where
    /// the host wrote `1`; this pass collapses integral floats back to
    /// integers throughout the tree so items compare and serialize
    /// stably regardless of which side produced them. Applied uniformly
    /// to every produced item, single- and multi-channel alike.
    pub fn standardize(&mut self) {
        let map = std::mem::take(&mut self.json);
        self.json = map.into_iter().map(|(k, v)| (k, canonical(v))).collect();
    }
}

/// Convert a guest return value into a single-channel batch.
///
/// A sequence yields one item per element; a lone object is accepted as
/// a one-item batch; anything else is a guest error.
pub(crate) fn items_from_guest(value: Value, item_index: usize) -> Result<Batch, ScriptError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|v| Item::from_guest(v, item_index))
            .collect(),
        Value::Object(_) => Ok(vec![Item::from_guest(value, item_index)?]),
        Value::Null => Err(ScriptError::guest(
            "script returned no items",
            item_index,
        )),
        other => Err(ScriptError::guest(
            format!(
                "script must return an array of items, got {}",
                value_kind(&other)
            ),
            item_index,
        )),
    }
}

fn canonical(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            // Collapse only within f64's exact-integer range.
            if n.as_i64().is_none() && n.as_u64().is_none() {
                if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                        return Value::Number(serde_json::Number::from(f as i64));
                    }
                }
            }
            Value::Number(n)
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonical).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, canonical(v))).collect())
        }
        other => other,
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
