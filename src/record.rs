//! Vector records: the public `Vector`, the insert payload, and the
//! engine-private record carrying a precomputed magnitude.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vector::magnitude;

/// Opaque key/value metadata attached to a vector.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A metadata value. The engine never looks inside these.
///
/// Externally tagged so it survives bincode, which cannot decode
/// self-describing formats like `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => MetadataValue::Int(i),
            Err(_) => MetadataValue::UInt(value),
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<Value> for MetadataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => MetadataValue::Null,
            Value::Bool(b) => MetadataValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetadataValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    MetadataValue::UInt(u)
                } else {
                    MetadataValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => MetadataValue::Text(s),
            Value::Array(items) => MetadataValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => MetadataValue::Map(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<MetadataValue> for Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Null => Value::Null,
            MetadataValue::Bool(b) => Value::Bool(b),
            MetadataValue::Int(i) => Value::from(i),
            MetadataValue::UInt(u) => Value::from(u),
            // NaN and infinities have no JSON form
            MetadataValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            MetadataValue::Text(s) => Value::String(s),
            MetadataValue::List(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            MetadataValue::Map(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// A stored vector as seen by callers. This is also the persisted layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Option<Metadata>,
}

/// Payload for an insert: the id is assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVector {
    pub values: Vec<f32>,
    pub metadata: Option<Metadata>,
}

impl NewVector {
    pub fn new(values: Vec<f32>) -> Self {
        NewVector { values, metadata: None }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }
}

/// One ranked hit returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub vector: Vector,
    pub score: f32,
}

/// In-memory record. `magnitude` is derived from `vector.values` exactly once.
#[derive(Debug, Clone)]
pub(crate) struct VectorRecord {
    pub(crate) vector: Vector,
    pub(crate) magnitude: f32,
}

impl VectorRecord {
    pub(crate) fn new(vector: Vector) -> Self {
        let magnitude = magnitude(&vector.values);
        VectorRecord { vector, magnitude }
    }
}
