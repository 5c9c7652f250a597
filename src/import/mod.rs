use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

pub mod fit;

/// A decoded field value, as handed over by the activity-file decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    Array(Vec<RawValue>),
}

impl RawValue {
    /// Numeric view of the value; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value; floats only qualify when integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(v) => Some(*v),
            RawValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RawValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Text(_) => "text",
            RawValue::Array(_) => "array",
        }
    }
}

/// One decoded message: field name to value, null fields left out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for assembling records by hand
    pub fn with(mut self, name: impl Into<String>, value: RawValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: RawValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, RawValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, RawValue> {
        self.fields
    }
}

impl FromIterator<(String, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Everything the pipeline needs from one activity file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawActivity {
    /// Per-sample `record` messages, in file order
    pub records: Vec<RawRecord>,

    /// `session` messages; a well-formed activity has exactly one
    pub sessions: Vec<RawRecord>,
}

/// Trait for decoding activity files into raw record streams
pub trait ActivityDecoder {
    /// Check if this decoder can handle the given file
    fn can_decode(&self, file_path: &Path) -> bool;

    /// Decode the file into raw records
    fn decode_file(&self, file_path: &Path) -> Result<RawActivity>;

    /// Get the format name for this decoder
    fn format_name(&self) -> &'static str;
}
