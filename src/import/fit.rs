use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, WatchmapError};
use crate::import::{ActivityDecoder, RawActivity, RawRecord, RawValue};

/// FIT file decoder backed by the `fitparser` crate
#[derive(Debug, Default)]
pub struct FitDecoder;

impl FitDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode FIT bytes from any reader
    pub fn decode_reader<R: Read>(&self, reader: &mut R) -> Result<RawActivity> {
        let messages: Vec<FitDataRecord> = fitparser::from_reader(reader)
            .map_err(|e| WatchmapError::Decode(e.to_string()))?;

        let mut activity = RawActivity::default();
        for message in &messages {
            match message.kind() {
                MesgNum::Record => activity.records.push(to_raw_record(message)),
                MesgNum::Session => activity.sessions.push(to_raw_record(message)),
                _ => {}
            }
        }

        debug!(
            messages = messages.len(),
            records = activity.records.len(),
            sessions = activity.sessions.len(),
            "Decoded FIT messages"
        );

        Ok(activity)
    }
}

impl ActivityDecoder for FitDecoder {
    fn can_decode(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("fit"))
            .unwrap_or(false)
    }

    fn decode_file(&self, file_path: &Path) -> Result<RawActivity> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::new(file);
        self.decode_reader(&mut reader)
    }

    fn format_name(&self) -> &'static str {
        "FIT"
    }
}

fn to_raw_record(message: &FitDataRecord) -> RawRecord {
    message
        .fields()
        .iter()
        .filter_map(|field| to_raw_value(field.value()).map(|v| (field.name().to_string(), v)))
        .collect()
}

fn to_raw_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Timestamp(ts) => Some(RawValue::Timestamp(ts.with_timezone(&Utc))),
        Value::Float32(v) => Some(RawValue::Float(*v as f64)),
        Value::Float64(v) => Some(RawValue::Float(*v)),
        Value::SInt8(v) => Some(RawValue::Integer(*v as i64)),
        Value::SInt16(v) => Some(RawValue::Integer(*v as i64)),
        Value::SInt32(v) => Some(RawValue::Integer(*v as i64)),
        Value::SInt64(v) => Some(RawValue::Integer(*v)),
        Value::Byte(v) | Value::UInt8(v) | Value::UInt8z(v) => Some(RawValue::Integer(*v as i64)),
        Value::UInt16(v) | Value::UInt16z(v) => Some(RawValue::Integer(*v as i64)),
        Value::UInt32(v) | Value::UInt32z(v) => Some(RawValue::Integer(*v as i64)),
        Value::UInt64(v) | Value::UInt64z(v) => Some(RawValue::Integer(*v as i64)),
        Value::String(s) => Some(RawValue::Text(s.clone())),
        Value::Array(values) => Some(RawValue::Array(
            values.iter().filter_map(to_raw_value).collect(),
        )),
        _ => None,
    }
}
