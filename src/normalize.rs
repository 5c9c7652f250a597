//! Raw record stream to physical-unit Track
//!
//! Decoding rules:
//! - speed is stored in m/s and converted to km/h (x 3.6)
//! - positions are stored as semicircles and converted to degrees (x 180 / 2^31)
//! - a field absent from the raw record stays absent; nothing is synthesized

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::error::{Result, WatchmapError};
use crate::import::{RawRecord, RawValue};
use crate::models::{Position, Sample, SessionSummary, Track, MS_TO_KMH};

const SPEED_FIELDS: [&str; 2] = ["enhanced_speed", "speed"];
const ALTITUDE_FIELDS: [&str; 2] = ["enhanced_altitude", "altitude"];

/// Counters from one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Raw records consumed
    pub records_seen: usize,
    /// Samples that made it into the track
    pub samples_kept: usize,
    /// Samples dropped because they had no position
    pub dropped_unpositioned: usize,
}

impl fmt::Display for NormalizeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Normalized {} records into {} samples ({} dropped without position)",
            self.records_seen, self.samples_kept, self.dropped_unpositioned
        )
    }
}

/// Result of normalizing a record stream
#[derive(Debug, Clone)]
pub struct NormalizedTrack {
    pub track: Track,
    pub stats: NormalizeStats,
}

/// Converts raw decoder records into a Track
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    require_position: bool,
}

impl RecordNormalizer {
    /// Keeps every sample, positioned or not
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops samples that lack a position, for position-bearing outputs
    pub fn requiring_position() -> Self {
        Self {
            require_position: true,
        }
    }

    pub fn requires_position(&self) -> bool {
        self.require_position
    }

    /// Normalize a lazy record stream, failing fast on out-of-order input
    pub fn normalize<I>(&self, records: I) -> Result<NormalizedTrack>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut stats = NormalizeStats::default();
        let mut samples = Vec::new();
        let mut previous: Option<DateTime<Utc>> = None;

        for (index, record) in records.into_iter().enumerate() {
            stats.records_seen += 1;
            let sample = Self::normalize_sample(index, &record)?;

            if let Some(prev) = previous {
                if sample.timestamp < prev {
                    return Err(WatchmapError::MalformedSample {
                        index,
                        reason: format!(
                            "timestamp {} precedes previous record at {}",
                            sample.timestamp, prev
                        ),
                    });
                }
            }
            previous = Some(sample.timestamp);

            if self.require_position && !sample.has_position() {
                trace!(index, "Dropping sample without position");
                stats.dropped_unpositioned += 1;
                continue;
            }
            samples.push(sample);
        }

        stats.samples_kept = samples.len();
        if stats.dropped_unpositioned > 0 {
            warn!(
                dropped = stats.dropped_unpositioned,
                "Samples without GPS position were left out of the track"
            );
        }
        debug!(%stats, "Record normalization finished");

        Ok(NormalizedTrack {
            track: Track::new(samples)?,
            stats,
        })
    }

    /// Decode a single raw record into a Sample
    pub fn normalize_sample(index: usize, record: &RawRecord) -> Result<Sample> {
        let timestamp = match record.get("timestamp") {
            Some(RawValue::Timestamp(ts)) => *ts,
            Some(other) => {
                return Err(WatchmapError::MalformedSample {
                    index,
                    reason: format!("timestamp has type {}", other.type_name()),
                })
            }
            None => {
                return Err(WatchmapError::MalformedSample {
                    index,
                    reason: "missing timestamp".to_string(),
                })
            }
        };

        let position = match (
            integer_field(index, record, "position_lat")?,
            integer_field(index, record, "position_long")?,
        ) {
            (Some(lat), Some(long)) => Some(Position::from_semicircles(lat, long)),
            _ => None,
        };

        let heart_rate = match integer_field(index, record, "heart_rate")? {
            Some(hr) => Some(u16::try_from(hr).map_err(|_| WatchmapError::MalformedSample {
                index,
                reason: format!("heart_rate {} out of range", hr),
            })?),
            None => None,
        };

        Ok(Sample {
            timestamp,
            position,
            speed: first_numeric(index, record, &SPEED_FIELDS)?.map(|v| v * MS_TO_KMH),
            heart_rate,
            altitude: first_numeric(index, record, &ALTITUDE_FIELDS)?,
            distance: numeric_field(index, record, "distance")?,
        })
    }
}

/// Build the session summary from the session-record stream
///
/// Fails with `SessionShape` unless the stream holds exactly one record.
pub fn session_summary<I>(sessions: I) -> Result<SessionSummary>
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut sessions = sessions.into_iter();
    let session = match (sessions.next(), sessions.next()) {
        (Some(session), None) => session,
        (None, _) => return Err(WatchmapError::SessionShape { found: 0 }),
        (Some(_), Some(_)) => {
            return Err(WatchmapError::SessionShape {
                found: 2 + sessions.count(),
            })
        }
    };

    let number = |name: &str| session.get(name).and_then(RawValue::as_f64).filter(|v| v.is_finite());
    let speed = |names: [&str; 2]| names.iter().find_map(|n| number(*n)).map(|v| v * MS_TO_KMH);
    let heart_rate = |name: &str| {
        session
            .get(name)
            .and_then(RawValue::as_i64)
            .and_then(|v| u16::try_from(v).ok())
    };

    Ok(SessionSummary {
        sport: session.get("sport").and_then(RawValue::as_str).map(str::to_string),
        start_time: session.get("start_time").and_then(RawValue::as_timestamp),
        total_distance: number("total_distance"),
        total_elapsed_time: number("total_elapsed_time"),
        total_timer_time: number("total_timer_time"),
        avg_speed: speed(["enhanced_avg_speed", "avg_speed"]),
        max_speed: speed(["enhanced_max_speed", "max_speed"]),
        avg_heart_rate: heart_rate("avg_heart_rate"),
        max_heart_rate: heart_rate("max_heart_rate"),
        total_calories: session
            .get("total_calories")
            .and_then(RawValue::as_i64)
            .and_then(|v| u32::try_from(v).ok()),
        total_ascent: number("total_ascent"),
        total_descent: number("total_descent"),
        fields: session.into_fields(),
    })
}

fn numeric_field(index: usize, record: &RawRecord, name: &str) -> Result<Option<f64>> {
    match record.get(name) {
        None => Ok(None),
        Some(value) => match value.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            Some(_) => Ok(None),
            None => Err(invalid_type(index, name, value)),
        },
    }
}

fn first_numeric(index: usize, record: &RawRecord, names: &[&str]) -> Result<Option<f64>> {
    for name in names {
        if let Some(v) = numeric_field(index, record, name)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

fn integer_field(index: usize, record: &RawRecord, name: &str) -> Result<Option<i64>> {
    match record.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid_type(index, name, value)),
    }
}

fn invalid_type(index: usize, name: &str, value: &RawValue) -> WatchmapError {
    WatchmapError::MalformedSample {
        index,
        reason: format!("{} has invalid type {}", name, value.type_name()),
    }
}
