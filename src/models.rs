use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, WatchmapError};
use crate::import::RawValue;

/// Conversion factor from the FIT speed unit (m/s) to km/h
pub const MS_TO_KMH: f64 = 3.6;

/// Semicircles per 180 degrees in the FIT fixed-point position encoding
pub const SEMICIRCLES_PER_180_DEG: f64 = 2_147_483_648.0;

/// Numeric metrics a Sample can carry
///
/// Variant order is the ordering of the metric keys, which is also the order
/// charts list their series in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Altitude,
    Distance,
    HeartRate,
    Speed,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Altitude,
        Metric::Distance,
        Metric::HeartRate,
        Metric::Speed,
    ];

    /// Metrics that get a map layer and a chart series
    pub const VISUAL: [Metric; 3] = [Metric::Altitude, Metric::HeartRate, Metric::Speed];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Altitude => "altitude",
            Metric::Distance => "distance",
            Metric::HeartRate => "heart_rate",
            Metric::Speed => "speed",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a position from raw FIT semicircle values
    pub fn from_semicircles(lat: i64, long: i64) -> Self {
        Self::new(semicircles_to_degrees(lat), semicircles_to_degrees(long))
    }
}

/// Convert a FIT semicircle value to degrees
pub fn semicircles_to_degrees(raw: i64) -> f64 {
    raw as f64 * 180.0 / SEMICIRCLES_PER_180_DEG
}

/// One timestamped observation, already in physical units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,

    /// Latitude/longitude in degrees; present only when both were recorded
    pub position: Option<Position>,

    /// Speed in km/h
    pub speed: Option<f64>,

    /// Heart rate in beats per minute
    pub heart_rate: Option<u16>,

    /// Altitude in meters
    pub altitude: Option<f64>,

    /// Distance covered since the start of the activity, in meters
    pub distance: Option<f64>,
}

impl Sample {
    /// A sample with only a timestamp
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            position: None,
            speed: None,
            heart_rate: None,
            altitude: None,
            distance: None,
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Altitude => self.altitude,
            Metric::Distance => self.distance,
            Metric::HeartRate => self.heart_rate.map(f64::from),
            Metric::Speed => self.speed,
        }
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.value(metric).is_some()
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

/// Ordered samples of one activity session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    samples: Vec<Sample>,
}

impl Track {
    /// Build a track, rejecting samples that go back in time
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(WatchmapError::MalformedSample {
                    index: index + 1,
                    reason: format!(
                        "timestamp {} precedes previous sample at {}",
                        pair[1].timestamp, pair[0].timestamp
                    ),
                });
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Wall-clock time from the first to the last sample
    pub fn duration(&self) -> Duration {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => Duration::zero(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        duration_seconds(self.duration())
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.samples.iter().any(|s| s.has_metric(metric))
    }

    pub fn has_positions(&self) -> bool {
        self.samples.iter().any(Sample::has_position)
    }

    /// Mean position of all positioned samples
    pub fn center(&self) -> Option<Position> {
        let (sum_lat, sum_long, n) = self
            .samples
            .iter()
            .filter_map(|s| s.position)
            .fold((0.0, 0.0, 0usize), |(lat, long, n), p| {
                (lat + p.latitude, long + p.longitude, n + 1)
            });
        if n == 0 {
            None
        } else {
            Some(Position::new(sum_lat / n as f64, sum_long / n as f64))
        }
    }

    /// Last recorded cumulative distance in meters
    pub fn total_distance(&self) -> Option<f64> {
        self.samples.iter().rev().find_map(|s| s.distance)
    }
}

/// Seconds with sub-second precision
pub fn duration_seconds(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1000.0,
    }
}

/// Format a duration as h:mm:ss, dropping fractional seconds
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Aggregate scalars from the activity's single session record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Sport name as recorded by the device
    pub sport: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    /// Total distance in meters
    pub total_distance: Option<f64>,

    /// Wall-clock duration in seconds
    pub total_elapsed_time: Option<f64>,

    /// Moving/timer duration in seconds
    pub total_timer_time: Option<f64>,

    /// Average speed in km/h
    pub avg_speed: Option<f64>,

    /// Maximum speed in km/h
    pub max_speed: Option<f64>,

    pub avg_heart_rate: Option<u16>,

    pub max_heart_rate: Option<u16>,

    /// Energy in kcal
    pub total_calories: Option<u32>,

    /// Elevation gain in meters
    pub total_ascent: Option<f64>,

    /// Elevation loss in meters
    pub total_descent: Option<f64>,

    /// Every non-null field of the raw session record
    pub fields: BTreeMap<String, RawValue>,
}
