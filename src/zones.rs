use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, Stage, WatchmapError};
use crate::models::{duration_seconds, format_hms, Track};

/// Zone names, easiest first
pub const ZONE_NAMES: [&str; 6] = ["resting", "easy", "fatburn", "cardio", "sprint", "anaerobic"];

/// Zone boundaries as fractions of heart-rate reserve
const RESERVE_FRACTIONS: [f64; 7] = [0.0, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// A heart-rate band, open at the low end and closed at the high end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

impl ZoneDefinition {
    /// `low < hr <= high`: a reading exactly on `low` belongs to the zone below
    pub fn contains(&self, hr: f64) -> bool {
        self.low < hr && hr <= self.high
    }
}

/// Six contiguous zones partitioning (resting, max]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateZones {
    pub resting_hr: u16,
    pub max_hr: u16,
    zones: Vec<ZoneDefinition>,
}

impl HeartRateZones {
    pub fn zones(&self) -> &[ZoneDefinition] {
        &self.zones
    }

    pub fn reserve(&self) -> u16 {
        self.max_hr - self.resting_hr
    }

    /// Index of the zone holding `hr`; `None` at or below resting and above max
    pub fn zone_index(&self, hr: f64) -> Option<usize> {
        self.zones.iter().position(|z| z.contains(hr))
    }

    pub fn zone_for(&self, hr: f64) -> Option<&ZoneDefinition> {
        self.zone_index(hr).map(|i| &self.zones[i])
    }
}

/// Zone calculation utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Estimate max heart rate from age (220 - age formula)
    pub fn estimate_max_hr_from_age(age: u8) -> Result<u16> {
        if !(10..=100).contains(&age) {
            return Err(invalid("age", age));
        }
        Ok(220u16.saturating_sub(age as u16))
    }

    /// Karvonen zones from age and resting heart rate
    ///
    /// Boundaries sit at 0/50/60/70/80/90/100% of the heart-rate reserve
    /// (max - resting) above resting:
    /// - resting: 0-50%
    /// - easy: 50-60%
    /// - fatburn: 60-70%
    /// - cardio: 70-80%
    /// - sprint: 80-90%
    /// - anaerobic: 90-100%
    pub fn karvonen_zones(age: u8, resting_hr: u16) -> Result<HeartRateZones> {
        let max_hr = Self::estimate_max_hr_from_age(age)?;
        if !(30..=220).contains(&resting_hr) || resting_hr >= max_hr {
            return Err(invalid("resting_heart_rate", resting_hr));
        }

        let resting = f64::from(resting_hr);
        let reserve = f64::from(max_hr - resting_hr);
        let zones = ZONE_NAMES
            .iter()
            .zip(RESERVE_FRACTIONS.windows(2))
            .map(|(name, bounds)| ZoneDefinition {
                name: (*name).to_string(),
                low: bounds[0] * reserve + resting,
                high: bounds[1] * reserve + resting,
            })
            .collect();

        Ok(HeartRateZones {
            resting_hr,
            max_hr,
            zones,
        })
    }
}

fn invalid(parameter: &str, value: impl ToString) -> WatchmapError {
    WatchmapError::InvalidParameter {
        stage: Stage::Analytics,
        parameter: parameter.to_string(),
        value: value.to_string(),
    }
}

/// Dwell time for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTime {
    pub name: String,
    pub low: f64,
    pub high: f64,
    /// Sum of sample intervals attributed to this zone
    pub raw_seconds: f64,
    /// Raw time rescaled so all zones add up to the session's elapsed time
    pub duration_seconds: f64,
    /// Share of the attributed time, 0-100
    pub percentage: f64,
}

impl ZoneTime {
    pub fn duration_hms(&self) -> String {
        format_hms(self.duration_seconds)
    }
}

/// Time spent in each heart-rate zone over a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneOccupancy {
    pub zones: Vec<ZoneTime>,
    /// Last timestamp minus first timestamp
    pub elapsed_seconds: f64,
    /// Raw interval time whose heart rate fell in no zone
    pub unattributed_seconds: f64,
}

impl ZoneOccupancy {
    pub fn total_seconds(&self) -> f64 {
        self.zones.iter().map(|z| z.duration_seconds).sum()
    }

    pub fn get(&self, name: &str) -> Option<&ZoneTime> {
        self.zones.iter().find(|z| z.name == name)
    }
}

/// Zone distribution analysis
pub struct ZoneAnalyzer;

impl ZoneAnalyzer {
    /// Time-weighted zone occupancy
    ///
    /// Each interval between adjacent samples is credited to the zone of the
    /// interval's first sample; samples without a heart rate credit nothing.
    /// Summing per-interval deltas drifts over long sessions, so the raw zone
    /// times are rescaled onto the true elapsed time (last - first).
    pub fn occupancy(track: &Track, zones: &HeartRateZones) -> ZoneOccupancy {
        let mut raw = vec![0.0f64; zones.zones().len()];
        let mut unattributed = 0.0;

        for pair in track.samples().windows(2) {
            let Some(hr) = pair[0].heart_rate else {
                continue;
            };
            let delta = duration_seconds(pair[1].timestamp - pair[0].timestamp);
            match zones.zone_index(f64::from(hr)) {
                Some(i) => raw[i] += delta,
                None => unattributed += delta,
            }
        }

        let elapsed = track.elapsed_seconds();
        let attributed: f64 = raw.iter().sum();

        let zones_out = zones
            .zones()
            .iter()
            .zip(raw.iter())
            .map(|(zone, &raw_seconds)| {
                let share = if attributed > 0.0 {
                    raw_seconds / attributed
                } else {
                    0.0
                };
                ZoneTime {
                    name: zone.name.clone(),
                    low: zone.low,
                    high: zone.high,
                    raw_seconds,
                    duration_seconds: share * elapsed,
                    percentage: share * 100.0,
                }
            })
            .collect();

        debug!(
            elapsed_seconds = elapsed,
            attributed_seconds = attributed,
            unattributed_seconds = unattributed,
            "Computed zone occupancy"
        );

        ZoneOccupancy {
            zones: zones_out,
            elapsed_seconds: elapsed,
            unattributed_seconds: unattributed,
        }
    }
}
