use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{Result, WatchmapError};
use crate::models::{Metric, Track};

/// Observed (min, max) of one metric across a track; `min <= max` always holds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    /// Range of the given observations, `None` when there are none
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range: Option<MetricRange>, v| match range {
                None => Some(MetricRange { min: v, max: v }),
                Some(r) => Some(MetricRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// A flat metric: every observation had the same value
    pub fn is_flat(&self) -> bool {
        self.max <= self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Inverted min/max normalization: `max` maps to 0, `min` maps to 1
    ///
    /// Values outside the range clip to [0, 1]. A flat range yields 0.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        ((self.max - value) / self.span()).clamp(0.0, 1.0)
    }

    /// Position of `value` within the range: `min` maps to 0, `max` to 1
    ///
    /// This is the scale colormaps are driven by. A flat range yields 0.
    pub fn fraction(&self, value: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }
}

/// Ranges for every metric observed at least once in a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRanges {
    ranges: BTreeMap<Metric, MetricRange>,
}

impl MetricRanges {
    /// Scan the track; metrics with no observations are left out
    pub fn from_track(track: &Track) -> Self {
        let ranges: BTreeMap<Metric, MetricRange> = Metric::ALL
            .iter()
            .filter_map(|&metric| {
                MetricRange::from_values(track.samples().iter().filter_map(|s| s.value(metric)))
                    .map(|range| (metric, range))
            })
            .collect();

        debug!(metrics = ?ranges.keys().collect::<Vec<_>>(), "Computed metric ranges");
        Self { ranges }
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricRange> {
        self.ranges.get(&metric)
    }

    /// Range of a metric the caller needs; `EmptyMetric` when never observed
    pub fn require(&self, metric: Metric) -> Result<&MetricRange> {
        self.ranges
            .get(&metric)
            .ok_or(WatchmapError::EmptyMetric { metric })
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.ranges.contains_key(&metric)
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.ranges.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricRange)> + '_ {
        self.ranges.iter().map(|(m, r)| (*m, r))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
