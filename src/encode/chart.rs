use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricCatalog;
use crate::metrics::MetricRanges;
use crate::models::{Metric, Track};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One metric plotted against time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub metric: Metric,
    pub name: String,
    /// Hover label, e.g. "Heart rate (bpm)"
    pub label: String,
    pub color: String,
    pub points: Vec<ChartPoint>,
}

/// Multi-series time-axis dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub series: Vec<TimeSeries>,
}

impl ChartDataset {
    /// One series per observed metric, ordered by metric key
    ///
    /// Series carry recorded values; the visual zero-speed floor does not
    /// apply here. Samples without the metric leave a gap.
    pub fn from_track(track: &Track, ranges: &MetricRanges, catalog: &MetricCatalog) -> Self {
        let series = Metric::VISUAL
            .iter()
            .filter(|metric| ranges.contains(**metric))
            .filter_map(|&metric| {
                let style = catalog.style(metric)?;
                let points = track
                    .samples()
                    .iter()
                    .filter_map(|s| {
                        s.value(metric).map(|value| ChartPoint {
                            timestamp: s.timestamp,
                            value,
                        })
                    })
                    .collect();
                Some(TimeSeries {
                    metric,
                    name: style.display_name.clone(),
                    label: style.label(),
                    color: style.color.clone(),
                    points,
                })
            })
            .collect();

        Self { series }
    }

    pub fn get(&self, metric: Metric) -> Option<&TimeSeries> {
        self.series.iter().find(|s| s.metric == metric)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::TimeZone;

    fn sample(secs: i64, speed: Option<f64>, altitude: Option<f64>) -> Sample {
        let mut s = Sample::at(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap());
        s.speed = speed;
        s.altitude = altitude;
        s
    }

    #[test]
    fn test_series_follow_metric_key_order() {
        let track = Track::new(vec![
            sample(0, Some(0.0), Some(210.0)),
            sample(5, Some(14.4), None),
            sample(10, None, Some(212.5)),
        ])
        .unwrap();
        let ranges = MetricRanges::from_track(&track);
        let chart = ChartDataset::from_track(&track, &ranges, &MetricCatalog::default());

        let metrics: Vec<Metric> = chart.series.iter().map(|s| s.metric).collect();
        assert_eq!(metrics, vec![Metric::Altitude, Metric::Speed]);

        let speed = chart.get(Metric::Speed).unwrap();
        assert_eq!(speed.label, "Speed (km/h)");
        assert_eq!(speed.color, "rgb(0, 0, 109)");
        // recorded zero, not the visual floor
        assert_eq!(speed.points[0].value, 0.0);
        assert_eq!(speed.points.len(), 2);

        assert_eq!(chart.get(Metric::Altitude).unwrap().points.len(), 2);
        assert!(chart.get(Metric::HeartRate).is_none());
    }

    #[test]
    fn test_empty_track_has_no_series() {
        let track = Track::new(vec![sample(0, None, None)]).unwrap();
        let ranges = MetricRanges::from_track(&track);
        assert!(ChartDataset::from_track(&track, &ranges, &MetricCatalog::default()).is_empty());
    }
}
