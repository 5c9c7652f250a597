use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{duration_seconds, format_hms, Position, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Start,
    End,
}

/// Start or end pin of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub kind: MarkerKind,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
    pub tooltip: Vec<String>,
}

/// Mean heart rate over one aggregation interval, pinned to the sample where
/// the interval boundary was crossed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateLabel {
    pub position: Position,
    pub timestamp: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub mean_heart_rate: f64,
    pub text: String,
}

/// Start and end markers at the first and last positioned samples
pub fn session_markers(track: &Track) -> Option<(SessionMarker, SessionMarker)> {
    let samples = track.samples();
    let first = samples.iter().find(|s| s.has_position())?;
    let last = samples.iter().rev().find(|s| s.has_position())?;

    let start = SessionMarker {
        kind: MarkerKind::Start,
        position: first.position?,
        timestamp: first.timestamp,
        tooltip: vec!["Start".to_string(), format!("Time: {}", first.timestamp)],
    };

    let mut end_tooltip = vec!["End".to_string()];
    if let Some(distance) = track.total_distance() {
        end_tooltip.push(format!("Length: {:.1}km", distance / 1000.0));
    }
    end_tooltip.push(format!("Duration: {}", format_hms(track.elapsed_seconds())));
    end_tooltip.push(format!("Time: {}", last.timestamp));

    let end = SessionMarker {
        kind: MarkerKind::End,
        position: last.position?,
        timestamp: last.timestamp,
        tooltip: end_tooltip,
    };

    Some((start, end))
}

/// Mean heart-rate labels every `interval_seconds` of elapsed session time
///
/// Elapsed time accumulates over sample intervals; when it reaches the next
/// boundary a label is emitted at the current sample and the running mean
/// resets. A long pause skips the boundaries it spans instead of emitting a
/// burst of labels. Intervals with no heart-rate reading emit nothing.
pub fn heart_rate_labels(track: &Track, interval_seconds: f64) -> Vec<AggregateLabel> {
    let mut labels = Vec::new();
    if !(interval_seconds > 0.0) {
        return labels;
    }

    let mut elapsed = 0.0;
    let mut next_boundary = 0.0;
    let mut sum = 0.0;
    let mut count = 0u32;

    for pair in track.samples().windows(2) {
        let sample = &pair[0];
        elapsed += duration_seconds(pair[1].timestamp - sample.timestamp);
        if let Some(hr) = sample.heart_rate {
            sum += f64::from(hr);
            count += 1;
        }

        if elapsed >= next_boundary {
            while next_boundary <= elapsed {
                next_boundary += interval_seconds;
            }
            if let (Some(position), true) = (sample.position, count > 0) {
                let mean = sum / count as f64;
                labels.push(AggregateLabel {
                    position,
                    timestamp: sample.timestamp,
                    elapsed_seconds: elapsed,
                    mean_heart_rate: mean,
                    text: format!("{:.0}", mean),
                });
            }
            sum = 0.0;
            count = 0;
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use chrono::{Duration, TimeZone};

    fn track(points: &[(i64, Option<u16>)]) -> Track {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let samples = points
            .iter()
            .map(|(secs, hr)| {
                let mut s = Sample::at(start + Duration::seconds(*secs));
                s.position = Some(Position::new(45.0, 6.0 + *secs as f64 * 1e-5));
                s.heart_rate = *hr;
                s
            })
            .collect();
        Track::new(samples).unwrap()
    }

    #[test]
    fn test_session_markers() {
        let mut t = track(&[(0, None), (90, None), (3_725, None)]);
        let mut samples = t.samples().to_vec();
        samples[2].distance = Some(12_345.0);
        t = Track::new(samples).unwrap();

        let (start, end) = session_markers(&t).unwrap();
        assert_eq!(start.kind, MarkerKind::Start);
        assert_eq!(start.tooltip[0], "Start");
        assert_eq!(end.kind, MarkerKind::End);
        assert_eq!(end.tooltip[1], "Length: 12.3km");
        assert_eq!(end.tooltip[2], "Duration: 1:02:05");
        assert_eq!(end.position, t.samples()[2].position.unwrap());
    }

    #[test]
    fn test_no_markers_without_positions() {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let t = Track::new(vec![Sample::at(start)]).unwrap();
        assert!(session_markers(&t).is_none());
    }

    #[test]
    fn test_labels_every_interval() {
        // one sample every 10s for 70s
        let points: Vec<(i64, Option<u16>)> =
            (0..8).map(|i| (i * 10, Some(100 + i as u16 * 10))).collect();
        let labels = heart_rate_labels(&track(&points), 30.0);

        // first boundary at 0 fires on the first interval, then every 30s
        let elapsed: Vec<f64> = labels.iter().map(|l| l.elapsed_seconds).collect();
        assert_eq!(elapsed, vec![10.0, 30.0, 60.0]);
        assert_eq!(labels[0].text, "100");
        // samples 1 and 2 (110, 120) make up the second interval
        assert_eq!(labels[1].mean_heart_rate, 115.0);
        // samples 3, 4, 5 (130, 140, 150)
        assert_eq!(labels[2].mean_heart_rate, 140.0);
    }

    #[test]
    fn test_long_pause_does_not_burst() {
        let labels = heart_rate_labels(
            &track(&[(0, Some(100)), (10, Some(100)), (200, Some(120)), (210, Some(130)), (230, Some(140))]),
            30.0,
        );
        let elapsed: Vec<f64> = labels.iter().map(|l| l.elapsed_seconds).collect();
        assert_eq!(elapsed, vec![10.0, 200.0, 210.0]);
    }

    #[test]
    fn test_labels_skip_intervals_without_heart_rate() {
        let labels = heart_rate_labels(&track(&[(0, None), (40, None), (80, Some(150))]), 30.0);
        assert!(labels.is_empty());
    }
}
