//! Decode-to-bundle pipeline
//!
//! One activity runs start to finish on the calling thread. Everything is
//! built in memory first; nothing reaches the disk unless the whole run
//! succeeded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::encode::{ChartDataset, MapView, VisualizationEncoder};
use crate::error::{Result, WatchmapError};
use crate::import::fit::FitDecoder;
use crate::import::{ActivityDecoder, RawActivity};
use crate::metrics::MetricRanges;
use crate::models::{format_hms, SessionSummary, Track};
use crate::normalize::{session_summary, RecordNormalizer};
use crate::zones::{HeartRateZones, ZoneAnalyzer, ZoneCalculator, ZoneOccupancy};

/// Rendering-ready output of one activity
#[derive(Debug, Clone, Serialize)]
pub struct ActivityBundle {
    pub track: Track,
    pub ranges: MetricRanges,
    pub zones: HeartRateZones,
    pub occupancy: ZoneOccupancy,
    /// Absent when the track carries no GPS positions
    pub map: Option<MapView>,
    pub chart: ChartDataset,
    /// Absent when the file did not hold exactly one session record
    pub session: Option<SessionSummary>,
    /// Elapsed session time as h:mm:ss
    pub duration: String,
    /// Base64 copy of the source file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_source: Option<String>,
    #[serde(skip)]
    session_records: usize,
}

impl ActivityBundle {
    /// The session summary, for consumers that cannot do without it
    pub fn require_session(&self) -> Result<&SessionSummary> {
        self.session.as_ref().ok_or(WatchmapError::SessionShape {
            found: self.session_records,
        })
    }

    pub fn embed_source(&mut self, bytes: &[u8]) {
        self.embedded_source = Some(STANDARD.encode(bytes));
    }
}

/// Normalizer, analytics and encoder wired together with one configuration
pub struct ActivityPipeline {
    config: AppConfig,
    zones: HeartRateZones,
}

impl ActivityPipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let zones = ZoneCalculator::karvonen_zones(
            config.analysis.age,
            config.analysis.resting_heart_rate,
        )?;
        Ok(Self { config, zones })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn zones(&self) -> &HeartRateZones {
        &self.zones
    }

    /// Decode a FIT file and run it through the pipeline
    pub fn run_file(&self, path: &Path) -> Result<ActivityBundle> {
        let decoder = FitDecoder::new();
        if !decoder.can_decode(path) {
            return Err(WatchmapError::Decode(format!(
                "{} is not a {} file",
                path.display(),
                decoder.format_name()
            )));
        }
        let activity = decoder.decode_file(path)?;
        self.run(activity)
    }

    /// Run decoded records through normalization, analytics and encoding
    ///
    /// A malformed record aborts the run. A missing or repeated session
    /// record only leaves `session` empty.
    pub fn run(&self, activity: RawActivity) -> Result<ActivityBundle> {
        let RawActivity { records, sessions } = activity;

        // Position-bearing outputs want positioned samples only, unless the
        // whole file lacks GPS and there is nothing to drop them for
        let has_gps = records
            .iter()
            .any(|r| r.contains("position_lat") && r.contains("position_long"));
        let normalizer = if has_gps {
            RecordNormalizer::requiring_position()
        } else {
            RecordNormalizer::new()
        };
        let normalized = normalizer.normalize(records)?;
        let track = normalized.track;

        let ranges = MetricRanges::from_track(&track);

        let occupancy = ZoneAnalyzer::occupancy(&track, &self.zones);
        let encoded = VisualizationEncoder::new(&self.config).encode(&track, &ranges);

        let session_records = sessions.len();
        let session = match session_summary(sessions) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Session summary unavailable: {}", e);
                None
            }
        };

        let duration = format_hms(track.elapsed_seconds());
        info!(
            samples = track.len(),
            duration = %duration,
            layers = encoded.map.as_ref().map_or(0, |m| m.layers.len()),
            "Activity processed"
        );

        Ok(ActivityBundle {
            track,
            ranges,
            zones: self.zones.clone(),
            occupancy,
            map: encoded.map,
            chart: encoded.chart,
            session,
            duration,
            embedded_source: None,
            session_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{RawRecord, RawValue};
    use crate::models::Metric;
    use chrono::{TimeZone, Utc};

    fn record(secs: i64, hr: i64, positioned: bool) -> RawRecord {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let mut r = RawRecord::new()
            .with("timestamp", RawValue::Timestamp(ts))
            .with("heart_rate", RawValue::Integer(hr))
            .with("speed", RawValue::Float(2.5));
        if positioned {
            r.insert("position_lat", RawValue::Integer(548_000_000 + secs));
            r.insert("position_long", RawValue::Integer(90_000_000));
        }
        r
    }

    fn session() -> RawRecord {
        RawRecord::new().with("sport", RawValue::Text("running".to_string()))
    }

    #[test]
    fn test_run_produces_full_bundle() {
        let pipeline = ActivityPipeline::new(AppConfig::default()).unwrap();
        let activity = RawActivity {
            records: (0..6).map(|i| record(i * 10, 120 + i, true)).collect(),
            sessions: vec![session()],
        };

        let bundle = pipeline.run(activity).unwrap();
        assert_eq!(bundle.track.len(), 6);
        assert_eq!(bundle.duration, "0:00:50");
        assert!(bundle.ranges.contains(Metric::Speed));
        assert!(bundle.map.is_some());
        assert_eq!(bundle.require_session().unwrap().sport.as_deref(), Some("running"));
        assert!((bundle.occupancy.total_seconds() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_unpositioned_samples_dropped_when_track_has_gps() {
        let pipeline = ActivityPipeline::new(AppConfig::default()).unwrap();
        let activity = RawActivity {
            records: vec![
                record(0, 120, true),
                record(10, 125, false),
                record(20, 130, true),
            ],
            sessions: vec![session()],
        };

        let bundle = pipeline.run(activity).unwrap();
        assert_eq!(bundle.track.len(), 2);
    }

    #[test]
    fn test_session_shape_does_not_abort_track() {
        let pipeline = ActivityPipeline::new(AppConfig::default()).unwrap();
        let activity = RawActivity {
            records: (0..3).map(|i| record(i * 10, 120, true)).collect(),
            sessions: vec![session(), session()],
        };

        let bundle = pipeline.run(activity).unwrap();
        assert_eq!(bundle.track.len(), 3);
        assert!(bundle.session.is_none());
        assert!(matches!(
            bundle.require_session(),
            Err(WatchmapError::SessionShape { found: 2 })
        ));
    }

    #[test]
    fn test_embed_source() {
        let pipeline = ActivityPipeline::new(AppConfig::default()).unwrap();
        let mut bundle = pipeline
            .run(RawActivity {
                records: vec![record(0, 120, true)],
                sessions: vec![session()],
            })
            .unwrap();
        bundle.embed_source(b"FIT");
        assert_eq!(bundle.embedded_source.as_deref(), Some("RklU"));
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut config = AppConfig::default();
        config.analysis.resting_heart_rate = 180;
        assert!(ActivityPipeline::new(config).is_err());
    }
}
