use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use tempfile::TempDir;
use watchmap::import::{RawActivity, RawRecord, RawValue};
use watchmap::normalize::{session_summary, RecordNormalizer};
use watchmap::{
    ActivityPipeline, AppConfig, BundleWriter, ExportOutcome, Metric, Stage, WatchmapError,
};

/// End-to-end tests from raw decoder records to the exported bundle

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap()
}

fn record(secs: i64) -> RawRecord {
    RawRecord::new().with(
        "timestamp",
        RawValue::Timestamp(start() + chrono::Duration::seconds(secs)),
    )
}

fn positioned(secs: i64) -> RawRecord {
    record(secs)
        .with("position_lat", RawValue::Integer(555_000_000 + secs * 100))
        .with("position_long", RawValue::Integer(150_000_000))
}

fn single_session() -> Vec<RawRecord> {
    vec![RawRecord::new()
        .with("sport", RawValue::Text("cycling".to_string()))
        .with("total_distance", RawValue::Float(1200.0))
        .with("avg_speed", RawValue::Float(5.0))]
}

fn pipeline() -> ActivityPipeline {
    ActivityPipeline::new(AppConfig::default()).unwrap()
}

#[test]
fn test_three_point_zone_attribution() {
    let records = [(0, 60), (10, 150), (20, 60)]
        .iter()
        .map(|&(secs, hr)| positioned(secs).with("heart_rate", RawValue::Integer(hr)))
        .collect();

    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();

    assert_eq!(bundle.zones.max_hr, 175);
    assert_eq!(bundle.zones.reserve(), 125);

    let occupancy = &bundle.occupancy;
    assert!((occupancy.total_seconds() - 20.0).abs() < 1e-6);
    assert!((occupancy.get("resting").unwrap().duration_seconds - 10.0).abs() < 1e-6);
    // 150 sits exactly on the cardio/sprint boundary and belongs to the zone below
    assert!((occupancy.get("cardio").unwrap().duration_seconds - 10.0).abs() < 1e-6);
    assert_eq!(occupancy.get("sprint").unwrap().duration_seconds, 0.0);
}

#[test]
fn test_zone_time_matches_elapsed_time_with_gaps() {
    // irregular sampling with a hole in the heart-rate stream
    let hrs = [Some(95), Some(120), None, Some(140), Some(160), Some(171), Some(130)];
    let offsets = [0, 1, 3, 4, 7, 8, 13];
    let records = offsets
        .iter()
        .zip(hrs.iter())
        .map(|(&secs, hr)| {
            let r = positioned(secs);
            match hr {
                Some(hr) => r.with("heart_rate", RawValue::Integer(*hr)),
                None => r,
            }
        })
        .collect();

    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();

    assert!((bundle.occupancy.total_seconds() - 13.0).abs() < 1e-6);
    let percent: f64 = bundle.occupancy.zones.iter().map(|z| z.percentage).sum();
    assert!((percent - 100.0).abs() < 1e-9);
}

#[test]
fn test_semicircle_decoding() {
    let records = vec![
        record(0)
            .with("position_lat", RawValue::Integer(0))
            .with("position_long", RawValue::Integer(0)),
        record(1)
            .with("position_lat", RawValue::Integer(1 << 30))
            .with("position_long", RawValue::Integer(-(1 << 30))),
    ];
    let track = RecordNormalizer::requiring_position()
        .normalize(records)
        .unwrap()
        .track;

    let first = track.samples()[0].position.unwrap();
    assert_eq!(first.latitude, 0.0);
    assert_eq!(first.longitude, 0.0);
    let second = track.samples()[1].position.unwrap();
    assert_eq!(second.latitude, 90.0);
    assert_eq!(second.longitude, -90.0);
}

#[test]
fn test_speed_converted_to_kmh() {
    let records = vec![record(0).with("enhanced_speed", RawValue::Float(10.0))];
    let track = RecordNormalizer::new().normalize(records).unwrap().track;
    assert!((track.samples()[0].speed.unwrap() - 36.0).abs() < 1e-9);
    assert!(!track.has_metric(Metric::Altitude));
}

#[test]
fn test_zero_speed_is_floored_only_for_visuals() {
    let records = vec![
        positioned(0).with("speed", RawValue::Float(0.0)),
        positioned(1).with("speed", RawValue::Float(0.01 / 3.6)),
        positioned(2).with("speed", RawValue::Float(8.0)),
    ];

    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();

    assert_eq!(bundle.ranges.get(Metric::Speed).unwrap().min, 0.0);
    assert_eq!(bundle.track.samples()[0].speed, Some(0.0));
    assert_eq!(bundle.chart.get(Metric::Speed).unwrap().points[0].value, 0.0);

    let map = bundle.map.as_ref().unwrap();
    let speed = map.layers.iter().find(|l| l.metric == Metric::Speed).unwrap();
    let (zero, floor) = (&speed.points[0], &speed.points[1]);
    assert_eq!(zero.value, 0.0);
    assert_eq!(zero.display_value, 0.01);
    assert!((zero.radius - floor.radius).abs() < 1e-9);
    assert_eq!(zero.color, floor.color);
}

#[test]
fn test_session_shape() {
    assert!(matches!(
        session_summary(Vec::new()),
        Err(WatchmapError::SessionShape { found: 0 })
    ));
    assert!(matches!(
        session_summary(vec![RawRecord::new(), RawRecord::new()]),
        Err(WatchmapError::SessionShape { found: 2 })
    ));

    let summary = session_summary(single_session()).unwrap();
    assert_eq!(summary.sport.as_deref(), Some("cycling"));
    assert_eq!(summary.avg_speed, Some(18.0));
    assert!(summary.max_speed.is_none());
}

#[test]
fn test_missing_session_keeps_track_and_analytics() {
    let records = (0..4)
        .map(|i| positioned(i * 5).with("heart_rate", RawValue::Integer(130)))
        .collect();
    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: Vec::new(),
        })
        .unwrap();

    assert_eq!(bundle.track.len(), 4);
    assert!((bundle.occupancy.total_seconds() - 15.0).abs() < 1e-6);
    let err = bundle.require_session().unwrap_err();
    assert!(matches!(err, WatchmapError::SessionShape { found: 0 }));
}

#[test]
fn test_out_of_order_records_abort() {
    let records = vec![positioned(10), positioned(0)];
    let err = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap_err();

    assert!(matches!(err, WatchmapError::MalformedSample { index: 1, .. }));
    assert_eq!(err.stage(), Stage::Normalization);
}

#[test]
fn test_wrong_field_type_aborts() {
    let records = vec![record(0).with("heart_rate", RawValue::Text("fast".to_string()))];
    let err = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap_err();
    assert!(matches!(err, WatchmapError::MalformedSample { index: 0, .. }));
}

#[test]
fn test_track_without_gps_still_gets_chart_and_zones() {
    let records = (0..5)
        .map(|i| {
            record(i * 10)
                .with("heart_rate", RawValue::Integer(140 + i))
                .with("altitude", RawValue::Float(300.0 + i as f64))
        })
        .collect();

    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();

    assert!(bundle.map.is_none());
    assert_eq!(bundle.track.len(), 5);
    assert_eq!(bundle.chart.series.len(), 2);
    assert!((bundle.occupancy.total_seconds() - 40.0).abs() < 1e-6);
}

#[test]
fn test_absent_metric_has_no_layer_or_range() {
    let records = (0..3)
        .map(|i| positioned(i).with("heart_rate", RawValue::Integer(120)))
        .collect();
    let bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();

    assert!(bundle.ranges.get(Metric::Speed).is_none());
    let map = bundle.map.unwrap();
    assert_eq!(map.layers.len(), 1);
    assert_eq!(map.layers[0].metric, Metric::HeartRate);
    assert!(map.layers[0].visible);
}

#[test]
fn test_export_bundle_to_disk() {
    let dir = TempDir::new().unwrap();
    let records = (0..40)
        .map(|i| {
            positioned(i * 5)
                .with("heart_rate", RawValue::Integer(110 + i))
                .with("speed", RawValue::Float(3.0))
                .with("distance", RawValue::Float(i as f64 * 15.0))
        })
        .collect();
    let mut bundle = pipeline()
        .run(RawActivity {
            records,
            sessions: single_session(),
        })
        .unwrap();
    bundle.embed_source(b"not really a fit file");

    let writer = BundleWriter::new(dir.path().join("out"));
    let outcome = writer.write(Path::new("ride.fit"), &bundle).unwrap();
    let ExportOutcome::Written(path) = outcome else {
        panic!("expected the bundle to be written");
    };

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["session"]["sport"], "cycling");
    assert_eq!(json["map"]["layers"][0]["metric"], "speed");
    assert_eq!(json["map"]["end"]["tooltip"][1], "Length: 0.6km");
    assert_eq!(json["chart"]["series"][0]["metric"], "heart_rate");
    assert!(json["embedded_source"].is_string());
    assert!(json["ranges"]["heart_rate"]["max"].is_number());
}
