// Library interface for watchmap modules
// Integration tests and benches drive the pipeline through these

pub mod config;
pub mod encode;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use encode::VisualizationEncoder;
pub use error::{Result, Stage, WatchmapError};
pub use export::{BundleWriter, ExportOutcome};
pub use import::{RawActivity, RawRecord, RawValue};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricRange, MetricRanges};
pub use normalize::RecordNormalizer;
pub use pipeline::{ActivityBundle, ActivityPipeline};
pub use zones::{HeartRateZones, ZoneAnalyzer, ZoneCalculator, ZoneOccupancy};
