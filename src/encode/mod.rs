//! Renderer-agnostic visual encodings
//!
//! Everything here is plain data: colors are hex strings, sizes are radii in
//! pixels and positions are degrees. Drawing is left to whatever consumes the
//! exported bundle.

pub mod chart;
pub mod colormap;
pub mod layers;
pub mod markers;

pub use chart::{ChartDataset, ChartPoint, TimeSeries};
pub use colormap::{ColorScale, Colormap, Rgb};
pub use layers::{EncodedPoint, LayerEncoder, MapLayer, LAYER_ORDER};
pub use markers::{AggregateLabel, MarkerKind, SessionMarker};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::metrics::MetricRanges;
use crate::models::{Position, Track};

/// Positional outputs of one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// Mean of all positioned samples
    pub center: Position,
    pub layers: Vec<MapLayer>,
    pub start: SessionMarker,
    pub end: SessionMarker,
    /// Mean heart rate every aggregation interval
    pub labels: Vec<AggregateLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedActivity {
    /// `None` when the track carries no GPS position at all
    pub map: Option<MapView>,
    pub chart: ChartDataset,
}

/// Builds map layers, markers and the chart dataset from a track
pub struct VisualizationEncoder<'a> {
    config: &'a AppConfig,
}

impl<'a> VisualizationEncoder<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn encode(&self, track: &Track, ranges: &MetricRanges) -> EncodedActivity {
        let chart = ChartDataset::from_track(track, ranges, &self.config.metrics);
        let map = self.encode_map(track, ranges);
        if map.is_none() {
            warn!("Track has no GPS positions; map layers and markers are omitted");
        }

        EncodedActivity { map, chart }
    }

    /// Map layers and markers; `None` without positions
    pub fn encode_map(&self, track: &Track, ranges: &MetricRanges) -> Option<MapView> {
        let center = track.center()?;
        let (start, end) = markers::session_markers(track)?;

        let layers = LayerEncoder::new(&self.config.encoding, &self.config.metrics)
            .encode_layers(track, ranges);
        let labels = markers::heart_rate_labels(
            track,
            self.config.analysis.zone_aggregation_interval,
        );
        debug!(
            layers = layers.len(),
            labels = labels.len(),
            "Encoded map view"
        );

        Some(MapView {
            center,
            layers,
            start,
            end,
            labels,
        })
    }
}
