use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EncodingSettings, MetricCatalog};
use crate::encode::colormap::{ColorScale, Colormap};
use crate::error::{Result, WatchmapError};
use crate::metrics::{MetricRange, MetricRanges};
use crate::models::{Metric, Position, Sample, Track};

/// Map layers in the order they are stacked; the first one is shown initially
pub const LAYER_ORDER: [Metric; 3] = [Metric::Speed, Metric::HeartRate, Metric::Altitude];

/// One circle marker on a map layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedPoint {
    pub position: Position,
    pub timestamp: DateTime<Utc>,
    /// Recorded value of the layer's metric
    pub value: f64,
    /// Value the color and radius were derived from
    pub display_value: f64,
    /// `#rrggbb`
    pub color: String,
    pub radius: f64,
    pub fill_opacity: f64,
    pub tooltip: Vec<String>,
}

/// An independently toggleable set of markers for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub metric: Metric,
    pub name: String,
    pub visible: bool,
    pub range: MetricRange,
    pub points: Vec<EncodedPoint>,
}

/// Per-sample color and size encodings
#[derive(Debug, Clone)]
pub struct LayerEncoder<'a> {
    settings: &'a EncodingSettings,
    catalog: &'a MetricCatalog,
    colormap: Colormap,
}

impl<'a> LayerEncoder<'a> {
    pub fn new(settings: &'a EncodingSettings, catalog: &'a MetricCatalog) -> Self {
        Self {
            settings,
            catalog,
            colormap: Colormap::default(),
        }
    }

    /// Value used for visual encodings only
    ///
    /// A speed of exactly 0 is drawn as `zero_speed_floor`; analytics keep
    /// the recorded value.
    pub fn display_value(&self, metric: Metric, value: f64) -> f64 {
        if metric == Metric::Speed && value == 0.0 {
            self.settings.zero_speed_floor
        } else {
            value
        }
    }

    /// Marker radius from a normalized value, bounded by `min_radius` and
    /// `base_radius + radius_scale`
    pub fn radius(&self, normalized: f64) -> f64 {
        let n = normalized.clamp(0.0, 1.0);
        (self.settings.base_radius + self.settings.radius_scale * n).max(self.settings.min_radius)
    }

    /// Layers for every metric observed in the track, in `LAYER_ORDER`
    ///
    /// Metrics never observed produce no layer at all.
    pub fn encode_layers(&self, track: &Track, ranges: &MetricRanges) -> Vec<MapLayer> {
        let mut layers = Vec::new();
        for metric in LAYER_ORDER {
            match self.encode_layer(track, ranges, metric) {
                Ok(mut layer) => {
                    layer.visible = layers.is_empty();
                    layers.push(layer);
                }
                Err(e) => debug!(%metric, "Suppressing layer: {}", e),
            }
        }
        layers
    }

    /// Layer for a single metric; `EmptyMetric` when it was never observed
    pub fn encode_layer(
        &self,
        track: &Track,
        ranges: &MetricRanges,
        metric: Metric,
    ) -> Result<MapLayer> {
        let range = *ranges.require(metric)?;
        let style = self.catalog.style(metric).ok_or(WatchmapError::EmptyMetric { metric })?;
        let scale = ColorScale::new(range, self.colormap);

        let points = track
            .samples()
            .iter()
            .filter_map(|sample| {
                let position = sample.position?;
                let value = sample.value(metric)?;
                let display_value = self.display_value(metric, value);
                Some(EncodedPoint {
                    position,
                    timestamp: sample.timestamp,
                    value,
                    display_value,
                    color: scale.color(display_value).to_hex(),
                    radius: self.radius(range.normalize(display_value)),
                    fill_opacity: self.settings.fill_opacity,
                    tooltip: self.tooltip(sample),
                })
            })
            .collect();

        Ok(MapLayer {
            metric,
            name: style.display_name.clone(),
            visible: false,
            range,
            points,
        })
    }

    /// Tooltip lines listing every recorded metric of the sample
    pub fn tooltip(&self, sample: &Sample) -> Vec<String> {
        let mut lines = Vec::new();
        for metric in LAYER_ORDER {
            let (Some(value), Some(style)) = (sample.value(metric), self.catalog.style(metric))
            else {
                continue;
            };
            let formatted = match metric {
                Metric::HeartRate => format!("{:.0}", value),
                _ => format!("{:.1}", value),
            };
            lines.push(format!("{}: {}{}", style.display_name, formatted, style.unit));
        }
        lines.push(format!("Time: {}", sample.timestamp));
        lines
    }
}
