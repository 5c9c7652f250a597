use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::MetricRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn lerp(self, other: Rgb, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    /// `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Clone, Copy)]
struct ColorStop {
    at: f64,
    color: Rgb,
}

const fn stop(at: f64, r: u8, g: u8, b: u8) -> ColorStop {
    ColorStop {
        at,
        color: Rgb::new(r, g, b),
    }
}

// Plasma sampled every 10%
const PLASMA_STOPS: [ColorStop; 11] = [
    stop(0.0, 13, 8, 135),
    stop(0.1, 65, 4, 157),
    stop(0.2, 106, 0, 168),
    stop(0.3, 143, 13, 164),
    stop(0.4, 177, 42, 144),
    stop(0.5, 204, 71, 120),
    stop(0.6, 225, 100, 98),
    stop(0.7, 242, 132, 75),
    stop(0.8, 252, 166, 54),
    stop(0.9, 252, 206, 37),
    stop(1.0, 240, 249, 33),
];

/// Perceptually uniform continuous colormaps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Plasma,
}

impl Colormap {
    fn stops(&self) -> &'static [ColorStop] {
        match self {
            Colormap::Plasma => &PLASMA_STOPS,
        }
    }

    /// Color at position `t` in [0, 1]; out-of-range input is clipped
    pub fn sample(&self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        for window in stops.windows(2) {
            let (start, end) = (window[0], window[1]);
            if t <= end.at {
                let span = (end.at - start.at).max(f64::EPSILON);
                return start.color.lerp(end.color, (t - start.at) / span);
            }
        }
        stops[stops.len() - 1].color
    }
}

/// Maps metric values onto a colormap through the metric's range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    range: MetricRange,
    colormap: Colormap,
}

impl ColorScale {
    pub fn new(range: MetricRange, colormap: Colormap) -> Self {
        Self { range, colormap }
    }

    /// Values are clipped to the range before lookup
    pub fn color(&self, value: f64) -> Rgb {
        self.colormap.sample(self.range.fraction(self.range.clamp(value)))
    }
}
