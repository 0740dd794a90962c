//! Display toggles and colormaps shared by previews and exports.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Global display toggles applied to every sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayOptions {
    /// Logarithmic histogram y-axis.
    pub log_scale: bool,
    /// Normalize each histogram to its own peak.
    pub normalize: bool,
}

/// Available colormaps for heatmap rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Colormap {
    /// Viridis - dark purple through teal to yellow.
    #[default]
    Viridis,
    /// Hot (Thermal) - black to red to yellow to white.
    Hot,
    /// Grayscale - black to white.
    Grayscale,
}

// Sampled at 0, 1/8, ..., 1.
const VIRIDIS: [[f32; 3]; 9] = [
    [68.0, 1.0, 84.0],
    [71.0, 44.0, 122.0],
    [59.0, 81.0, 139.0],
    [44.0, 113.0, 142.0],
    [33.0, 144.0, 141.0],
    [39.0, 173.0, 129.0],
    [92.0, 200.0, 99.0],
    [170.0, 220.0, 50.0],
    [253.0, 231.0, 37.0],
];

impl Colormap {
    pub const ALL: [Colormap; 3] = [Colormap::Viridis, Colormap::Hot, Colormap::Grayscale];

    /// Apply the colormap to a normalized value in `[0, 1]`.
    ///
    /// Out-of-range and NaN inputs are clamped.
    #[must_use]
    pub fn apply(self, val: f64) -> [u8; 3] {
        let v = if val.is_nan() { 0.0 } else { val.clamp(0.0, 1.0) };
        #[allow(clippy::cast_possible_truncation)]
        let v = v as f32;
        match self {
            Colormap::Grayscale => {
                let g = to_u8(v * 255.0);
                [g, g, g]
            }
            Colormap::Hot => {
                let r = to_u8(v * 3.0 * 255.0);
                let g = to_u8((v * 3.0 - 1.0) * 255.0);
                let b = to_u8((v * 3.0 - 2.0) * 255.0);
                [r, g, b]
            }
            Colormap::Viridis => {
                let pos = v * 8.0;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let i = (pos.floor() as usize).min(7);
                #[allow(clippy::cast_precision_loss)]
                let t = pos - i as f32;
                let a = VIRIDIS[i];
                let b = VIRIDIS[i + 1];
                [
                    to_u8(a[0] + (b[0] - a[0]) * t),
                    to_u8(a[1] + (b[1] - a[1]) * t),
                    to_u8(a[2] + (b[2] - a[2]) * t),
                ]
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(val: f32) -> u8 {
    val.round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Colormap::Viridis => write!(f, "viridis"),
            Colormap::Hot => write!(f, "hot"),
            Colormap::Grayscale => write!(f, "grayscale"),
        }
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viridis" => Ok(Colormap::Viridis),
            "hot" => Ok(Colormap::Hot),
            "grayscale" | "gray" | "grey" => Ok(Colormap::Grayscale),
            other => Err(format!("unknown colormap '{other}'")),
        }
    }
}
