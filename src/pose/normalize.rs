//! Pixel to screen-space normalization
//!
//! Converts a detector position into `0..1` on both axes, with the vertical
//! axis flipped so that raising a hand increases the value.

use serde::{Deserialize, Serialize};

use super::Reading;

/// Screen axis a mapping reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal, 0 = left edge
    X,
    /// Vertical, 0 = bottom edge
    Y,
}

/// A keypoint position in normalized screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedPosition {
    Available { x: f64, y: f64 },
    /// Missing or not confident enough to use this tick
    Unavailable,
}

impl NormalizedPosition {
    pub fn axis(&self, axis: Axis) -> Option<f64> {
        match (self, axis) {
            (NormalizedPosition::Available { x, .. }, Axis::X) => Some(*x),
            (NormalizedPosition::Available { y, .. }, Axis::Y) => Some(*y),
            (NormalizedPosition::Unavailable, _) => None,
        }
    }
}

/// Normalize a keypoint reading against the frame size.
///
/// Readings at or below `min_confidence` are unavailable. Positions outside
/// the frame are pulled back onto its edge.
pub fn normalize(
    reading: &Reading,
    min_confidence: f64,
    frame_height: f64,
    frame_width: f64,
) -> NormalizedPosition {
    match *reading {
        Reading::Present { position, score } if score > min_confidence => {
            if frame_width <= 0.0 || frame_height <= 0.0 {
                return NormalizedPosition::Unavailable;
            }

            let x = (position.x / frame_width).abs();
            let y = (position.y / frame_height - 1.0).abs();

            if !x.is_finite() || !y.is_finite() {
                return NormalizedPosition::Unavailable;
            }

            NormalizedPosition::Available {
                x: x.min(1.0),
                y: y.min(1.0),
            }
        }
        Reading::Present { .. } | Reading::Absent => NormalizedPosition::Unavailable,
    }
}
