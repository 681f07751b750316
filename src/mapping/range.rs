//! Windowed range mapping
//!
//! Takes a segment `start..end` of the normalized `0..1` screen range and
//! scales it to an output range such as `0..127`. Inputs outside the window
//! are clamped to its edges, never extrapolated.

use super::bounds::{bound_between, bound_to};
use super::MappingError;

/// Result of mapping one value through a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled {
    /// The value in the output range
    pub scaled: f64,
    /// The input after clamping to the window
    pub clamped_input: f64,
}

/// Map `value` from the window `window_start..window_end` onto
/// `range_start..range_end`.
///
/// The result always lies within the closed output range. Fails only when
/// the window has zero width.
pub fn map_range(
    window_start: f64,
    window_end: f64,
    range_start: f64,
    range_end: f64,
    value: f64,
) -> Result<Scaled, MappingError> {
    let clamped_input = bound_to(window_start, window_end, value);

    if window_end == window_start {
        return Err(MappingError::DegenerateWindow(window_start));
    }

    let raw = interpolate(window_start, window_end, range_start, range_end, clamped_input);

    Ok(Scaled {
        scaled: bound_between(range_start, range_end, raw),
        clamped_input,
    })
}

// Blend the range ends by the input's position in the window. Never forms
// `range_end - range_start`, which overflows for ranges spanning most of f64.
fn interpolate(window_start: f64, window_end: f64, range_start: f64, range_end: f64, input: f64) -> f64 {
    let t = (input - window_start) / (window_end - window_start);
    range_start * (1.0 - t) + range_end * t
}

/// Validated sub-range of the normalized screen axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputWindow {
    start: f64,
    end: f64,
}

impl InputWindow {
    /// Full screen, `0..1`
    pub const FULL: InputWindow = InputWindow { start: 0.0, end: 1.0 };

    /// Create a window, rejecting empty, inverted or off-screen bounds
    pub fn new(start: f64, end: f64) -> Result<Self, MappingError> {
        if !start.is_finite() {
            return Err(MappingError::NonFinite("input window start"));
        }
        if !end.is_finite() {
            return Err(MappingError::NonFinite("input window end"));
        }
        if start == end {
            return Err(MappingError::DegenerateWindow(start));
        }
        if start > end {
            return Err(MappingError::InvertedWindow { start, end });
        }
        if start < 0.0 || end > 1.0 {
            return Err(MappingError::WindowOutOfBounds { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

/// Validated output value range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRange {
    min: f64,
    max: f64,
}

impl OutputRange {
    /// The 7-bit MIDI controller range
    pub const MIDI: OutputRange = OutputRange { min: 0.0, max: 127.0 };

    /// Create a range; `min == max` is allowed and pins the output.
    pub fn new(min: f64, max: f64) -> Result<Self, MappingError> {
        if !min.is_finite() {
            return Err(MappingError::NonFinite("output range min"));
        }
        if !max.is_finite() {
            return Err(MappingError::NonFinite("output range max"));
        }
        if min > max {
            return Err(MappingError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamp a value into this range
    pub fn clamp(&self, value: f64) -> f64 {
        bound_to(self.min, self.max, value)
    }
}

/// A window and range pair that has already been validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMapper {
    window: InputWindow,
    range: OutputRange,
}

impl RangeMapper {
    pub fn new(window: InputWindow, range: OutputRange) -> Self {
        Self { window, range }
    }

    pub fn window(&self) -> InputWindow {
        self.window
    }

    pub fn range(&self) -> OutputRange {
        self.range
    }

    /// Map a normalized screen value. Infallible because the window is
    /// known to be non-degenerate.
    pub fn map(&self, value: f64) -> Scaled {
        let clamped_input = bound_to(self.window.start, self.window.end, value);
        let raw = interpolate(
            self.window.start,
            self.window.end,
            self.range.min,
            self.range.max,
            clamped_input,
        );

        Scaled {
            scaled: self.range.clamp(raw),
            clamped_input,
        }
    }
}
