//! Mapping validation errors

use thiserror::Error;

use super::MappingId;

/// Errors raised when a mapping is created or edited.
///
/// None of these can occur while dispatching: a mapping that made it into
/// the table has already been validated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("input window is degenerate: start and end are both {0}")]
    DegenerateWindow(f64),

    #[error("input window start {start} is greater than end {end}")]
    InvertedWindow { start: f64, end: f64 },

    #[error("input window {start}..{end} is outside 0..1")]
    WindowOutOfBounds { start: f64, end: f64 },

    #[error("output range min {min} is greater than max {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("glide step must be a non-negative number, got {0}")]
    InvalidGlideStep(f64),

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("no mapping with id {0}")]
    NotFound(MappingId),

    #[error("a mapping with id {0} already exists")]
    DuplicateId(MappingId),
}
