//! Mapping system for turning keypoint positions into control values
//!
//! Each mapping restricts a normalized screen axis to a window, rescales it
//! into an output range and glide-limits the result.

mod bounds;
mod error;
mod glide;
mod range;
mod table;

pub use bounds::{bound_between, bound_to, nearly_equal, CHANGE_EPSILON};
pub use error::MappingError;
pub use glide::{step, GlideLimiter};
pub use range::{map_range, InputWindow, OutputRange, RangeMapper, Scaled};
pub use table::{
    default_mapping, Mapping, MappingBuilder, MappingId, MappingPatch, MappingTable,
    DEFAULT_GLIDE_STEP,
};
