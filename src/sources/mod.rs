//! Keypoint sources for Soma
//!
//! Sources stand in front of the external pose and hand detectors and hand
//! keypoint sets to the dispatch loop.

mod replay;
mod source;

pub use replay::{Recording, ReplayHandSource, ReplayPoseSource};
pub use source::{HandSource, PoseSource, Sources};
