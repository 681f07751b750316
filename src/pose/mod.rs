//! Pose and hand keypoint model
//!
//! Landmark identifiers, detector output and the normalization of raw
//! positions into screen space.

mod keypoint;
mod landmark;
mod normalize;

pub use keypoint::{DetectedHand, HandPair, HandSelection, Keypoint, KeypointSet, Position, Reading};
pub use landmark::{BodyPart, HandPart, Handedness, Landmark, Stream, UnknownLandmark};
pub use normalize::{normalize, Axis, NormalizedPosition};
