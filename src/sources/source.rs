//! Keypoint source traits
//!
//! Sources wrap the external pose and hand detectors. The dispatcher polls
//! them only on active ticks and never sees their errors: a failed detection
//! is logged here and becomes an empty keypoint set.

use tracing::warn;

use crate::pose::{BodyPart, DetectedHand, HandPair, HandSelection, KeypointSet};

/// Trait for body-pose detectors
pub trait PoseSource: Send {
    /// Get the name of this source
    fn name(&self) -> &str;

    /// Run one pose estimation on the current frame
    fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>>;
}

/// Trait for hand detectors
pub trait HandSource: Send {
    /// Get the name of this source
    fn name(&self) -> &str;

    /// Run one hand estimation on the current frame; may report any number
    /// of hands of either handedness
    fn estimate_hands(&mut self) -> anyhow::Result<Vec<DetectedHand>>;
}

/// The detectors a dispatch loop reads from. Either may be absent.
#[derive(Default)]
pub struct Sources {
    pub body: Option<Box<dyn PoseSource>>,
    pub hands: Option<Box<dyn HandSource>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body source (builder pattern)
    pub fn with_body<S: PoseSource + 'static>(mut self, source: S) -> Self {
        self.body = Some(Box::new(source));
        self
    }

    /// Add a hand source (builder pattern)
    pub fn with_hands<S: HandSource + 'static>(mut self, source: S) -> Self {
        self.hands = Some(Box::new(source));
        self
    }

    /// Poll the body source. Failures and a missing source both yield an
    /// empty set.
    pub fn poll_body(&mut self) -> KeypointSet<BodyPart> {
        let Some(source) = self.body.as_mut() else {
            return KeypointSet::new();
        };

        match source.estimate_pose() {
            Ok(keypoints) => keypoints,
            Err(e) => {
                warn!(source = source.name(), error = %e, "pose detection failed");
                KeypointSet::new()
            }
        }
    }

    /// Poll the hand source and reduce the result to one hand per side
    pub fn poll_hands(&mut self, selection: HandSelection) -> HandPair {
        let Some(source) = self.hands.as_mut() else {
            return HandPair::default();
        };

        match source.estimate_hands() {
            Ok(hands) => HandPair::select(hands, selection),
            Err(e) => {
                warn!(source = source.name(), error = %e, "hand detection failed");
                HandPair::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Handedness, Reading};
    use anyhow::anyhow;

    struct FailingPose;

    impl PoseSource for FailingPose {
        fn name(&self) -> &str {
            "failing"
        }

        fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>> {
            Err(anyhow!("inference error"))
        }
    }

    struct FixedPose;

    impl PoseSource for FixedPose {
        fn name(&self) -> &str {
            "fixed"
        }

        fn estimate_pose(&mut self) -> anyhow::Result<KeypointSet<BodyPart>> {
            Ok(KeypointSet::new().with(BodyPart::Nose, 1.0, 2.0, 0.9))
        }
    }

    struct FailingHands;

    impl HandSource for FailingHands {
        fn name(&self) -> &str {
            "failing_hands"
        }

        fn estimate_hands(&mut self) -> anyhow::Result<Vec<DetectedHand>> {
            Err(anyhow!("model not loaded"))
        }
    }

    #[test]
    fn test_failure_becomes_empty_set() {
        let mut sources = Sources::new().with_body(FailingPose).with_hands(FailingHands);

        assert!(sources.poll_body().is_empty());
        let pair = sources.poll_hands(HandSelection::First);
        assert!(pair.side(Handedness::Left).is_empty());
        assert!(pair.side(Handedness::Right).is_empty());
    }

    #[test]
    fn test_missing_source_is_empty() {
        let mut sources = Sources::new();
        assert!(sources.poll_body().is_empty());
    }

    #[test]
    fn test_poll_body() {
        let mut sources = Sources::new().with_body(FixedPose);
        let set = sources.poll_body();
        assert!(matches!(set.reading(BodyPart::Nose), Reading::Present { .. }));
    }
}
