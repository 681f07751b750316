//! Keypoints as produced by the external detectors

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::{HandPart, Handedness};

/// Pixel-space position reported by a detector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

/// A detected keypoint with its confidence score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub position: Position,
    pub score: f64,
}

/// What a detection says about one part
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Present { position: Position, score: f64 },
    Absent,
}

/// The keypoints of one skeleton for one detection tick
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSet<P: Eq + Hash> {
    points: HashMap<P, Keypoint>,
}

impl<P: Copy + Eq + Hash> KeypointSet<P> {
    pub fn new() -> Self {
        Self {
            points: HashMap::new(),
        }
    }

    /// Add a keypoint (builder pattern)
    pub fn with(mut self, part: P, x: f64, y: f64, score: f64) -> Self {
        self.insert(part, Keypoint { position: Position::new(x, y), score });
        self
    }

    pub fn insert(&mut self, part: P, keypoint: Keypoint) {
        self.points.insert(part, keypoint);
    }

    pub fn reading(&self, part: P) -> Reading {
        match self.points.get(&part) {
            Some(kp) => Reading::Present {
                position: kp.position,
                score: kp.score,
            },
            None => Reading::Absent,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<P: Copy + Eq + Hash> Default for KeypointSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// One hand reported by the hand detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    pub handedness: Handedness,
    /// Whole-hand detection score
    pub score: f64,
    pub keypoints: KeypointSet<HandPart>,
}

/// How to pick one left and one right hand when the detector reports more
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSelection {
    /// First hand of each handedness, in detector order
    #[default]
    First,
    /// Highest scoring hand of each handedness
    HighestScore,
}

/// At most one hand per side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandPair {
    pub left: KeypointSet<HandPart>,
    pub right: KeypointSet<HandPart>,
}

impl HandPair {
    /// Reduce a detector result to one left and one right hand. Extra hands
    /// are dropped; a missing side is an empty set.
    pub fn select(hands: Vec<DetectedHand>, selection: HandSelection) -> Self {
        let mut left: Option<DetectedHand> = None;
        let mut right: Option<DetectedHand> = None;

        for hand in hands {
            let slot = match hand.handedness {
                Handedness::Left => &mut left,
                Handedness::Right => &mut right,
            };
            let replace = match (slot.as_ref(), selection) {
                (None, _) => true,
                (Some(_), HandSelection::First) => false,
                (Some(kept), HandSelection::HighestScore) => hand.score > kept.score,
            };
            if replace {
                *slot = Some(hand);
            }
        }

        Self {
            left: left.map(|h| h.keypoints).unwrap_or_default(),
            right: right.map(|h| h.keypoints).unwrap_or_default(),
        }
    }

    pub fn side(&self, handedness: Handedness) -> &KeypointSet<HandPart> {
        match handedness {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }
}
