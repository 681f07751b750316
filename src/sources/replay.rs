//! Replay of recorded detector output
//!
//! A recording is a JSON-lines file, one detector frame per line:
//!
//! ```json
//! {"body":[{"name":"rightWrist","x":412.0,"y":120.5,"score":0.93}],
//!  "hands":[{"handedness":"Left","score":0.97,
//!            "keypoints":[{"name":"index_finger_tip","x":210.0,"y":300.0,"z":-0.02}]}]}
//! ```
//!
//! Each call to a replay source returns the next frame. Body keypoints
//! carry their own score; hand keypoints fall back to the hand's score.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::{HandSource, PoseSource};
use crate::pose::{BodyPart, DetectedHand, HandPart, Handedness, Keypoint, KeypointSet, Position};

#[derive(Debug, Clone, Deserialize)]
struct RecordedKeypoint {
    name: String,
    x: f64,
    y: f64,
    #[serde(default)]
    z: Option<f64>,
    #[serde(default)]
    score: Option<f64>,
}

impl RecordedKeypoint {
    fn keypoint(&self, fallback_score: f64) -> Keypoint {
        Keypoint {
            position: Position {
                x: self.x,
                y: self.y,
                z: self.z,
            },
            score: self.score.unwrap_or(fallback_score),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RecordedHand {
    handedness: Handedness,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    keypoints: Vec<RecordedKeypoint>,
}

// One line of a recording
#[derive(Debug, Clone, Default, Deserialize)]
struct RecordedFrame {
    #[serde(default)]
    body: Vec<RecordedKeypoint>,
    #[serde(default)]
    hands: Vec<RecordedHand>,
}

impl RecordedFrame {
    fn body_keypoints(&self) -> KeypointSet<BodyPart> {
        let mut set = KeypointSet::new();
        for kp in &self.body {
            match kp.name.parse::<BodyPart>() {
                Ok(part) => set.insert(part, kp.keypoint(0.0)),
                Err(e) => debug!(error = %e, "skipping recorded keypoint"),
            }
        }
        set
    }

    fn detected_hands(&self) -> Vec<DetectedHand> {
        self.hands
            .iter()
            .map(|hand| {
                let mut keypoints = KeypointSet::new();
                for kp in &hand.keypoints {
                    match kp.name.parse::<HandPart>() {
                        Ok(part) => keypoints.insert(part, kp.keypoint(hand.score)),
                        Err(e) => debug!(error = %e, "skipping recorded hand keypoint"),
                    }
                }
                DetectedHand {
                    handedness: hand.handedness,
                    score: hand.score,
                    keypoints,
                }
            })
            .collect()
    }
}

/// A loaded recording, shared by the body and hand replay sources
#[derive(Debug, Clone)]
pub struct Recording {
    frames: Arc<Vec<RecordedFrame>>,
}

impl Recording {
    /// Load a recording from a JSON-lines file
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open recording {:?}", path))?;
        Self::from_reader(file)
    }

    /// Parse a recording; blank lines are ignored
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut frames = Vec::new();

        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame = serde_json::from_str(&line)
                .with_context(|| format!("invalid frame on line {}", index + 1))?;
            frames.push(frame);
        }

        if frames.is_empty() {
            bail!("recording contains no frames");
        }

        Ok(Self {
            frames: Arc::new(frames),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Body replay over this recording
    pub fn pose_source(&self, looping: bool) -> ReplayPoseSource {
        ReplayPoseSource {
            cursor: Cursor::new(Arc::clone(&self.frames), looping),
        }
    }

    /// Hand replay over this recording
    pub fn hand_source(&self, looping: bool) -> ReplayHandSource {
        ReplayHandSource {
            cursor: Cursor::new(Arc::clone(&self.frames), looping),
        }
    }
}

#[derive(Debug)]
struct Cursor {
    frames: Arc<Vec<RecordedFrame>>,
    position: usize,
    looping: bool,
}

impl Cursor {
    fn new(frames: Arc<Vec<RecordedFrame>>, looping: bool) -> Self {
        Self {
            frames,
            position: 0,
            looping,
        }
    }

    fn next_frame(&mut self) -> Result<&RecordedFrame> {
        if self.position >= self.frames.len() {
            if !self.looping {
                bail!("recording exhausted after {} frames", self.frames.len());
            }
            self.position = 0;
        }
        let frame = &self.frames[self.position];
        self.position += 1;
        Ok(frame)
    }

    fn is_exhausted(&self) -> bool {
        !self.looping && self.position >= self.frames.len()
    }
}

/// Body source replaying a recording
#[derive(Debug)]
pub struct ReplayPoseSource {
    cursor: Cursor,
}

impl ReplayPoseSource {
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }
}

impl PoseSource for ReplayPoseSource {
    fn name(&self) -> &str {
        "replay_body"
    }

    fn estimate_pose(&mut self) -> Result<KeypointSet<BodyPart>> {
        Ok(self.cursor.next_frame()?.body_keypoints())
    }
}

/// Hand source replaying a recording
#[derive(Debug)]
pub struct ReplayHandSource {
    cursor: Cursor,
}

impl ReplayHandSource {
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }
}

impl HandSource for ReplayHandSource {
    fn name(&self) -> &str {
        "replay_hands"
    }

    fn estimate_hands(&mut self) -> Result<Vec<DetectedHand>> {
        Ok(self.cursor.next_frame()?.detected_hands())
    }
}
