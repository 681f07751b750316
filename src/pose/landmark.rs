//! Landmark identifiers
//!
//! Body parts follow the PoseNet 17-point skeleton, hand parts the
//! MediaPipe 21-point hand model. Names are written `snake_case`, but the
//! PoseNet `camelCase` spelling (`rightWrist`) is accepted when parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown landmark '{0}'")]
pub struct UnknownLandmark(pub String);

/// Compare ignoring case and word separators, so `rightWrist`,
/// `right_wrist` and `RIGHT-WRIST` all match.
fn same_name(candidate: &str, name: &str) -> bool {
    let mut a = candidate
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase());
    let mut b = name.chars().filter(|c| *c != '_');

    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x == y => continue,
            _ => return false,
        }
    }
}

/// PoseNet body keypoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    pub const ALL: [BodyPart; 17] = [
        BodyPart::Nose,
        BodyPart::LeftEye,
        BodyPart::RightEye,
        BodyPart::LeftEar,
        BodyPart::RightEar,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftElbow,
        BodyPart::RightElbow,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
        BodyPart::LeftHip,
        BodyPart::RightHip,
        BodyPart::LeftKnee,
        BodyPart::RightKnee,
        BodyPart::LeftAnkle,
        BodyPart::RightAnkle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "left_eye",
            BodyPart::RightEye => "right_eye",
            BodyPart::LeftEar => "left_ear",
            BodyPart::RightEar => "right_ear",
            BodyPart::LeftShoulder => "left_shoulder",
            BodyPart::RightShoulder => "right_shoulder",
            BodyPart::LeftElbow => "left_elbow",
            BodyPart::RightElbow => "right_elbow",
            BodyPart::LeftWrist => "left_wrist",
            BodyPart::RightWrist => "right_wrist",
            BodyPart::LeftHip => "left_hip",
            BodyPart::RightHip => "right_hip",
            BodyPart::LeftKnee => "left_knee",
            BodyPart::RightKnee => "right_knee",
            BodyPart::LeftAnkle => "left_ankle",
            BodyPart::RightAnkle => "right_ankle",
        }
    }
}

impl FromStr for BodyPart {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyPart::ALL
            .iter()
            .copied()
            .find(|part| same_name(s, part.name()))
            .ok_or_else(|| UnknownLandmark(s.to_string()))
    }
}

/// MediaPipe hand keypoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandPart {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyFingerMcp,
    PinkyFingerPip,
    PinkyFingerDip,
    PinkyFingerTip,
}

impl HandPart {
    pub const ALL: [HandPart; 21] = [
        HandPart::Wrist,
        HandPart::ThumbCmc,
        HandPart::ThumbMcp,
        HandPart::ThumbIp,
        HandPart::ThumbTip,
        HandPart::IndexFingerMcp,
        HandPart::IndexFingerPip,
        HandPart::IndexFingerDip,
        HandPart::IndexFingerTip,
        HandPart::MiddleFingerMcp,
        HandPart::MiddleFingerPip,
        HandPart::MiddleFingerDip,
        HandPart::MiddleFingerTip,
        HandPart::RingFingerMcp,
        HandPart::RingFingerPip,
        HandPart::RingFingerDip,
        HandPart::RingFingerTip,
        HandPart::PinkyFingerMcp,
        HandPart::PinkyFingerPip,
        HandPart::PinkyFingerDip,
        HandPart::PinkyFingerTip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HandPart::Wrist => "wrist",
            HandPart::ThumbCmc => "thumb_cmc",
            HandPart::ThumbMcp => "thumb_mcp",
            HandPart::ThumbIp => "thumb_ip",
            HandPart::ThumbTip => "thumb_tip",
            HandPart::IndexFingerMcp => "index_finger_mcp",
            HandPart::IndexFingerPip => "index_finger_pip",
            HandPart::IndexFingerDip => "index_finger_dip",
            HandPart::IndexFingerTip => "index_finger_tip",
            HandPart::MiddleFingerMcp => "middle_finger_mcp",
            HandPart::MiddleFingerPip => "middle_finger_pip",
            HandPart::MiddleFingerDip => "middle_finger_dip",
            HandPart::MiddleFingerTip => "middle_finger_tip",
            HandPart::RingFingerMcp => "ring_finger_mcp",
            HandPart::RingFingerPip => "ring_finger_pip",
            HandPart::RingFingerDip => "ring_finger_dip",
            HandPart::RingFingerTip => "ring_finger_tip",
            HandPart::PinkyFingerMcp => "pinky_finger_mcp",
            HandPart::PinkyFingerPip => "pinky_finger_pip",
            HandPart::PinkyFingerDip => "pinky_finger_dip",
            HandPart::PinkyFingerTip => "pinky_finger_tip",
        }
    }
}

impl FromStr for HandPart {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandPart::ALL
            .iter()
            .copied()
            .find(|part| same_name(s, part.name()))
            .ok_or_else(|| UnknownLandmark(s.to_string()))
    }
}

/// Which hand a detection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[serde(alias = "left")]
    Left,
    #[serde(alias = "right")]
    Right,
}

/// An independently scheduled detection stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Body,
    LeftHand,
    RightHand,
}

impl Stream {
    pub fn name(&self) -> &'static str {
        match self {
            Stream::Body => "body",
            Stream::LeftHand => "left_hand",
            Stream::RightHand => "right_hand",
        }
    }
}

/// A tracked point that can drive a mapping, written `stream.part`
/// (`body.right_wrist`, `left_hand.index_finger_tip`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Landmark {
    Body(BodyPart),
    Hand(Handedness, HandPart),
}

impl Landmark {
    pub fn stream(&self) -> Stream {
        match self {
            Landmark::Body(_) => Stream::Body,
            Landmark::Hand(Handedness::Left, _) => Stream::LeftHand,
            Landmark::Hand(Handedness::Right, _) => Stream::RightHand,
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Landmark::Body(part) => write!(f, "{}.{}", self.stream().name(), part.name()),
            Landmark::Hand(_, part) => write!(f, "{}.{}", self.stream().name(), part.name()),
        }
    }
}

impl FromStr for Landmark {
    type Err = UnknownLandmark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownLandmark(s.to_string());

        match s.split_once('.') {
            Some((stream, part)) if same_name(stream, "body") => {
                Ok(Landmark::Body(part.parse().map_err(|_| unknown())?))
            }
            Some((stream, part)) if same_name(stream, "left_hand") => Ok(Landmark::Hand(
                Handedness::Left,
                part.parse().map_err(|_| unknown())?,
            )),
            Some((stream, part)) if same_name(stream, "right_hand") => Ok(Landmark::Hand(
                Handedness::Right,
                part.parse().map_err(|_| unknown())?,
            )),
            // A bare name is a body part, as in the PoseNet keypoint list
            None => Ok(Landmark::Body(s.parse().map_err(|_| unknown())?)),
            Some(_) => Err(unknown()),
        }
    }
}

impl TryFrom<String> for Landmark {
    type Error = UnknownLandmark;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Landmark> for String {
    fn from(landmark: Landmark) -> Self {
        landmark.to_string()
    }
}
