//! Configuration schema definitions

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{DispatchSettings, FrameSize, StreamSettings};
use crate::mapping::{Mapping, MappingError, MappingTable, DEFAULT_GLIDE_STEP};
use crate::pose::{Axis, HandSelection, Landmark};

/// Main configuration for Soma
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SomaConfig {
    /// Detector scheduling and frame geometry
    #[serde(default)]
    pub detection: DetectionConfig,

    /// MIDI output settings
    #[serde(default)]
    pub midi: MidiConfig,

    /// Mapping definitions, in dispatch order
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

impl SomaConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let detection = &self.detection;

        if detection.fps == 0 || detection.fps > 240 {
            bail!("fps must be between 1 and 240");
        }
        if detection.frame.width == 0 || detection.frame.height == 0 {
            bail!("Frame width and height must be greater than 0");
        }

        let body = self.body_settings();
        let hands = self.hand_settings();
        for (name, stream) in [("body", body), ("hands", hands)] {
            if stream.skip_size == 0 {
                bail!("{} skip_size must be at least 1", name);
            }
            if !(0.0..=1.0).contains(&stream.min_confidence) {
                bail!("{} min_confidence must be between 0.0 and 1.0", name);
            }
        }

        let mut ids = HashSet::new();
        for (index, mapping) in self.mappings.iter().enumerate() {
            mapping
                .build()
                .with_context(|| format!("Mapping {} ({}) is invalid", index + 1, mapping.landmark))?;

            if let Some(id) = mapping.id {
                if !ids.insert(id) {
                    bail!("Mapping {} ({}) reuses id {}", index + 1, mapping.landmark, id);
                }
            }
        }

        Ok(())
    }

    fn body_settings(&self) -> StreamSettings {
        let profile = self.detection.machine.profile();
        StreamSettings {
            skip_size: self.detection.body.skip_size.unwrap_or(profile.body_skip),
            min_confidence: self
                .detection
                .body
                .min_confidence
                .unwrap_or(profile.body_confidence),
        }
    }

    fn hand_settings(&self) -> StreamSettings {
        let profile = self.detection.machine.profile();
        StreamSettings {
            skip_size: self.detection.hands.skip_size.unwrap_or(profile.hand_skip),
            min_confidence: self
                .detection
                .hands
                .min_confidence
                .unwrap_or(DEFAULT_HAND_CONFIDENCE),
        }
    }

    /// Resolved dispatch settings: machine profile plus overrides
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            frame: FrameSize {
                width: f64::from(self.detection.frame.width),
                height: f64::from(self.detection.frame.height),
            },
            body: self.body_settings(),
            hands: self.hand_settings(),
            hand_selection: self.detection.hands.selection,
        }
    }

    /// Build the mapping table. No configured mappings means the default
    /// right-wrist mapping.
    pub fn mapping_table(&self) -> Result<MappingTable> {
        if self.mappings.is_empty() {
            return Ok(MappingTable::with_defaults());
        }

        let mut table = MappingTable::new();
        for mapping in &self.mappings {
            table.add(mapping.build()?)?;
        }
        Ok(table)
    }
}

/// Minimum hand keypoint score when none is configured
pub const DEFAULT_HAND_CONFIDENCE: f64 = 0.5;

/// Detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Performance preset (default: decent)
    #[serde(default)]
    pub machine: MachineType,

    /// Display frames per second driving the tick timer (default: 60)
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Video frame size in pixels (default: 640x480)
    #[serde(default)]
    pub frame: FrameConfig,

    /// Body stream overrides
    #[serde(default)]
    pub body: StreamConfig,

    /// Hand stream overrides
    #[serde(default)]
    pub hands: HandConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            machine: MachineType::default(),
            fps: default_fps(),
            frame: FrameConfig::default(),
            body: StreamConfig::default(),
            hands: HandConfig::default(),
        }
    }
}

fn default_fps() -> u32 { 60 }

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { width: 640, height: 480 }
    }
}

/// Per-stream overrides of the machine profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    pub skip_size: Option<u32>,
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandConfig {
    pub skip_size: Option<u32>,
    pub min_confidence: Option<f64>,

    /// Which hand to keep per side when more are detected (default: first)
    #[serde(default)]
    pub selection: HandSelection,
}

/// Performance presets, from lightest to heaviest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    Slow,
    #[default]
    Decent,
    Fast,
    Beast,
}

/// Pose model architecture requested from the external detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyModel {
    MobileNetV1,
    ResNet50,
}

/// Hand model variant requested from the external detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandModel {
    Lite,
    Full,
}

/// Detector settings implied by a [`MachineType`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineProfile {
    pub body_model: BodyModel,
    pub body_skip: u32,
    pub body_confidence: f64,
    pub hand_model: HandModel,
    pub hand_skip: u32,
}

impl MachineType {
    pub fn profile(&self) -> MachineProfile {
        match self {
            MachineType::Slow => MachineProfile {
                body_model: BodyModel::MobileNetV1,
                body_skip: 5,
                body_confidence: 0.5,
                hand_model: HandModel::Lite,
                hand_skip: 5,
            },
            MachineType::Decent => MachineProfile {
                body_model: BodyModel::MobileNetV1,
                body_skip: 2,
                body_confidence: 0.7,
                hand_model: HandModel::Lite,
                hand_skip: 2,
            },
            MachineType::Fast => MachineProfile {
                body_model: BodyModel::ResNet50,
                body_skip: 5,
                body_confidence: 0.9,
                hand_model: HandModel::Full,
                hand_skip: 5,
            },
            MachineType::Beast => MachineProfile {
                body_model: BodyModel::ResNet50,
                body_skip: 2,
                body_confidence: 0.9,
                hand_model: HandModel::Full,
                hand_skip: 2,
            },
        }
    }
}

/// MIDI output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Output port name or a substring of it (None = first port)
    pub port: Option<String>,
}

/// One mapping definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Stable id (generated when omitted)
    pub id: Option<Uuid>,

    /// Owning session, if any
    pub session_id: Option<String>,

    /// Landmark feeding the mapping, e.g. `body.right_wrist`
    pub landmark: Landmark,

    /// Screen axis to read
    pub axis: Axis,

    /// Input window on the 0-1 axis (default: full screen)
    #[serde(default)]
    pub input_window: WindowConfig,

    /// Output range (default: 0-127)
    #[serde(default)]
    pub output_range: RangeConfig,

    /// Maximum change per tick (default: 127, no limiting)
    #[serde(default = "default_glide_step")]
    pub glide_step: f64,

    /// MIDI channel 1-16 (default: 1)
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Controller number
    pub controller: u8,
}

fn default_glide_step() -> f64 { DEFAULT_GLIDE_STEP }
fn default_channel() -> u8 { 1 }

impl MappingConfig {
    /// Validate and build the runtime mapping
    pub fn build(&self) -> std::result::Result<Mapping, MappingError> {
        let mut builder = Mapping::builder(self.landmark, self.axis)
            .with_window(self.input_window.start, self.input_window.end)
            .with_range(self.output_range.min, self.output_range.max)
            .with_glide_step(self.glide_step)
            .with_address(self.channel, self.controller);

        if let Some(id) = self.id {
            builder = builder.with_id(id.into());
        }
        if let Some(session_id) = &self.session_id {
            builder = builder.with_session(session_id.clone());
        }

        builder.build()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: f64,
    pub end: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { start: 0.0, end: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self { min: 0.0, max: 127.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{BodyPart, HandPart, Handedness};

    #[test]
    fn test_empty_config_defaults() {
        let config: SomaConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.detection.machine, MachineType::Decent);
        assert_eq!(config.detection.fps, 60);

        let settings = config.dispatch_settings();
        assert_eq!(settings.body.skip_size, 2);
        assert_eq!(settings.body.min_confidence, 0.7);
        assert_eq!(settings.hands.min_confidence, DEFAULT_HAND_CONFIDENCE);
        assert_eq!(settings.frame.width, 640.0);

        let table = config.mapping_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.all()[0].controller(), 40);
    }

    #[test]
    fn test_machine_profiles() {
        assert_eq!(MachineType::Slow.profile().body_skip, 5);
        assert_eq!(MachineType::Slow.profile().body_confidence, 0.5);
        assert_eq!(MachineType::Fast.profile().body_model, BodyModel::ResNet50);
        assert_eq!(MachineType::Beast.profile().hand_model, HandModel::Full);
        assert_eq!(MachineType::Beast.profile().hand_skip, 2);
    }

    #[test]
    fn test_overrides_win_over_profile() {
        let yaml = r#"
detection:
  machine: slow
  body:
    skip_size: 1
  hands:
    min_confidence: 0.8
    selection: highest_score
"#;
        let config: SomaConfig = serde_yaml::from_str(yaml).unwrap();
        let settings = config.dispatch_settings();

        assert_eq!(settings.body.skip_size, 1);
        assert_eq!(settings.body.min_confidence, 0.5);
        assert_eq!(settings.hands.skip_size, 5);
        assert_eq!(settings.hands.min_confidence, 0.8);
        assert_eq!(settings.hand_selection, HandSelection::HighestScore);
    }

    #[test]
    fn test_mapping_config() {
        let yaml = r#"
landmark: left_hand.index_finger_tip
axis: x
input_window: { start: 0.2, end: 0.8 }
output_range: { min: 10, max: 100 }
glide_step: 4
channel: 2
controller: 74
session_id: jam
"#;
        let config: MappingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.landmark, Landmark::Hand(Handedness::Left, HandPart::IndexFingerTip));

        let mapping = config.build().unwrap();
        assert_eq!(mapping.axis(), Axis::X);
        assert_eq!(mapping.input_window().start(), 0.2);
        assert_eq!(mapping.output_range().max(), 100.0);
        assert_eq!(mapping.glide_step(), 4.0);
        assert_eq!(mapping.channel(), 2);
        assert_eq!(mapping.session_id(), Some("jam"));
    }

    #[test]
    fn test_mapping_config_defaults() {
        let yaml = "landmark: body.nose\naxis: y\ncontroller: 1\n";
        let config: MappingConfig = serde_yaml::from_str(yaml).unwrap();
        let mapping = config.build().unwrap();

        assert_eq!(mapping.landmark(), Landmark::Body(BodyPart::Nose));
        assert_eq!(mapping.channel(), 1);
        assert_eq!(mapping.glide_step(), DEFAULT_GLIDE_STEP);
        assert_eq!(mapping.output_range().max(), 127.0);
    }

    #[test]
    fn test_degenerate_window_rejected_at_load() {
        let yaml = r#"
mappings:
  - landmark: body.right_wrist
    axis: y
    input_window: { start: 0.5, end: 0.5 }
    controller: 40
"#;
        let config: SomaConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        let cause = err.downcast_ref::<MappingError>().unwrap();
        assert_eq!(cause, &MappingError::DegenerateWindow(0.5));
    }

    #[test]
    fn test_unknown_landmark_rejected() {
        let yaml = "landmark: body.tail\naxis: y\ncontroller: 1\n";
        assert!(serde_yaml::from_str::<MappingConfig>(yaml).is_err());
    }

    #[test]
    fn test_invalid_detection_settings() {
        let mut config = SomaConfig::default();
        config.detection.fps = 0;
        assert!(config.validate().is_err());

        let mut config = SomaConfig::default();
        config.detection.body.skip_size = Some(0);
        assert!(config.validate().is_err());

        let mut config = SomaConfig::default();
        config.detection.hands.min_confidence = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let id = Uuid::new_v4();
        let yaml = format!(
            r#"
mappings:
  - {{ id: {id}, landmark: body.nose, axis: x, controller: 1 }}
  - {{ id: {id}, landmark: body.nose, axis: y, controller: 2 }}
"#
        );
        let config: SomaConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.mapping_table().is_err());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reuses id"));
    }

    #[test]
    fn test_distinct_ids_validate() {
        let yaml = format!(
            r#"
mappings:
  - {{ id: {}, landmark: body.nose, axis: x, controller: 1 }}
  - {{ id: {}, landmark: body.nose, axis: y, controller: 2 }}
  - {{ landmark: body.nose, axis: y, controller: 3 }}
"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let config: SomaConfig = serde_yaml::from_str(&yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.mapping_table().unwrap().len(), 3);
    }
}
