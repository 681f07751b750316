//! Soma - body and hand movement to MIDI control changes
//!
//! Pose and hand keypoints are normalized to screen space, scaled through
//! a table of mappings and sent out as control-change messages.

pub mod config;
pub mod engine;
pub mod mapping;
pub mod pose;
pub mod sources;
pub mod viz;

pub use config::SomaConfig;
pub use engine::{DispatchLoop, Scheduler};
pub use mapping::MappingTable;
