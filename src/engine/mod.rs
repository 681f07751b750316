//! Dispatch engine for Soma
//!
//! Schedules detection ticks, runs the mapping table against each frame and
//! delivers the resulting control messages.

mod dispatch;
mod midi;
mod scheduler;

pub use dispatch::{
    ControlMessage, DispatchLoop, DispatchSettings, FrameSize, LoopState, StopHandle, StreamSettings,
};
pub use midi::{list_midi_ports, ControlChange, MidiSink};
pub use scheduler::{EditSender, Scheduler, TableEdit};
