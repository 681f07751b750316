//! MIDI output for Soma.
//!
//! Sends control messages as MIDI control change events on an output port.

use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{anyhow, Result};
use midir::MidiOutput;
use tracing::{info, warn};

use super::ControlMessage;

/// A 7-bit MIDI control change on channels 1-16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    /// MIDI channel, 1-16
    pub channel: u8,
    /// Controller number, 0-127
    pub controller: u8,
    /// Controller value, 0-127
    pub value: u8,
}

impl ControlChange {
    /// Quantize a control message. The value is rounded and clamped to
    /// 0-127; channels outside 1-16 are clamped onto that range.
    pub fn from_message(message: &ControlMessage) -> Self {
        let value = if message.value.is_nan() {
            0
        } else {
            message.value.round().clamp(0.0, 127.0) as u8
        };

        Self {
            channel: message.channel.clamp(1, 16),
            controller: message.controller & 0x7F,
            value,
        }
    }

    /// Convert to raw MIDI bytes.
    pub fn to_bytes(&self) -> [u8; 3] {
        let status = 0xB0 | ((self.channel.clamp(1, 16) - 1) & 0x0F);
        [status, self.controller & 0x7F, self.value & 0x7F]
    }
}

enum MidiCommand {
    Send(ControlChange),
    Stop,
}

/// MIDI output connection fed from a background thread.
pub struct MidiSink {
    sender: Sender<MidiCommand>,
    port_name: String,
}

impl MidiSink {
    /// Connect to the first output port whose name contains `port_name`,
    /// or to the first port when no name is given.
    pub fn connect(port_name: Option<&str>) -> Result<Self> {
        let midi_out = MidiOutput::new("Soma MIDI Output")?;
        let ports = midi_out.ports();

        if ports.is_empty() {
            return Err(anyhow!("No MIDI output ports available"));
        }

        let port = if let Some(name) = port_name {
            ports
                .iter()
                .find(|p| {
                    midi_out
                        .port_name(p)
                        .map(|n| n.contains(name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| anyhow!("MIDI port '{}' not found", name))?
                .clone()
        } else {
            ports[0].clone()
        };

        let port_name_actual = midi_out.port_name(&port)?;
        let conn = midi_out
            .connect(&port, "soma-output")
            .map_err(|e| anyhow!("failed to connect to MIDI port: {}", e))?;

        let (sender, receiver) = mpsc::channel::<MidiCommand>();

        thread::spawn(move || {
            let mut conn = conn;
            while let Ok(cmd) = receiver.recv() {
                match cmd {
                    MidiCommand::Send(cc) => {
                        if let Err(e) = conn.send(&cc.to_bytes()) {
                            warn!(error = %e, "MIDI send failed");
                        }
                    }
                    MidiCommand::Stop => break,
                }
            }
        });

        info!(port = %port_name_actual, "MIDI output connected");

        Ok(Self {
            sender,
            port_name: port_name_actual,
        })
    }

    /// Queue a control message for sending.
    pub fn send(&self, message: &ControlMessage) -> Result<()> {
        self.sender
            .send(MidiCommand::Send(ControlChange::from_message(message)))?;
        Ok(())
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Stop the output thread.
    pub fn stop(&self) {
        let _ = self.sender.send(MidiCommand::Stop);
    }
}

impl Drop for MidiSink {
    fn drop(&mut self) {
        self.stop();
    }
}

/// List available MIDI output ports.
pub fn list_midi_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("Soma MIDI List")?;
    let ports = midi_out.ports();

    let names: Vec<String> = ports
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();

    Ok(names)
}
