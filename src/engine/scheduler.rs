//! Frame-timed scheduling of dispatch ticks
//!
//! One coordinator owns the mapping table and the dispatch loop. A timer
//! wakes it once per frame; table edits queued from elsewhere are applied
//! between ticks, so a tick never observes a half-applied edit.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{ControlMessage, DispatchLoop, StopHandle};
use crate::mapping::{Mapping, MappingId, MappingPatch, MappingTable};

/// A change to the mapping table, applied between ticks
#[derive(Debug, Clone)]
pub enum TableEdit {
    Add(Mapping),
    Remove(MappingId),
    Update(MappingId, MappingPatch),
    /// Drop every mapping belonging to a session
    EndSession(String),
}

/// Sending half of the edit queue
#[derive(Debug, Clone)]
pub struct EditSender {
    sender: mpsc::UnboundedSender<TableEdit>,
}

impl EditSender {
    /// Queue an edit. Returns false once the scheduler has finished.
    pub fn send(&self, edit: TableEdit) -> bool {
        self.sender.send(edit).is_ok()
    }
}

/// Drives a [`DispatchLoop`] from a frame timer
pub struct Scheduler {
    dispatch: DispatchLoop,
    table: MappingTable,
    frame_period: Duration,
    max_ticks: Option<u64>,
    edits: mpsc::UnboundedReceiver<TableEdit>,
}

impl Scheduler {
    /// Create a scheduler ticking every `frame_period`. The dispatch loop
    /// should already be started.
    pub fn new(dispatch: DispatchLoop, table: MappingTable, frame_period: Duration) -> (Self, EditSender) {
        let (sender, edits) = mpsc::unbounded_channel();
        let scheduler = Self {
            dispatch,
            table,
            frame_period,
            max_ticks: None,
            edits,
        };
        (scheduler, EditSender { sender })
    }

    /// Tick period for a frame rate
    pub fn period_for_fps(fps: u32) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
    }

    /// Stop on its own after `ticks` frames
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.dispatch.stop_handle()
    }

    /// Run until the dispatch loop stops or the tick limit is reached.
    /// Hands the table back so callers can inspect the final values.
    pub async fn run<F>(mut self, mut emit: F) -> MappingTable
    where
        F: FnMut(ControlMessage),
    {
        let mut timer = interval(self.frame_period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let stop = self.dispatch.stop_handle();
        let mut ticks: u64 = 0;

        info!(period = ?self.frame_period, mappings = self.table.len(), "scheduler running");

        loop {
            timer.tick().await;

            if self.max_ticks.is_some_and(|max| ticks >= max) {
                self.dispatch.stop();
                break;
            }
            if stop.is_requested() || !self.dispatch.is_running() {
                self.dispatch.stop();
                break;
            }

            self.apply_edits();
            self.dispatch.tick(&mut self.table, &mut emit);
            ticks += 1;
        }

        info!(ticks, "scheduler finished");
        self.table
    }

    fn apply_edits(&mut self) {
        while let Ok(edit) = self.edits.try_recv() {
            let result = match edit {
                TableEdit::Add(mapping) => self.table.add(mapping).map(|id| debug!(%id, "mapping added")),
                TableEdit::Remove(id) => self.table.remove(id).map(|_| debug!(%id, "mapping removed")),
                TableEdit::Update(id, patch) => {
                    self.table.update(id, patch).map(|_| debug!(%id, "mapping updated"))
                }
                TableEdit::EndSession(session) => {
                    let removed = self.table.remove_session(&session);
                    debug!(%session, removed, "session ended");
                    Ok(())
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "mapping edit rejected");
            }
        }
    }
}
