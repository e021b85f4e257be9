use rtrb::{Consumer, Producer, PushError};

use crate::{
    error::{Error, Result},
    synth::message::{NoteEvent, NoteId},
};

/// Something the audio thread noticed. Logged later by the control side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineReport {
    /// The voice's state went non-finite or ran away and it was removed.
    VoiceRetired { id: NoteId },
    /// A note-on with an unplayable frequency, or no voice slots at all.
    NoteRejected { id: NoteId, frequency: f64 },
    /// `evicted` was the oldest voice and made room for `by`.
    VoiceStolen { evicted: NoteId, by: NoteId },
    /// A block took longer than its period.
    Underrun { elapsed_us: u64, budget_us: u64 },
}

/// Control-side end of an engine: enqueues note events, collects reports.
///
/// Never blocks. Owned by one thread at a time; move it to whichever thread
/// listens to the keyboard or MIDI port.
pub struct EngineHandle {
    events: Producer<NoteEvent>,
    reports: Consumer<EngineReport>,
}

impl EngineHandle {
    pub(crate) fn new(events: Producer<NoteEvent>, reports: Consumer<EngineReport>) -> Self {
        Self { events, reports }
    }

    /// Enqueue an event for the next block boundary.
    pub fn send(&mut self, event: NoteEvent) -> Result<()> {
        if self.events.is_abandoned() {
            return Err(Error::EngineStopped);
        }
        self.events.push(event).map_err(|PushError::Full(event)| Error::QueueFull(event))
    }

    pub fn note_on(&mut self, id: impl Into<NoteId>, frequency: f64) -> Result<()> {
        self.send(NoteEvent::note_on(id, frequency))
    }

    pub fn note_off(&mut self, id: impl Into<NoteId>) -> Result<()> {
        self.send(NoteEvent::note_off(id))
    }

    pub fn all_notes_off(&mut self) -> Result<()> {
        self.send(NoteEvent::AllNotesOff)
    }

    pub fn set_pump_rate(&mut self, rate: f64) -> Result<()> {
        self.send(NoteEvent::PumpRate { rate })
    }

    pub fn set_drone(&mut self, on: bool) -> Result<()> {
        self.send(NoteEvent::Drone { on })
    }

    /// Free space left in the event ring.
    pub fn capacity_left(&self) -> usize {
        self.events.slots()
    }

    pub fn is_stopped(&self) -> bool {
        self.events.is_abandoned()
    }

    /// Pop the next pending report, if any.
    pub fn next_report(&mut self) -> Option<EngineReport> {
        self.reports.pop().ok()
    }

    /// Emit every pending report through `tracing`. Returns how many there were.
    pub fn log_reports(&mut self) -> usize {
        let mut count = 0;
        while let Some(report) = self.next_report() {
            count += 1;
            match report {
                EngineReport::VoiceRetired { id } => {
                    tracing::warn!(note = id.0, "voice diverged and was retired");
                }
                EngineReport::NoteRejected { id, frequency } => {
                    tracing::warn!(note = id.0, frequency, "note-on rejected");
                }
                EngineReport::VoiceStolen { evicted, by } => {
                    tracing::debug!(evicted = evicted.0, by = by.0, "voice stolen");
                }
                EngineReport::Underrun {
                    elapsed_us,
                    budget_us,
                } => {
                    tracing::warn!(elapsed_us, budget_us, "audio block missed its deadline");
                }
            }
        }
        count
    }
}
