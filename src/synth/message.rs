#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a sounding note (MIDI key, keyboard slot, ...).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub u32);

impl From<u8> for NoteId {
    fn from(key: u8) -> Self {
        NoteId(key as u32)
    }
}

impl From<u32> for NoteId {
    fn from(id: u32) -> Self {
        NoteId(id)
    }
}

/// The only message that crosses from the control thread to the audio thread.
///
/// Events are applied at the next block boundary, all at once.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NoteEvent {
    NoteOn { id: NoteId, frequency: f64 },
    NoteOff { id: NoteId },
    AllNotesOff,
    /// New bellows pump rate (airflow units per second).
    PumpRate { rate: f64 },
    /// Sound or silence the drone stops. Unaffected by `AllNotesOff`.
    Drone { on: bool },
}

impl NoteEvent {
    pub fn note_on(id: impl Into<NoteId>, frequency: f64) -> Self {
        NoteEvent::NoteOn {
            id: id.into(),
            frequency,
        }
    }

    pub fn note_off(id: impl Into<NoteId>) -> Self {
        NoteEvent::NoteOff { id: id.into() }
    }
}
