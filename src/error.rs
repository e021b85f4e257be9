//! Error types for harmonium_dsp.
//!
//! Only construction and control-side calls return these. The audio-rate path
//! recovers locally (voice retirement) and reports through
//! [`EngineReport`](crate::engine::EngineReport) instead.

use thiserror::Error;

use crate::synth::message::NoteEvent;

/// Result type alias for harmonium_dsp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving an engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range. Fatal at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The convolver was given an impulse response with no samples.
    #[error("Impulse response is empty")]
    EmptyImpulseResponse,

    /// A pre-built convolver does not match the engine's internal block.
    #[error("Convolver partition of {partition} samples does not match internal block of {block}")]
    PartitionMismatch { partition: usize, block: usize },

    /// The event ring is full. The rejected event is handed back.
    #[error("Event queue full, dropped {0:?}")]
    QueueFull(NoteEvent),

    /// The audio side of the engine has been dropped.
    #[error("Engine has stopped")]
    EngineStopped,
}
