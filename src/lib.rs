pub mod dsp; // Filters, delay lines, rate conversion, convolution
pub mod engine; // Block orchestration and the control/audio hand-off
pub mod error;
pub mod io; // MIDI and keyboard adapters
pub mod synth; // Reed voices, bellows, polyphony

/// Largest output block the engine accepts.
pub const MAX_BLOCK_SIZE: usize = 2048;

pub use engine::{BlockStatus, Engine, EngineBuilder, EngineConfig, EngineHandle, EngineReport};
pub use error::{Error, Result};
pub use synth::message::{NoteEvent, NoteId};
