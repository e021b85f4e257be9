//! Shared state types for UI communication
//!
//! Static data is built once before the stream starts, dynamic updates are
//! `Copy` so the audio thread can push them without allocating.

/// Static state known before the stream starts
#[derive(Clone, Copy, Debug)]
pub struct UiStateInit {
    pub sample_rate: f64,
    pub block_size: usize,
    pub polyphony: usize,
    /// Pump rate the engine started with
    pub pump_rate: f64,
}

/// Dynamic state pushed once per engine block
#[derive(Clone, Copy, Debug, Default)]
pub struct UiStateUpdate {
    pub active_voices: usize,
    /// Drone stops sounding
    pub drone: bool,
    pub pressure: f32,
    pub pump_rate: f32,
    /// Fraction of the block deadline used
    pub load: f32,
    pub underruns: u64,
    pub faults: u64,
}
