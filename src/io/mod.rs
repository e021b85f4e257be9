// Purpose - control-source adapters: raw input in, NoteEvents out

pub mod converter;
pub mod keymap;
pub mod midi;

pub use converter::{midi_note_to_freq, midi_to_event};
pub use keymap::KeyMap;
pub use midi::MidiEvent;
