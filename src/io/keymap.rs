use crate::synth::message::{NoteEvent, NoteId};

/// Computer keyboard row mapped onto one octave of sargam, Sa to upper Sa.
///
/// | key | swara | Hz     |
/// | --- | ----- | ------ |
/// | z   | Sa    | 261.63 |
/// | x   | Re    | 293.66 |
/// | c   | Ga    | 329.63 |
/// | v   | Ma    | 349.23 |
/// | b   | Pa    | 392.00 |
/// | n   | Dha   | 440.00 |
/// | m   | Ni    | 493.88 |
/// | ,   | Sa'   | 523.25 |
pub struct KeyMap {
    keys: Vec<(char, f64)>,
    held: Vec<bool>,
}

const SARGAM: [(char, f64); 8] = [
    ('z', 261.63),
    ('x', 293.66),
    ('c', 329.63),
    ('v', 349.23),
    ('b', 392.00),
    ('n', 440.00),
    ('m', 493.88),
    (',', 523.25),
];

impl KeyMap {
    pub fn new() -> Self {
        Self::with_keys(&SARGAM)
    }

    pub fn with_keys(keys: &[(char, f64)]) -> Self {
        Self {
            keys: keys.to_vec(),
            held: vec![false; keys.len()],
        }
    }

    /// Frequency and note id for `key`. The id is the key's row position.
    pub fn lookup(&self, key: char) -> Option<(NoteId, f64)> {
        self.position(key)
            .map(|idx| (NoteId(idx as u32), self.keys[idx].1))
    }

    /// Terminals rarely report key releases, so each press toggles the note.
    pub fn toggle(&mut self, key: char) -> Option<NoteEvent> {
        let idx = self.position(key)?;
        let id = NoteId(idx as u32);
        self.held[idx] = !self.held[idx];
        Some(if self.held[idx] {
            NoteEvent::NoteOn {
                id,
                frequency: self.keys[idx].1,
            }
        } else {
            NoteEvent::NoteOff { id }
        })
    }

    /// Forget every held key, e.g. after sending `AllNotesOff`.
    pub fn release_all(&mut self) {
        self.held.fill(false);
    }

    pub fn is_held(&self, key: char) -> bool {
        self.position(key).is_some_and(|idx| self.held[idx])
    }

    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.keys.iter().map(|(k, _)| *k)
    }

    fn position(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.keys.iter().position(|(k, _)| *k == key)
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}
