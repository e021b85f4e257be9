use crate::{
    io::midi::MidiEvent,
    synth::message::{NoteEvent, NoteId},
};

/// Map a MIDI message on `channel_filter` to a note event. A note-on with
/// velocity 0 is a note-off, as most keyboards send it.
pub fn midi_to_event(midi: MidiEvent, channel_filter: u8) -> Option<NoteEvent> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } if channel == channel_filter => Some(if velocity == 0 {
            NoteEvent::note_off(key)
        } else {
            NoteEvent::note_on(key, midi_note_to_freq(key))
        }),
        MidiEvent::NoteOff { channel, key, .. } if channel == channel_filter => {
            Some(NoteEvent::NoteOff { id: NoteId::from(key) })
        }
        // CC 123: all notes off
        MidiEvent::ControlChange {
            channel,
            controller: 123,
            ..
        } if channel == channel_filter => Some(NoteEvent::AllNotesOff),
        _ => None,
    }
}

/// Equal temperament, A4 (note 69) = 440 Hz.
pub fn midi_note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_frequencies() {
        approx::assert_abs_diff_eq!(midi_note_to_freq(69), 440.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(midi_note_to_freq(60), 261.6256, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(midi_note_to_freq(81), 880.0, epsilon = 1e-9);
    }

    #[test]
    fn test_channel_filter() {
        let on = MidiEvent::NoteOn {
            channel: 2,
            key: 60,
            velocity: 90,
        };
        assert_eq!(midi_to_event(on, 0), None);
        assert_eq!(
            midi_to_event(on, 2),
            Some(NoteEvent::note_on(60u8, midi_note_to_freq(60)))
        );
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let on = MidiEvent::NoteOn {
            channel: 0,
            key: 62,
            velocity: 0,
        };
        assert_eq!(midi_to_event(on, 0), Some(NoteEvent::note_off(62u8)));
    }

    #[test]
    fn test_all_notes_off_controller() {
        let cc = MidiEvent::ControlChange {
            channel: 0,
            controller: 123,
            value: 0,
        };
        assert_eq!(midi_to_event(cc, 0), Some(NoteEvent::AllNotesOff));
        let other = MidiEvent::ControlChange {
            channel: 0,
            controller: 1,
            value: 64,
        };
        assert_eq!(midi_to_event(other, 0), None);
    }
}
