#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode one channel voice message. Running status and system messages
    /// are not handled.
    pub fn from_bytes(bytes: &[u8]) -> Option<MidiEvent> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let data7 = |i: usize| data.get(i).copied().filter(|b| *b < 0x80);

        match status & 0xF0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: data7(0)?,
                velocity: data7(1)?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: data7(0)?,
                velocity: data7(1)?,
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: data7(0)?,
                value: data7(1)?,
            }),
            0xC0 => Some(MidiEvent::ProgramChange {
                channel,
                program: data7(0)?,
            }),
            0xE0 => {
                let lsb = data7(0)? as i16;
                let msb = data7(1)? as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: ((msb << 7) | lsb) - 8192,
                })
            }
            _ => None,
        }
    }
}
