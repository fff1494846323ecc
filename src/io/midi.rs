#[derive(Debug, Clone, Copy)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    AllNotesOff { channel: u8 },
}

impl MidiEvent {
    /// Decode a raw 3-byte channel message. Unsupported statuses return `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let data1 = *data.first()? & 0x7F;
        let data2 = data.get(1).map_or(0, |b| b & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            }),
            // CC 123 is "all notes off"
            0xB0 if data1 == 123 => Some(MidiEvent::AllNotesOff { channel }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: data1,
                value: data2,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_note_on() {
        let event = MidiEvent::from_bytes(&[0x91, 60, 100]).unwrap();
        assert!(matches!(
            event,
            MidiEvent::NoteOn {
                channel: 1,
                key: 60,
                velocity: 100
            }
        ));
    }

    #[test]
    fn decodes_all_notes_off() {
        let event = MidiEvent::from_bytes(&[0xB0, 123, 0]).unwrap();
        assert!(matches!(event, MidiEvent::AllNotesOff { channel: 0 }));
    }

    #[test]
    fn ignores_unsupported_status() {
        assert!(MidiEvent::from_bytes(&[0xE0, 0, 64]).is_none());
        assert!(MidiEvent::from_bytes(&[]).is_none());
    }
}
