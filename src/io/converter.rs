use crate::{io::midi::MidiEvent, note::Note, synth::message::SynthMessage};

/// Map a MIDI event on `channel_filter` to a synth message.
///
/// Note On with velocity 0 is treated as Note Off, as most keyboards send it.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: u8) -> Option<SynthMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } if channel == channel_filter => {
            let note = Note::from_midi(key as i32)?;
            if velocity == 0 {
                Some(SynthMessage::NoteOff { note })
            } else {
                Some(SynthMessage::NoteOn { note })
            }
        }
        MidiEvent::NoteOff { channel, key, .. } if channel == channel_filter => {
            Note::from_midi(key as i32).map(|note| SynthMessage::NoteOff { note })
        }
        MidiEvent::AllNotesOff { channel } if channel == channel_filter => {
            Some(SynthMessage::AllNotesOff)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_maps_to_note() {
        let msg = midi_to_synth(
            MidiEvent::NoteOn {
                channel: 0,
                key: 69,
                velocity: 90,
            },
            0,
        );
        let expected = Note::from_midi(69).unwrap();
        assert!(matches!(msg, Some(SynthMessage::NoteOn { note }) if note == expected));
    }

    #[test]
    fn zero_velocity_is_note_off() {
        let msg = midi_to_synth(
            MidiEvent::NoteOn {
                channel: 2,
                key: 60,
                velocity: 0,
            },
            2,
        );
        assert!(matches!(msg, Some(SynthMessage::NoteOff { .. })));
    }

    #[test]
    fn other_channels_are_filtered() {
        let msg = midi_to_synth(
            MidiEvent::NoteOff {
                channel: 3,
                key: 60,
                velocity: 0,
            },
            0,
        );
        assert!(msg.is_none());
    }
}
