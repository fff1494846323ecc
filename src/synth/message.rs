#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::note::Note;

/// Control events for a [`PolySynth`](crate::synth::PolySynth), produced off
/// the audio thread and drained by `process_messages`.
#[derive(Debug, Copy, Clone)]
pub enum SynthMessage {
    NoteOn { note: Note },
    NoteOff { note: Note },
    AllNotesOff,
    /// Rebuild the pool; sounding notes are cut
    SetVoiceCount { count: usize },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
