//! The scripted performance played by the demo

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use saavy_poly::{synth::SynthMessage, Note};

/// One control message at an absolute time in seconds
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub at: f64,
    pub message: SynthMessage,
}

fn note(name: &str) -> EyreResult<Note> {
    name.parse()
        .wrap_err_with(|| format!("bad note name in script: {name}"))
}

fn on(at: f64, name: &str) -> EyreResult<Event> {
    Ok(Event {
        at,
        message: SynthMessage::NoteOn { note: note(name)? },
    })
}

fn off(at: f64, name: &str) -> EyreResult<Event> {
    Ok(Event {
        at,
        message: SynthMessage::NoteOff { note: note(name)? },
    })
}

/// A C major chord, a melody on top that runs out of voices and steals,
/// a repeated note (same voice), releases that outlive their notes and a
/// release of a note that was stolen long ago.
pub fn chord_and_steal() -> EyreResult<Vec<Event>> {
    Ok(vec![
        on(0.0, "C4")?,
        on(0.0, "E4")?,
        on(0.0, "G4")?,
        on(0.25, "B4")?,
        on(0.5, "D5")?, // pool is full: steals C4
        on(0.75, "D5")?, // same note, same voice
        off(1.0, "E4")?,
        on(1.25, "F5")?, // steals E4 (oldest attack, still releasing)
        off(1.5, "C4")?, // stolen at 0.5, nothing to release
        off(2.0, "B4")?,
        off(2.0, "D5")?,
        off(2.0, "F5")?,
        Event {
            at: 3.5,
            message: SynthMessage::SetVoiceCount { count: 2 },
        },
        on(3.75, "A3")?,
        Event {
            at: 4.0,
            message: SynthMessage::AllNotesOff,
        },
    ])
}
