use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::settings::note::{
    A4_FREQUENCY, A4_MIDI_NUMBER, MAX_CENTS, MAX_MIDI_NOTE, MAX_OCTAVE, MIN_MIDI_NOTE, MIN_OCTAVE,
};

/*
12-TET Notes
============

A note is identified by an octave, a semitone inside that octave and an
optional fine offset in cents:

  octave    Scientific pitch octave, -1..=9. Middle C is octave 4.
  semitone  0..=11, where C=0, C#=1, D=2, ... A=9, A#=10, B=11.
  cents     Fine detune, 100 cents = 1 semitone. Kept inside [-100, 100].

The MIDI formula: number = 12 * (octave + 1) + semitone
So C4 = 60 and A4 = 69, the 440 Hz tuning reference.

Frequency is computed from the distance to A4 in (fractional) semitones:

  semitones_from_a4 = midi_number - 69 + cents / 100
  frequency         = 440 * 2^(semitones_from_a4 / 12)

Notes compare structurally: two notes are equal when all three fields match.
The pool relies on this to find the voice already holding a note.
*/

const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawNote")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    octave: i32,
    semitone: u8,
    cents: f32,
}

/// Unchecked wire form; deserialized notes go through [`Note::new`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawNote {
    octave: i32,
    semitone: u8,
    cents: f32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawNote> for Note {
    type Error = &'static str;

    fn try_from(raw: RawNote) -> Result<Self, Self::Error> {
        Note::new(raw.octave, raw.semitone, raw.cents)
            .ok_or("note out of range (octave -1..=9, semitone 0..=11, cents within 100)")
    }
}

/// Relative transposition applied on top of a note (oscillator coarse/fine tune).
///
/// Unlike [`Note`], the semitone part may be negative or exceed an octave.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoteOffset {
    pub octaves: i32,
    pub semitones: i32,
    pub cents: f32,
}

impl Note {
    /// Returns `None` when the octave is outside `-1..=9`, `semitone > 11` or
    /// `cents` is not a finite value in `[-100, 100]`.
    pub fn new(octave: i32, semitone: u8, cents: f32) -> Option<Self> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave)
            || semitone > 11
            || !cents.is_finite()
            || cents.abs() > MAX_CENTS
        {
            return None;
        }
        Some(Self {
            octave,
            semitone,
            cents,
        })
    }

    /// Note without fine detune
    pub fn natural(octave: i32, semitone: u8) -> Option<Self> {
        Self::new(octave, semitone, 0.0)
    }

    /// Builds a note from a MIDI note number (`0..=127`).
    pub fn from_midi(number: i32) -> Option<Self> {
        if !(MIN_MIDI_NOTE..=MAX_MIDI_NOTE).contains(&number) {
            log::warn!("from_midi({number}): outside MIDI range");
            return None;
        }
        Self::natural(number.div_euclid(12) - 1, number.rem_euclid(12) as u8)
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn semitone(&self) -> u8 {
        self.semitone
    }

    pub fn cents(&self) -> f32 {
        self.cents
    }

    /// Same pitch class and octave with a different fine offset.
    pub fn with_cents(self, cents: f32) -> Option<Self> {
        Self::new(self.octave, self.semitone, cents)
    }

    /// MIDI note number. Cents are ignored. Octave 9 reaches up to 131, past
    /// the MIDI range.
    pub fn midi_number(&self) -> i32 {
        12 * (self.octave + 1) + self.semitone as i32
    }

    pub fn frequency(&self) -> f64 {
        self.frequency_with_offset(&NoteOffset::default())
    }

    pub fn frequency_with_offset(&self, offset: &NoteOffset) -> f64 {
        let semitones_from_a4 = (self.midi_number() - A4_MIDI_NUMBER) as f64
            + offset.octaves as f64 * 12.0
            + offset.semitones as f64
            + (self.cents + offset.cents) as f64 / 100.0;

        A4_FREQUENCY * 2.0_f64.powf(semitones_from_a4 / 12.0)
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.semitone as usize]
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)?;
        if self.cents != 0.0 {
            write!(f, "{:+}c", self.cents)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteError(String);

impl std::fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid note name '{}'", self.0)
    }
}

impl std::error::Error for ParseNoteError {}

/// Parses names like `C4`, `F#3`, `Bb-1`.
impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseNoteError(s.to_string());
        let mut chars = s.chars();

        let letter = chars.next().ok_or_else(err)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };

        let rest = chars.as_str();
        let (accidental, octave_text) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };

        let octave: i32 = octave_text.parse().map_err(|_| err())?;

        // B#3 is C4, Cb4 is B3
        let absolute = octave
            .checked_mul(12)
            .and_then(|semis| semis.checked_add(base + accidental))
            .ok_or_else(err)?;
        Note::natural(absolute.div_euclid(12), absolute.rem_euclid(12) as u8).ok_or_else(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn middle_c_is_60() {
        assert_eq!(note("C4").midi_number(), 60);
    }

    #[test]
    fn a440_is_69() {
        let a4 = note("A4");
        assert_eq!(a4.midi_number(), 69);
        assert!((a4.frequency() - 440.0).abs() < 1e-9);
    }

    #[test]
    fn octaves_double_frequency() {
        let ratio = note("A5").frequency() / note("A4").frequency();
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn cents_shift_frequency() {
        let a4 = note("A4");
        let sharp = a4.with_cents(100.0).unwrap();
        assert!((sharp.frequency() - note("A#4").frequency()).abs() < 1e-9);
    }

    #[test]
    fn offset_transposes() {
        let offset = NoteOffset {
            octaves: -1,
            semitones: 12,
            cents: 0.0,
        };
        let c4 = note("C4");
        assert!((c4.frequency_with_offset(&offset) - c4.frequency()).abs() < 1e-9);
    }

    #[test]
    fn midi_round_trip_covers_range_edges() {
        assert_eq!(Note::from_midi(0).unwrap().octave(), -1);
        assert_eq!(Note::from_midi(127).unwrap().midi_number(), 127);
        assert!(Note::from_midi(128).is_none());
        assert!(Note::from_midi(-1).is_none());
    }

    #[test]
    fn semitone_out_of_range_is_rejected() {
        assert!(Note::new(4, 12, 0.0).is_none());
        assert!(Note::new(4, 0, 150.0).is_none());
        assert!(Note::new(4, 0, f32::NAN).is_none());
    }

    #[test]
    fn sharps_and_flats_are_equal() {
        assert_eq!(note("C#4"), note("Db4"));
        assert_eq!(note("B#3"), note("C4"));
        assert_eq!(note("Cb4"), note("B3"));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Note::new(4, 0, 0.0), Note::new(4, 0, 0.0));
        assert_ne!(Note::new(4, 0, 0.0), Note::new(4, 0, 1.0));
    }

    #[test]
    fn display_uses_sharps() {
        assert_eq!(note("Eb2").to_string(), "D#2");
        assert_eq!(note("A4").with_cents(-5.0).unwrap().to_string(), "A4-5c");
    }

    #[test]
    fn octaves_are_bounded() {
        assert_eq!(note("C-1").midi_number(), 0);
        assert_eq!(note("B9").midi_number(), 131);
        assert!(Note::natural(10, 0).is_none());
        assert!(Note::natural(-2, 11).is_none());
        assert!(Note::natural(i32::MAX, 0).is_none());
        assert!(Note::new(i32::MIN, 0, 0.0).is_none());

        // accidentals can push a name over either edge
        assert!("B#9".parse::<Note>().is_err());
        assert!("Cb-1".parse::<Note>().is_err());
    }

    #[test]
    fn huge_octave_names_fail_cleanly() {
        assert!("C999999999".parse::<Note>().is_err());
        assert!("C-999999999".parse::<Note>().is_err());
        assert!("B2147483647".parse::<Note>().is_err());
        assert!("C99999999999999".parse::<Note>().is_err());
    }

    #[test]
    fn extreme_offsets_do_not_overflow() {
        let offset = NoteOffset {
            octaves: i32::MAX,
            semitones: i32::MAX,
            cents: 0.0,
        };
        assert!(note("A4").frequency_with_offset(&offset).is_infinite());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_notes_are_validated() {
        let raw = |octave, semitone, cents| RawNote {
            octave,
            semitone,
            cents,
        };
        assert_eq!(Note::try_from(raw(4, 9, 0.0)), Ok(note("A4")));
        assert!(Note::try_from(raw(4, 12, 0.0)).is_err());
        assert!(Note::try_from(raw(i32::MAX, 0, 0.0)).is_err());
        assert!(Note::try_from(raw(4, 0, 500.0)).is_err());
    }

    #[test]
    fn invalid_names_fail() {
        assert!("H4".parse::<Note>().is_err());
        assert!("C".parse::<Note>().is_err());
        assert!("".parse::<Note>().is_err());
    }
}
