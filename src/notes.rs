use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const REFERENCE_FREQ: f32 = 440.0;
const REFERENCE_MIDI: i32 = 69;

/// Index into [`NOTE_NAMES`] for any note number, negative ones included.
pub fn pitch_index(number: i32) -> usize {
    ((12 + number % 12) % 12) as usize
}

pub fn pitch_class(number: i32) -> &'static str {
    NOTE_NAMES[pitch_index(number)]
}

/// A pitch class plus octave, printed the way the engine expects it (`C#2`, `A-1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
    octave: i32,
    pitch: u8,
}

impl Note {
    pub fn new(pitch: usize, octave: i32) -> Self {
        Self {
            pitch: (pitch % 12) as u8,
            octave,
        }
    }

    /// Converts a raw keyboard index into a note, applying the semitone offset to the
    /// pitch class only and the octave offset to the octave only.
    pub fn from_key(raw_key: i32, octave_offset: i32, semitone_offset: i32) -> Self {
        let keyboard_octave = raw_key.div_euclid(12);
        Self::new(
            pitch_index(raw_key + semitone_offset),
            keyboard_octave + octave_offset,
        )
    }

    pub fn pitch_class(&self) -> &'static str {
        NOTE_NAMES[self.pitch as usize]
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// MIDI note number with C4 = 60.
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.pitch as i32
    }

    pub fn frequency(&self) -> f32 {
        midi_to_frequency(self.midi())
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave)
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid note name '{0}'")]
pub struct ParseNoteError(String);

impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let split = text
            .char_indices()
            .find(|(_, ch)| ch.is_ascii_digit() || *ch == '-')
            .map(|(idx, _)| idx)
            .ok_or_else(|| ParseNoteError(text.to_string()))?;
        let (name, octave) = text.split_at(split);
        let pitch = NOTE_NAMES
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseNoteError(text.to_string()))?;
        let octave = octave
            .parse::<i32>()
            .map_err(|_| ParseNoteError(text.to_string()))?;
        Ok(Note::new(pitch, octave))
    }
}

pub fn midi_to_frequency(midi_note: i32) -> f32 {
    REFERENCE_FREQ * 2.0f32.powf((midi_note - REFERENCE_MIDI) as f32 / 12.0)
}
