// src/note.rs
//
// Note names such as `C4` or `F#2`.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Pitch class. Only sharps are spelled; `E#` and `B#` do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    #[inline]
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// Frequency in the fourth octave, in Hz.
    pub fn base_frequency(self) -> f32 {
        match self {
            PitchClass::C => 261.63,
            PitchClass::CSharp => 277.18,
            PitchClass::D => 293.66,
            PitchClass::DSharp => 311.13,
            PitchClass::E => 329.63,
            PitchClass::F => 349.23,
            PitchClass::FSharp => 369.99,
            PitchClass::G => 392.0,
            PitchClass::GSharp => 415.3,
            PitchClass::A => 440.0,
            PitchClass::ASharp => 466.16,
            PitchClass::B => 493.88,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    fn parse(letter: char, sharp: bool) -> Option<Self> {
        let natural = match letter.to_ascii_uppercase() {
            'C' => PitchClass::C,
            'D' => PitchClass::D,
            'E' => PitchClass::E,
            'F' => PitchClass::F,
            'G' => PitchClass::G,
            'A' => PitchClass::A,
            'B' => PitchClass::B,
            _ => return None,
        };
        if !sharp {
            return Some(natural);
        }
        match natural {
            PitchClass::E | PitchClass::B => None,
            _ => Some(Self::ALL[natural.semitone() as usize + 1]),
        }
    }
}

/// A pitch class in octaves 0 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pitch: PitchClass,
    octave: u8,
}

impl Note {
    pub const MAX_OCTAVE: u8 = 8;

    pub fn new(pitch: PitchClass, octave: u8) -> Option<Self> {
        (octave <= Self::MAX_OCTAVE).then_some(Self { pitch, octave })
    }

    pub fn pitch(&self) -> PitchClass {
        self.pitch
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Equal-tempered frequency, A4 = 440 Hz.
    pub fn frequency(&self) -> f32 {
        self.pitch.base_frequency() * 2f32.powi(self.octave as i32 - 4)
    }

    /// MIDI note number, with C0 = 12.
    pub fn midi(&self) -> u8 {
        12 + self.pitch.semitone() + 12 * self.octave
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidNote(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let rest = chars.as_str();
        let (sharp, octave) = match rest.strip_prefix('#') {
            Some(octave) => (true, octave),
            None => (false, rest),
        };

        let pitch = PitchClass::parse(letter, sharp).ok_or_else(invalid)?;
        let mut digits = octave.chars();
        let octave = match (digits.next(), digits.next()) {
            (Some(d @ '0'..='8'), None) => d as u8 - b'0',
            _ => return Err(invalid()),
        };
        Ok(Self { pitch, octave })
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.name(), self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn note(s: &str) -> Note {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(note("C4").to_string(), "C4");
        assert_eq!(note("f#2").to_string(), "F#2");
        assert_eq!(note("a0"), Note::new(PitchClass::A, 0).unwrap());
    }

    #[test]
    fn test_rejects_invalid_names() {
        for bad in ["", "H4", "E#4", "b#1", "C9", "C", "C#", "C44", "Cb4", "#4", "C-1"] {
            assert_eq!(
                bad.parse::<Note>(),
                Err(Error::InvalidNote(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_frequency() {
        assert_eq!(note("A4").frequency(), 440.0);
        assert_relative_eq!(note("A5").frequency(), 880.0);
        assert_relative_eq!(note("C3").frequency(), 130.815);
        assert_relative_eq!(note("G#0").frequency(), 415.3 / 16.0);
    }

    #[test]
    fn test_midi() {
        assert_eq!(note("C0").midi(), 12);
        assert_eq!(note("C4").midi(), 60);
        assert_eq!(note("A4").midi(), 69);
        assert_eq!(note("B8").midi(), 119);
    }

    #[test]
    fn test_octave_bound() {
        assert!(Note::new(PitchClass::C, 9).is_none());
    }
}
