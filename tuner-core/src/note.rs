//! # Note Module
//!
//! Equal-tempered note model used by the tuner. A [`Note`] is an integer
//! position on the chromatic scale, measured in semitones from a reference
//! note (by default index 48, concert A at 440 Hz).
//!
//! ## Features
//! - Frequency of any scale position in 12-tone equal temperament
//! - Note names with octave numbers (e.g. "A4", "C#3")
//! - Linear cents position and logarithmic cents between two frequencies

use std::fmt;

/// Names of the twelve semitones, starting from A.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Concert pitch in Hz.
pub const DEFAULT_FREQ_REF: f64 = 440.0;

/// Position of the reference note (A4) in the 0-based piano indexing, where
/// index 0 is A0.
pub const DEFAULT_N_REF: i32 = 48;

/// One point on the equal-tempered chromatic scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    n: i32,
    freq_ref: f64,
    n_ref: i32,
}

impl Note {
    /// Creates a note tuned against A4 = 440 Hz at index 48.
    pub fn new(n: i32) -> Self {
        Self::with_reference(n, DEFAULT_FREQ_REF, DEFAULT_N_REF)
    }

    /// Creates a note against an arbitrary reference pitch.
    ///
    /// # Arguments
    /// * `n` - Semitone position of this note
    /// * `freq_ref` - Frequency of the reference note in Hz
    /// * `n_ref` - Semitone position of the reference note
    pub fn with_reference(n: i32, freq_ref: f64, n_ref: i32) -> Self {
        Self { n, freq_ref, n_ref }
    }

    /// Parses a name such as "A4", "C#3", "Bb2" or "A-1".
    ///
    /// Flats are accepted and mapped to their sharp spelling. Returns `None`
    /// if the pitch class or the octave cannot be parsed.
    pub fn from_name(name: &str) -> Option<Self> {
        let split = name
            .char_indices()
            .find(|&(i, c)| i > 0 && (c.is_ascii_digit() || c == '-'))
            .map(|(i, _)| i)?;
        let (pitch, octave) = name.split_at(split);
        let octave: i32 = octave.parse().ok()?;
        let (natural, flat) = match pitch.strip_suffix('b') {
            Some(natural) => (natural, true),
            None => (pitch, false),
        };
        let index = NOTE_NAMES.iter().position(|&n| n == natural)? as i32;
        if flat && natural.ends_with('#') {
            return None;
        }

        // A, A# and B belong to the octave that started at the previous C.
        let base = if index >= 3 { octave - 1 } else { octave };
        let n = 12 * base + index;
        Some(Self::new(if flat { n - 1 } else { n }))
    }

    /// Semitone position of this note.
    pub fn position(&self) -> i32 {
        self.n
    }

    /// Frequency of the reference note in Hz.
    pub fn reference_hz(&self) -> f64 {
        self.freq_ref
    }

    /// Frequency in Hz: `freq_ref * 2^((n - n_ref) / 12)`.
    ///
    /// The whole octaves are applied as an exact power of two, so a note one
    /// octave up is always exactly twice the frequency.
    pub fn to_hertz(&self) -> f64 {
        let offset = i64::from(self.n) - i64::from(self.n_ref);
        let octaves = offset.div_euclid(12);
        let step = offset.rem_euclid(12);
        self.freq_ref * 2.0_f64.powf(step as f64 / 12.0) * 2.0_f64.powi(octaves as i32)
    }

    /// Linear cents position, `100 * n`.
    ///
    /// This is the note's position expressed in cents, not a deviation of
    /// any measured frequency. Use [`cents_between`] for that.
    pub fn to_cents(&self) -> i64 {
        100 * i64::from(self.n)
    }

    /// Pitch class name without octave, e.g. "C#".
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.n.rem_euclid(12) as usize]
    }

    /// Octave number. The octave changes at C.
    pub fn octave(&self) -> i32 {
        (self.n + 9).div_euclid(12)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

/// Frequency of a possibly fractional semitone position.
pub fn semitones_to_hertz(semitones: f64, freq_ref: f64, n_ref: i32) -> f64 {
    freq_ref * 2.0_f64.powf((semitones - f64::from(n_ref)) / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat; 1200 cents make an
/// octave.
pub fn cents_between(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}
