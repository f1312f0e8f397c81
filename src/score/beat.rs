// Beats - Discrete points of a score's timeline
// A beat either carries one note or is a rest

use std::fmt;

/// Ticks per quarter note (PPQN)
/// Canonical playback-position resolution for the whole player
pub const TICKS_PER_QUARTER: i64 = 960;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> Self {
        assert!(numerator > 0, "Time signature numerator must be > 0");
        assert!(
            denominator.is_power_of_two(),
            "Time signature denominator must be power of 2"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Common 3/4 time signature
    pub fn three_four() -> Self {
        Self::new(3, 4)
    }

    /// Length of one count-in bar in ticks
    /// Counts one quarter per numerator unit, whatever the denominator
    pub fn count_in_ticks(&self) -> i64 {
        TICKS_PER_QUARTER * self.numerator as i64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (20.0..=999.0).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds at the given playback speed
    pub fn beat_duration_seconds(&self, speed: f32) -> f64 {
        60.0 / self.bpm / speed as f64
    }

    /// Converts a duration in seconds into ticks at the given playback speed
    /// Truncates toward zero
    pub fn seconds_to_ticks(&self, seconds: f64, speed: f32) -> i64 {
        (seconds * TICKS_PER_QUARTER as f64 / self.beat_duration_seconds(speed)) as i64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// A beat's note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// Sounding duration in ticks
    pub duration_ticks: i64,
    /// Zero based, from the lightest string towards the heaviest
    pub string: u8,
    pub fret: u8,
    /// MIDI pitch
    pub pitch: u8,
}

/// A timeline entry marking a played note or a rest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    pub tick: i64,
    /// Horizontal sheet coordinate of the beat
    pub visual_position: i32,
    pub note: Option<Note>,
    pub time_signature: TimeSignature,
}

impl Beat {
    pub fn new(tick: i64, visual_position: i32, note: Option<Note>, time_signature: TimeSignature) -> Self {
        Self {
            tick,
            visual_position,
            note,
            time_signature,
        }
    }

    /// Check if this beat is a rest
    pub fn is_rest(&self) -> bool {
        self.note.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_in_ticks() {
        assert_eq!(TimeSignature::four_four().count_in_ticks(), 3840);
        assert_eq!(TimeSignature::three_four().count_in_ticks(), 2880);
        assert_eq!(TimeSignature::new(6, 8).count_in_ticks(), 5760);
    }

    #[test]
    #[should_panic]
    fn test_invalid_denominator() {
        TimeSignature::new(4, 3);
    }

    #[test]
    fn test_tempo_conversions() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.beat_duration_seconds(1.0), 0.5);
        assert_eq!(tempo.beat_duration_seconds(0.5), 1.0);

        // 0.5s at 120 BPM is exactly one quarter
        assert_eq!(tempo.seconds_to_ticks(0.5, 1.0), TICKS_PER_QUARTER);
        // Half speed halves the tick rate
        assert_eq!(tempo.seconds_to_ticks(0.5, 0.5), TICKS_PER_QUARTER / 2);
    }

    #[test]
    fn test_rest_beat() {
        let rest = Beat::new(0, 0, None, TimeSignature::default());
        assert!(rest.is_rest());

        let note = Note {
            duration_ticks: 960,
            string: 3,
            fret: 0,
            pitch: 28,
        };
        let played = Beat::new(0, 0, Some(note), TimeSignature::default());
        assert!(!played.is_rest());
    }
}
