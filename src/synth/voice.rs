// Voice - One plucked note of the reference renderer

use std::f32::consts::TAU;

/// Below this level a voice is considered silent
const SILENCE: f32 = 1.0e-4;
/// Level lost per second while the note is held
const SUSTAIN_DECAY_PER_SECOND: f32 = 0.25;
/// Release time once the note's duration is over
const RELEASE_SECONDS: f32 = 0.05;

pub struct PluckVoice {
    pitch: u8,
    phase: f32,
    phase_increment: f32,
    amplitude: f32,
    level: f32,
    /// Samples left before release
    held_samples: usize,
    sustain_factor: f32,
    release_factor: f32,
}

impl PluckVoice {
    pub fn new(pitch: u8, velocity: u8, duration_seconds: f32, sample_rate: f32) -> Self {
        // MIDI note to frequency: 440 * 2^((note - 69) / 12)
        let frequency = 440.0 * 2_f32.powf((pitch as f32 - 69.0) / 12.0);

        Self {
            pitch,
            phase: 0.0,
            phase_increment: TAU * frequency / sample_rate,
            amplitude: velocity as f32 / 127.0 * 0.3,
            level: 1.0,
            held_samples: (duration_seconds.max(0.0) * sample_rate) as usize,
            sustain_factor: SUSTAIN_DECAY_PER_SECOND.powf(1.0 / sample_rate),
            release_factor: SILENCE.powf(1.0 / (RELEASE_SECONDS * sample_rate)),
        }
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn next_sample(&mut self) -> f32 {
        // Fundamental plus one octave for low notes to stay audible
        let sample = (self.phase.sin() + 0.5 * (2.0 * self.phase).sin()) * self.amplitude * self.level;

        self.phase += self.phase_increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }

        if self.held_samples > 0 {
            self.held_samples -= 1;
            self.level *= self.sustain_factor;
        } else {
            self.level *= self.release_factor;
        }
        sample
    }

    pub fn is_finished(&self) -> bool {
        self.level < SILENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_rings_then_stops() {
        let sample_rate = 8000.0;
        let mut voice = PluckVoice::new(40, 100, 0.1, sample_rate);
        let held: Vec<f32> = (0..800).map(|_| voice.next_sample()).collect();
        assert!(held.iter().any(|s| s.abs() > 0.01));
        assert!(!voice.is_finished());

        // Release lasts 50 ms
        for _ in 0..500 {
            voice.next_sample();
        }
        assert!(voice.is_finished());
    }

    #[test]
    fn test_zero_velocity_is_silent() {
        let mut voice = PluckVoice::new(40, 0, 0.1, 8000.0);
        assert!((0..100).all(|_| voice.next_sample() == 0.0));
    }
}
