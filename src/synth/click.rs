// Clicks - Metronome and count-in click sounds
// Clicks are pre-generated once, playback only copies samples

use std::f32::consts::PI;

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// First beat of the bar
    Accent,
    Regular,
}

/// Pre-generated click samples
#[derive(Debug, Clone)]
pub struct ClickSound {
    accent_samples: Vec<f32>,
    regular_samples: Vec<f32>,
}

impl ClickSound {
    const CLICK_DURATION_MS: f32 = 10.0;

    pub fn new(sample_rate: f32) -> Self {
        let click_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;

        Self {
            accent_samples: Self::generate_click(sample_rate, click_samples, 1200.0, 0.6),
            regular_samples: Self::generate_click(sample_rate, click_samples, 800.0, 0.4),
        }
    }

    /// Sine burst with a fast exponential decay
    fn generate_click(sample_rate: f32, num_samples: usize, frequency: f32, amplitude: f32) -> Vec<f32> {
        let phase_increment = 2.0 * PI * frequency / sample_rate;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp();
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect()
    }

    pub fn samples(&self, click_type: ClickType) -> &[f32] {
        match click_type {
            ClickType::Accent => &self.accent_samples,
            ClickType::Regular => &self.regular_samples,
        }
    }

    /// Click length in samples
    pub fn len(&self) -> usize {
        self.accent_samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accent_samples.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveClick {
    click_type: ClickType,
    position: usize,
    volume: f32,
}

/// Plays one click at a time, a new click cuts the previous one
#[derive(Debug, Clone)]
pub struct ClickPlayer {
    sound: ClickSound,
    current: Option<ActiveClick>,
}

impl ClickPlayer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sound: ClickSound::new(sample_rate),
            current: None,
        }
    }

    pub fn trigger(&mut self, click_type: ClickType, volume: f32) {
        if volume <= 0.0 {
            return;
        }
        self.current = Some(ActiveClick {
            click_type,
            position: 0,
            volume: volume.min(1.0),
        });
    }

    /// Next output sample, 0.0 when no click plays
    pub fn process_sample(&mut self) -> f32 {
        let Some(click) = self.current.as_mut() else {
            return 0.0;
        };
        match self.sound.samples(click.click_type).get(click.position) {
            Some(&sample) => {
                click.position += 1;
                sample * click.volume
            }
            None => {
                self.current = None;
                0.0
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_length() {
        let sound = ClickSound::new(48000.0);
        assert!((479..=480).contains(&sound.len()));
        assert_eq!(sound.samples(ClickType::Regular).len(), sound.len());
    }

    #[test]
    fn test_click_plays_once() {
        let mut player = ClickPlayer::new(1000.0);
        player.trigger(ClickType::Accent, 1.0);
        assert!(player.is_playing());

        let played: Vec<f32> = (0..10).map(|_| player.process_sample()).collect();
        assert!(played.iter().any(|s| s.abs() > 0.0));
        assert_eq!(player.process_sample(), 0.0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_silent_click_ignored() {
        let mut player = ClickPlayer::new(1000.0);
        player.trigger(ClickType::Regular, 0.0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_volume_scales_click() {
        let mut loud = ClickPlayer::new(8000.0);
        let mut soft = ClickPlayer::new(8000.0);
        loud.trigger(ClickType::Accent, 1.0);
        soft.trigger(ClickType::Accent, 0.5);
        loud.process_sample();
        soft.process_sample();
        let (a, b) = (loud.process_sample(), soft.process_sample());
        assert!((a * 0.5 - b).abs() < 1e-6);
    }
}
