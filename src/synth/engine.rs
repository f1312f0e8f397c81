// Render engine - Interface of the engine that turns score audio into sound

use crate::score::ScoreAudio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// An engine rendering a score's audio on its own clock
///
/// Positions are ticks on the score's axis. While a count-in plays the
/// reported position counts the elapsed count-in ticks from zero instead.
pub trait RenderEngine {
    fn load(&mut self, audio: Arc<ScoreAudio>);

    fn play(&mut self);
    fn pause(&mut self);

    /// Current position of the played audio
    fn tick_position(&self) -> i64;
    fn set_tick_position(&mut self, tick: i64);

    /// Unmute and unsolo every channel
    fn reset_channel_states(&mut self);
    fn set_channel_mute(&mut self, channel: u8, mute: bool);
    fn set_channel_solo(&mut self, channel: u8, solo: bool);

    /// Gains in [0, 1]
    fn set_metronome_volume(&mut self, volume: f32);
    fn set_count_in_volume(&mut self, volume: f32);

    fn set_playback_speed(&mut self, speed: f32);

    fn is_playing_count_in(&self) -> bool;

    /// Raised from the engine's own thread when playback reaches the score end
    fn finished_signal(&self) -> Arc<AtomicBool>;
}
