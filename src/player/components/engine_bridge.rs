// Engine bridge - Keeps the render engine and the shared transport in step
//
// Transport changes are pushed to the engine. Each poll pulls the engine's
// position back into the transport, and resets playback once the engine
// reports the end of the score.

use crate::player::playback::PlaybackMode;
use crate::player::state::{Component, StateHandle};
use crate::score::{BeatTimeline, ScoreAudio, TICKS_PER_QUARTER};
use crate::synth::RenderEngine;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub struct EngineBridge<E: RenderEngine> {
    engine: RefCell<E>,
    finished: Arc<AtomicBool>,
    instrument_channel: Cell<u8>,
    timeline: RefCell<Option<Arc<BeatTimeline>>>,
    /// Tick the current count-in leads to
    count_in_target: Cell<i64>,
    /// Length of the current count-in
    count_in_offset: Cell<i64>,
}

impl<E: RenderEngine> EngineBridge<E> {
    pub fn new(engine: E) -> Self {
        let finished = engine.finished_signal();
        Self {
            engine: RefCell::new(engine),
            finished,
            instrument_channel: Cell::new(0),
            timeline: RefCell::new(None),
            count_in_target: Cell::new(0),
            count_in_offset: Cell::new(0),
        }
    }

    fn volume(enabled: bool) -> f32 {
        if enabled { 1.0 } else { 0.0 }
    }

    fn start_count_in(&self, tick: i64) {
        let numerator = self
            .timeline
            .borrow()
            .as_ref()
            .map_or(4, |timeline| {
                timeline.last_beat_at_or_before_tick(tick.max(0)).time_signature.numerator
            });
        self.count_in_target.set(tick);
        self.count_in_offset.set(TICKS_PER_QUARTER * numerator as i64);
    }
}

impl<E: RenderEngine> Component for EngineBridge<E> {
    fn on_start_loading(&self, _state: &StateHandle) {
        self.engine.borrow_mut().pause();
    }

    fn on_load_audio(&self, state: &StateHandle, audio: &Arc<ScoreAudio>) {
        let channel = audio.instrument_channel();
        self.instrument_channel.set(channel);

        let current = state.get();
        let mut engine = self.engine.borrow_mut();
        engine.load(Arc::clone(audio));
        engine.reset_channel_states();
        engine.set_channel_solo(channel, current.solo);
        engine.set_channel_mute(channel, current.mute);
        engine.set_metronome_volume(Self::volume(current.metronome));
        engine.set_count_in_volume(Self::volume(current.count_in));
        engine.set_playback_speed(current.speed);
        debug!(channel, "Render engine loaded");
    }

    fn on_load_timeline(&self, _state: &StateHandle, timeline: &Arc<BeatTimeline>) {
        self.timeline.replace(Some(Arc::clone(timeline)));
    }

    fn on_playback_update(&self, state: &StateHandle, playback: PlaybackMode) {
        self.finished.store(false, Ordering::Release);

        if !playback.is_running() {
            self.engine.borrow_mut().pause();
            return;
        }

        let tick = state.tick();
        if playback == PlaybackMode::CountingIn {
            self.start_count_in(tick);
        }
        let mut engine = self.engine.borrow_mut();
        engine.set_tick_position(tick);
        engine.play();
    }

    fn on_solo_update(&self, _state: &StateHandle, solo: bool) {
        self.engine
            .borrow_mut()
            .set_channel_solo(self.instrument_channel.get(), solo);
    }

    fn on_mute_update(&self, _state: &StateHandle, mute: bool) {
        self.engine
            .borrow_mut()
            .set_channel_mute(self.instrument_channel.get(), mute);
    }

    fn on_metronome_update(&self, _state: &StateHandle, metronome: bool) {
        self.engine
            .borrow_mut()
            .set_metronome_volume(Self::volume(metronome));
    }

    fn on_count_in_update(&self, _state: &StateHandle, count_in: bool) {
        self.engine
            .borrow_mut()
            .set_count_in_volume(Self::volume(count_in));
    }

    fn on_speed_update(&self, _state: &StateHandle, speed: f32) {
        self.engine.borrow_mut().set_playback_speed(speed);
    }

    fn poll(&self, state: &StateHandle) {
        if state.playback() == PlaybackMode::CountingIn {
            let elapsed = self.engine.borrow().tick_position();
            state.set_tick(self.count_in_target.get() - self.count_in_offset.get() + elapsed);
        }

        if !state.playback().is_running() || self.engine.borrow().is_playing_count_in() {
            return;
        }

        let tick = self.engine.borrow().tick_position();
        state.set_tick(tick);
        state.set_playback(PlaybackMode::Playing);

        if self.finished.swap(false, Ordering::AcqRel) {
            info!(tick, "Score finished, back to the start");
            state.reset_playback();
        }
    }
}
