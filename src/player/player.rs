// Player - Owner of the transport, its components and the update cycle

use super::components::{Controls, NoteCue, NoteCues};
use super::state::{Component, SharedState, StateHandle, TransportState};
use crate::loading::{LoadError, LoadingListener};
use crate::score::{BeatTimeline, ScoreAudio, SheetGraphics};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

/// A practice session
///
/// Components see the transport changes in registration order. The built-in
/// controls and note cues come first, engine and input components are added
/// with `register`.
pub struct Player {
    state: Rc<SharedState>,
    controls: Rc<Controls>,
    controls_handle: StateHandle,
    cues: Rc<NoteCues>,
    timeline: Option<Arc<BeatTimeline>>,
    graphics: Option<Arc<SheetGraphics>>,
}

impl Player {
    pub fn new(look_ahead_beats: u32) -> Self {
        let state = SharedState::new();
        let controls = Rc::new(Controls::new());
        let controls_handle = state.register(controls.clone());
        let cues = Rc::new(NoteCues::new(look_ahead_beats));
        state.register(cues.clone());

        Self {
            state,
            controls,
            controls_handle,
            cues,
            timeline: None,
            graphics: None,
        }
    }

    pub fn register<C: Component + 'static>(&self, component: Rc<C>) -> StateHandle {
        self.state.register(component)
    }

    /// One update cycle, every component polls in registration order
    pub fn poll(&self) {
        self.state.for_each(|component, handle| component.poll(handle));
    }

    pub fn state(&self) -> TransportState {
        self.state.snapshot()
    }

    pub fn is_loaded(&self) -> bool {
        self.timeline.is_some()
    }

    pub fn timeline(&self) -> Option<&Arc<BeatTimeline>> {
        self.timeline.as_ref()
    }

    pub fn graphics(&self) -> Option<&Arc<SheetGraphics>> {
        self.graphics.as_ref()
    }

    /// Sheet position of the playback cursor
    pub fn visual_position(&self) -> Option<i32> {
        let timeline = self.timeline.as_ref()?;
        Some(timeline.tick_to_visual_position(self.state().tick.max(0)))
    }

    pub fn cues(&self) -> Vec<NoteCue> {
        self.cues.cues()
    }

    /// Back to a paused transport at the start of the score
    pub fn reset(&self) {
        self.state.reset_playback();
    }

    pub fn request_play(&self, play: bool) -> bool {
        self.controls.request_play(&self.controls_handle, play)
    }

    pub fn toggle_play(&self) -> bool {
        self.controls.toggle_play(&self.controls_handle)
    }

    pub fn start_scroll(&self, position: i32) -> bool {
        self.controls.start_scroll(&self.controls_handle, position)
    }

    pub fn scroll_update(&self, position: i32) -> bool {
        self.controls.scroll_update(&self.controls_handle, position)
    }

    pub fn end_scroll(&self, position: i32) -> bool {
        self.controls.end_scroll(&self.controls_handle, position)
    }

    pub fn set_solo(&self, solo: bool) {
        self.controls_handle.set_solo(solo);
    }

    pub fn set_mute(&self, mute: bool) {
        self.controls_handle.set_mute(mute);
    }

    pub fn set_metronome(&self, metronome: bool) {
        self.controls_handle.set_metronome(metronome);
    }

    pub fn set_count_in(&self, count_in: bool) {
        self.controls_handle.set_count_in(count_in);
    }

    pub fn set_auto_pause(&self, auto_pause: bool) {
        self.controls_handle.set_auto_pause(auto_pause);
    }

    pub fn set_speed(&self, speed: f32) {
        self.controls_handle.set_speed(speed);
    }
}

impl LoadingListener for Player {
    fn on_start_loading(&mut self) {
        debug!("Player loading");
        self.timeline = None;
        self.graphics = None;
        self.state.for_each(|component, handle| component.on_start_loading(handle));
    }

    fn on_load_audio(&mut self, audio: Arc<ScoreAudio>) {
        self.state
            .for_each(|component, handle| component.on_load_audio(handle, &audio));
    }

    fn on_load_timeline(&mut self, timeline: Arc<BeatTimeline>) {
        self.state
            .for_each(|component, handle| component.on_load_timeline(handle, &timeline));
        self.timeline = Some(timeline);
    }

    fn on_load_graphics(&mut self, graphics: Arc<SheetGraphics>) {
        self.state
            .for_each(|component, handle| component.on_load_graphics(handle, &graphics));
        self.graphics = Some(graphics);
    }

    fn on_finish_loading(&mut self) {
        self.state.reset_playback();
        self.state.for_each(|component, handle| component.on_end_loading(handle));
        debug!("Player ready");
    }

    fn on_load_failed(&mut self, error: &LoadError) {
        warn!(%error, "No score loaded");
        self.state.for_each(|component, handle| component.on_end_loading(handle));
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(4)
    }
}
