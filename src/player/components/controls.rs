// Controls - User intents turned into transport changes

use crate::player::playback::PlaybackMode;
use crate::player::state::{Component, StateHandle};
use crate::score::BeatTimeline;
use std::cell::RefCell;
use std::sync::Arc;

/// Play/pause, sheet scrolling and the transport toggles
///
/// Intents that need a score are refused until a timeline is loaded.
#[derive(Default)]
pub struct Controls {
    timeline: RefCell<Option<Arc<BeatTimeline>>>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    fn timeline(&self) -> Option<Arc<BeatTimeline>> {
        self.timeline.borrow().clone()
    }

    /// Start or stop playback
    ///
    /// Playing counts in first when the count-in is enabled. Pausing snaps the
    /// tick back to the start of the current beat. Returns false when refused.
    pub fn request_play(&self, state: &StateHandle, play: bool) -> bool {
        if !state.playback().accepts_toggle() {
            return false;
        }
        let Some(timeline) = self.timeline() else {
            return false;
        };

        if play {
            let mode = if state.count_in() {
                PlaybackMode::CountingIn
            } else {
                PlaybackMode::Playing
            };
            state.set_playback(mode);
        } else {
            let snapped = timeline.last_beat_at_or_before_tick(state.tick().max(0)).tick;
            state.set_tick(snapped);
            state.set_playback(PlaybackMode::Paused);
        }
        true
    }

    pub fn toggle_play(&self, state: &StateHandle) -> bool {
        let play = state.playback() != PlaybackMode::Playing;
        self.request_play(state, play)
    }

    /// The user grabbed the sheet at `position`
    pub fn start_scroll(&self, state: &StateHandle, position: i32) -> bool {
        if state.playback() == PlaybackMode::CountingIn {
            return false;
        }
        let Some(timeline) = self.timeline() else {
            return false;
        };

        let position = timeline.clamp_visual_position(position);
        state.set_tick(timeline.visual_position_to_tick(position));
        state.set_playback(PlaybackMode::Seeking);
        true
    }

    pub fn scroll_update(&self, state: &StateHandle, position: i32) -> bool {
        if state.playback() != PlaybackMode::Seeking {
            return false;
        }
        let Some(timeline) = self.timeline() else {
            return false;
        };

        let position = timeline.clamp_visual_position(position);
        state.set_tick(timeline.visual_position_to_tick(position));
        true
    }

    /// The user released the sheet, the tick snaps to the beat under `position`
    pub fn end_scroll(&self, state: &StateHandle, position: i32) -> bool {
        if state.playback() != PlaybackMode::Seeking {
            return false;
        }
        let Some(timeline) = self.timeline() else {
            return false;
        };

        let position = timeline.clamp_visual_position(position);
        let snapped = timeline.last_beat_at_or_before_visual_position(position).visual_position;
        state.set_tick(timeline.visual_position_to_tick(snapped));
        state.set_playback(PlaybackMode::Paused);
        true
    }
}

impl Component for Controls {
    fn on_start_loading(&self, _state: &StateHandle) {
        self.timeline.replace(None);
    }

    fn on_load_timeline(&self, _state: &StateHandle, timeline: &Arc<BeatTimeline>) {
        self.timeline.replace(Some(Arc::clone(timeline)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::state::SharedState;
    use crate::score::{Beat, Tempo, TimeSignature};
    use std::rc::Rc;

    /// Beats every 960 ticks, 100 pixels apart, starting at x = 50
    fn timeline() -> Arc<BeatTimeline> {
        let ts = TimeSignature::four_four();
        let beats = (0..4).map(|i| Beat::new(i * 960, 50 + i as i32 * 100, None, ts)).collect();
        Arc::new(BeatTimeline::new(beats, 3840, 450, Tempo::default()).unwrap())
    }

    fn setup() -> (Rc<SharedState>, Rc<Controls>, StateHandle) {
        let shared = SharedState::new();
        let controls = Rc::new(Controls::new());
        let handle = shared.register(controls.clone());
        controls.on_load_timeline(&handle, &timeline());
        handle.set_count_in(false);
        (shared, controls, handle)
    }

    #[test]
    fn test_play_counts_in_by_default() {
        let shared = SharedState::new();
        let controls = Rc::new(Controls::new());
        let handle = shared.register(controls.clone());
        controls.on_load_timeline(&handle, &timeline());
        assert!(controls.request_play(&handle, true));
        assert_eq!(shared.snapshot().playback, PlaybackMode::CountingIn);
    }

    #[test]
    fn test_refused_without_score() {
        let shared = SharedState::new();
        let controls = Rc::new(Controls::new());
        let handle = shared.register(controls.clone());
        assert!(!controls.request_play(&handle, true));
        assert!(!controls.start_scroll(&handle, 100));
        assert_eq!(shared.snapshot().playback, PlaybackMode::Paused);
    }

    #[test]
    fn test_play_with_count_in() {
        let (shared, controls, handle) = setup();
        assert!(controls.request_play(&handle, true));
        assert_eq!(shared.snapshot().playback, PlaybackMode::Playing);

        assert!(controls.request_play(&handle, false));
        handle.set_count_in(true);
        assert!(controls.toggle_play(&handle));
        assert_eq!(shared.snapshot().playback, PlaybackMode::CountingIn);

        // The toggle is inert while counting in
        assert!(!controls.toggle_play(&handle));
        assert_eq!(shared.snapshot().playback, PlaybackMode::CountingIn);
    }

    #[test]
    fn test_pause_snaps_to_beat() {
        let (shared, controls, handle) = setup();
        controls.request_play(&handle, true);
        handle.set_tick(2500);
        assert!(controls.request_play(&handle, false));
        assert_eq!(shared.snapshot().tick, 1920);
        assert_eq!(shared.snapshot().playback, PlaybackMode::Paused);
    }

    #[test]
    fn test_scroll() {
        let (shared, controls, handle) = setup();
        assert!(!controls.scroll_update(&handle, 100));

        assert!(controls.start_scroll(&handle, 100));
        assert_eq!(shared.snapshot().playback, PlaybackMode::Seeking);
        assert_eq!(shared.snapshot().tick, 480);

        // Toggle is refused while seeking
        assert!(!controls.request_play(&handle, true));

        assert!(controls.scroll_update(&handle, 10_000));
        assert_eq!(shared.snapshot().tick, 3840);

        assert!(controls.end_scroll(&handle, 290));
        assert_eq!(shared.snapshot().tick, 1920);
        assert_eq!(shared.snapshot().playback, PlaybackMode::Paused);
    }

    #[test]
    fn test_scroll_refused_while_counting_in() {
        let (shared, controls, handle) = setup();
        handle.set_count_in(true);
        controls.request_play(&handle, true);
        assert!(!controls.start_scroll(&handle, 100));
        assert_eq!(shared.snapshot().playback, PlaybackMode::CountingIn);
    }
}
