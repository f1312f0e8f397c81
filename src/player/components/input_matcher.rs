// Input matcher - Auto-pause when the player misses the expected note
//
// The matcher waits on the next beat that carries a note. Once the delayed
// playback position enters the beat's detection window the expected pitch is
// checked against the MIDI activity, a hit moves on to the following note, a
// position past the window pauses playback and rewinds to the snap beat.

use crate::midi::NoteActivity;
use crate::player::playback::PlaybackMode;
use crate::player::state::{Component, StateHandle};
use crate::score::{Beat, BeatTimeline};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::info;

/// Timing tolerances, in seconds of score time at nominal speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherSettings {
    /// Latency between the heard position and the played note
    pub note_delay: f64,
    /// Half width of the detection window
    pub detection_radius: f64,
    /// When false, any octave of the expected pitch class counts
    pub distinguish_octaves: bool,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            note_delay: 0.1,
            detection_radius: 0.4,
            distinguish_octaves: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    /// Beat whose note is expected next, `None` past the last note
    waiting: Option<usize>,
    /// Where playback rewinds to on a miss
    snap: usize,
}

pub struct InputMatcher<A: NoteActivity> {
    activity: A,
    settings: Cell<MatcherSettings>,
    timeline: RefCell<Option<Arc<BeatTimeline>>>,
    cursor: Cell<Option<Cursor>>,
}

impl<A: NoteActivity> InputMatcher<A> {
    pub fn new(activity: A, settings: MatcherSettings) -> Self {
        Self {
            activity,
            settings: Cell::new(settings),
            timeline: RefCell::new(None),
            cursor: Cell::new(None),
        }
    }

    pub fn settings(&self) -> MatcherSettings {
        self.settings.get()
    }

    pub fn set_settings(&self, settings: MatcherSettings) {
        self.settings.set(settings);
    }

    /// Beat whose note is expected next
    pub fn waiting_beat(&self) -> Option<Beat> {
        let timeline = self.timeline()?;
        let waiting = self.cursor.get()?.waiting?;
        Some(*timeline.beat(waiting))
    }

    /// Beat playback rewinds to on a miss
    pub fn snap_beat(&self) -> Option<Beat> {
        let timeline = self.timeline()?;
        let cursor = self.cursor.get()?;
        Some(*timeline.beat(cursor.snap))
    }

    fn timeline(&self) -> Option<Arc<BeatTimeline>> {
        self.timeline.borrow().clone()
    }

    /// Recompute the cursor from the current tick, outside of count-in
    fn check_state(&self, state: &StateHandle) {
        if state.playback() == PlaybackMode::CountingIn {
            return;
        }
        if let Some(timeline) = self.timeline() {
            let start = timeline.index_at_or_before_tick(state.tick().max(0));
            self.cursor.set(Some(find_waiting(&timeline, start)));
        }
    }
}

/// Walk forward from `start` to the first beat with a note
/// The last rest skipped on the way becomes the snap beat
fn find_waiting(timeline: &BeatTimeline, start: usize) -> Cursor {
    let mut index = start;
    let mut skipped = None;
    loop {
        if timeline.beat(index).note.is_some() {
            return Cursor {
                waiting: Some(index),
                snap: skipped.unwrap_or(index),
            };
        }
        match timeline.next_index(index) {
            Some(next) => {
                skipped = Some(index);
                index = next;
            }
            None => {
                return Cursor {
                    waiting: None,
                    snap: skipped.unwrap_or(index),
                };
            }
        }
    }
}

impl<A: NoteActivity> Component for InputMatcher<A> {
    fn on_start_loading(&self, _state: &StateHandle) {
        self.timeline.replace(None);
        self.cursor.set(None);
    }

    fn on_load_timeline(&self, state: &StateHandle, timeline: &Arc<BeatTimeline>) {
        self.timeline.replace(Some(Arc::clone(timeline)));
        self.cursor.set(None);
        self.check_state(state);
    }

    fn on_playback_update(&self, state: &StateHandle, _playback: PlaybackMode) {
        self.check_state(state);
    }

    fn on_auto_pause_update(&self, state: &StateHandle, _auto_pause: bool) {
        self.check_state(state);
    }

    fn on_tick_update(&self, state: &StateHandle, _tick: i64) {
        if state.playback() != PlaybackMode::Playing {
            self.check_state(state);
        }
    }

    fn poll(&self, state: &StateHandle) {
        let Some(cursor) = self.cursor.get() else {
            return;
        };
        let Some(waiting) = cursor.waiting else {
            return;
        };
        let current = state.get();
        if current.playback != PlaybackMode::Playing || !current.auto_pause {
            return;
        }
        let Some(timeline) = self.timeline() else {
            return;
        };

        let settings = self.settings.get();
        let tempo = timeline.tempo();
        let delay = tempo.seconds_to_ticks(settings.note_delay, current.speed);
        let radius = tempo.seconds_to_ticks(settings.detection_radius, current.speed);
        let adjusted = current.tick - delay;

        let beat = *timeline.beat(waiting);
        if adjusted < beat.tick - radius {
            return;
        }

        let next = timeline.next_index(waiting);
        let past_next = next.is_some_and(|i| timeline.beat(i).tick <= adjusted);
        if adjusted > beat.tick + radius || past_next {
            let snap = timeline.beat(cursor.snap).tick;
            info!(
                tick = current.tick,
                expected = ?beat.note.map(|note| note.pitch),
                snap,
                "Missed note, pausing"
            );
            state.set_playback(PlaybackMode::Paused);
            state.set_tick(snap);
            return;
        }

        let Some(note) = beat.note else {
            return;
        };
        if self.activity.is_active(note.pitch, !settings.distinguish_octaves) {
            if let Some(next) = next {
                self.cursor.set(Some(find_waiting(&timeline, next)));
            }
        }
    }
}
