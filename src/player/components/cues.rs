// Note cues - Upcoming notes for a fretboard overlay

use crate::player::playback::PlaybackMode;
use crate::player::state::{Component, StateHandle};
use crate::score::{BeatTimeline, TICKS_PER_QUARTER};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// One upcoming or sounding note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCue {
    pub string: u8,
    pub fret: u8,
    /// 1.0 while the note sounds, rising towards 1.0 as it approaches
    pub convergence: f32,
    /// The note lies before the position the current count-in resumes from
    pub before_resume: bool,
}

pub struct NoteCues {
    look_ahead_beats: u32,
    visible: Cell<bool>,
    timeline: RefCell<Option<Arc<BeatTimeline>>>,
    /// Tick the current count-in started from
    resume_tick: Cell<Option<i64>>,
    cues: RefCell<Vec<NoteCue>>,
}

impl NoteCues {
    pub fn new(look_ahead_beats: u32) -> Self {
        Self {
            look_ahead_beats,
            visible: Cell::new(false),
            timeline: RefCell::new(None),
            resume_tick: Cell::new(None),
            cues: RefCell::new(Vec::new()),
        }
    }

    /// Cues for the current tick, empty while loading
    pub fn cues(&self) -> Vec<NoteCue> {
        self.cues.borrow().clone()
    }

    fn refresh(&self, tick: i64) {
        let cues = match self.timeline.borrow().as_ref() {
            Some(timeline) if self.visible.get() => self.compute(timeline, tick),
            _ => Vec::new(),
        };
        self.cues.replace(cues);
    }

    fn compute(&self, timeline: &BeatTimeline, tick: i64) -> Vec<NoteCue> {
        let distance = self.look_ahead_beats as i64 * TICKS_PER_QUARTER;
        let horizon = tick + distance;
        let resume = self.resume_tick.get();

        let mut cues = Vec::new();
        let mut index = timeline.index_at_or_before_tick(tick.max(0));
        while !timeline.is_end(index) && timeline.beat(index).tick <= horizon {
            let beat = timeline.beat(index);
            if let Some(note) = beat.note {
                let sounding = beat.tick <= tick && beat.tick + note.duration_ticks > tick;
                let convergence = if sounding {
                    1.0
                } else {
                    (1.0 - (beat.tick - tick) as f32 / distance as f32).min(1.0)
                };
                cues.push(NoteCue {
                    string: note.string,
                    fret: note.fret,
                    convergence,
                    before_resume: resume.is_some_and(|resume| beat.tick < resume),
                });
            }
            index += 1;
        }
        cues
    }
}

impl Component for NoteCues {
    fn on_start_loading(&self, _state: &StateHandle) {
        self.visible.set(false);
        self.timeline.replace(None);
        self.refresh(0);
    }

    fn on_load_timeline(&self, _state: &StateHandle, timeline: &Arc<BeatTimeline>) {
        self.timeline.replace(Some(Arc::clone(timeline)));
    }

    fn on_end_loading(&self, state: &StateHandle) {
        self.visible.set(true);
        self.refresh(state.tick());
    }

    fn on_playback_update(&self, state: &StateHandle, playback: PlaybackMode) {
        let resume = (playback == PlaybackMode::CountingIn).then(|| state.tick());
        self.resume_tick.set(resume);
    }

    fn on_tick_update(&self, _state: &StateHandle, tick: i64) {
        self.refresh(tick);
    }
}
