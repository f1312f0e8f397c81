// Beat timeline - Immutable ordered beat sequence of a loaded score
// Converts between ticks (audio time) and visual positions (sheet coordinates)

use super::beat::{Beat, Tempo};
use thiserror::Error;

/// Errors raised when building a timeline from inconsistent beats
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("Timeline needs at least one beat")]
    Empty,

    #[error("Beat {index} goes back in time or position")]
    NonMonotonic { index: usize },
}

/// The beat sequence of a score
///
/// The last entry is always the end beat: no note, no successor, positioned at
/// the score's total width. Every other entry's successor is the next index.
#[derive(Debug, Clone)]
pub struct BeatTimeline {
    beats: Vec<Beat>,
    tempo: Tempo,
}

impl BeatTimeline {
    /// Build a timeline from the score's beats and the end of the score
    ///
    /// `end_tick` is the tick right after the last beat ends, `width` the sheet's total width.
    pub fn new(
        mut beats: Vec<Beat>,
        end_tick: i64,
        width: i32,
        tempo: Tempo,
    ) -> Result<Self, TimelineError> {
        let last = beats.last().ok_or(TimelineError::Empty)?;
        let end = Beat::new(end_tick, width, None, last.time_signature);
        beats.push(end);

        for (index, pair) in beats.windows(2).enumerate() {
            if pair[1].tick < pair[0].tick || pair[1].visual_position < pair[0].visual_position {
                return Err(TimelineError::NonMonotonic { index: index + 1 });
            }
        }

        Ok(Self { beats, tempo })
    }

    /// All beats, end beat included
    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn beat(&self, index: usize) -> &Beat {
        &self.beats[index]
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Index of the end beat
    pub fn end_index(&self) -> usize {
        self.beats.len() - 1
    }

    pub fn end_beat(&self) -> &Beat {
        &self.beats[self.end_index()]
    }

    pub fn is_end(&self, index: usize) -> bool {
        index == self.end_index()
    }

    /// Successor of a beat, `None` for the end beat
    pub fn next_index(&self, index: usize) -> Option<usize> {
        if self.is_end(index) { None } else { Some(index + 1) }
    }

    pub fn first_visual_position(&self) -> i32 {
        self.beats[0].visual_position
    }

    /// Index of the last beat whose tick is at or before `tick`
    ///
    /// Ticks before the first beat resolve to the first beat.
    pub fn index_at_or_before_tick(&self, tick: i64) -> usize {
        assert!(tick >= 0, "Negative tick query: {}", tick);
        self.beats
            .partition_point(|beat| beat.tick <= tick)
            .saturating_sub(1)
    }

    /// Index of the last beat whose visual position is at or before `position`
    pub fn index_at_or_before_visual_position(&self, position: i32) -> usize {
        assert!(
            position >= self.first_visual_position(),
            "Visual position {} is before the first beat",
            position
        );
        self.beats
            .partition_point(|beat| beat.visual_position <= position)
            .saturating_sub(1)
    }

    /// Last beat that plays at or before the given tick
    pub fn last_beat_at_or_before_tick(&self, tick: i64) -> &Beat {
        &self.beats[self.index_at_or_before_tick(tick)]
    }

    /// Last beat placed at or before the given visual position
    pub fn last_beat_at_or_before_visual_position(&self, position: i32) -> &Beat {
        &self.beats[self.index_at_or_before_visual_position(position)]
    }

    /// Convert a tick to a visual position
    /// Interpolates linearly between the surrounding beats
    pub fn tick_to_visual_position(&self, tick: i64) -> i32 {
        let index = self.index_at_or_before_tick(tick);
        let current = &self.beats[index];

        let Some(next) = self.next_index(index).map(|i| &self.beats[i]) else {
            return current.visual_position;
        };

        let progress = ((tick - current.tick) as f64 / (next.tick - current.tick) as f64).max(0.0);
        lerp(
            current.visual_position as f64,
            next.visual_position as f64,
            progress,
        ) as i32
    }

    /// Convert a visual position to a tick
    /// Interpolates linearly between the surrounding beats
    pub fn visual_position_to_tick(&self, position: i32) -> i64 {
        let index = self.index_at_or_before_visual_position(position);
        let current = &self.beats[index];

        let Some(next) = self.next_index(index).map(|i| &self.beats[i]) else {
            return current.tick;
        };

        let progress = (position - current.visual_position) as f64
            / (next.visual_position - current.visual_position) as f64;
        lerp(current.tick as f64, next.tick as f64, progress) as i64
    }

    /// Clamp a visual position into the scrollable range of the sheet
    pub fn clamp_visual_position(&self, position: i32) -> i32 {
        position.clamp(self.first_visual_position(), self.end_beat().visual_position)
    }
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
