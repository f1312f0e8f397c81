// Score audio - Renderable audio data handed to the render engine

use super::beat::{Tempo, TimeSignature};

/// A note scheduled on the score's tick axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledNote {
    pub tick: i64,
    pub duration_ticks: i64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
}

/// A score's audio related data
#[derive(Debug, Clone)]
pub struct ScoreAudio {
    /// Notes of every track, sorted by tick
    notes: Vec<ScheduledNote>,
    /// The practised instrument's channel
    instrument_channel: u8,
    tempo: Tempo,
    /// Time signature changes as (start tick, signature), sorted by tick
    time_signatures: Vec<(i64, TimeSignature)>,
    end_tick: i64,
}

impl ScoreAudio {
    pub fn new(
        mut notes: Vec<ScheduledNote>,
        instrument_channel: u8,
        tempo: Tempo,
        mut time_signatures: Vec<(i64, TimeSignature)>,
        end_tick: i64,
    ) -> Self {
        notes.sort_by_key(|note| note.tick);
        time_signatures.sort_by_key(|(tick, _)| *tick);
        Self {
            notes,
            instrument_channel,
            tempo,
            time_signatures,
            end_tick,
        }
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }

    pub fn instrument_channel(&self) -> u8 {
        self.instrument_channel
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn end_tick(&self) -> i64 {
        self.end_tick
    }

    /// Time signature in effect at the given tick
    pub fn time_signature_at(&self, tick: i64) -> TimeSignature {
        let index = self.time_signatures.partition_point(|(start, _)| *start <= tick);
        match index {
            0 => self
                .time_signatures
                .first()
                .map(|(_, signature)| *signature)
                .unwrap_or_default(),
            i => self.time_signatures[i - 1].1,
        }
    }

    /// Index of the first note starting at or after `tick`
    pub fn first_note_from(&self, tick: i64) -> usize {
        self.notes.partition_point(|note| note.tick < tick)
    }
}
