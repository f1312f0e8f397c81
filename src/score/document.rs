// Beat table documents - Typed score description stored as RON
//
// A document lists tracks, bars and beats with their durations in ticks.
// Building a document lays the practised track out on a horizontal sheet and
// produces the three payloads consumed by the player: timeline, audio, graphics.

use crate::loading::LoadError;
use crate::score::audio::{ScheduledNote, ScoreAudio};
use crate::score::beat::{Beat, Note, Tempo, TICKS_PER_QUARTER, TimeSignature};
use crate::score::graphics::{SheetGraphics, SheetSegment};
use crate::score::timeline::BeatTimeline;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// General MIDI programs of the bass family
const BASS_PROGRAMS: std::ops::RangeInclusive<u8> = 32..=39;

/// String count of the practised instrument
const BASS_STRING_COUNT: usize = 4;

const DEFAULT_VELOCITY: u8 = 100;

/// Fretted note position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrettedNote {
    /// Zero based, from the lightest string
    pub string: u8,
    pub fret: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatEntry {
    /// Duration in ticks
    pub duration: i64,
    #[serde(default)]
    pub note: Option<FrettedNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarEntry {
    #[serde(default)]
    pub time_signature: TimeSignature,
    pub beats: Vec<BeatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEntry {
    pub name: String,
    /// General MIDI program
    pub program: u8,
    pub channel: u8,
    /// Open string pitches, from the lightest string
    pub tuning: Vec<u8>,
    pub bars: Vec<BarEntry>,
}

/// Serializable beat table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDocument {
    pub title: String,
    pub tempo: f64,
    pub tracks: Vec<TrackEntry>,
}

/// Sheet layout parameters
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    /// Rendering scale applied to every size below
    pub scale: f32,
    pub pixels_per_quarter: f32,
    pub bar_padding: f32,
    pub staff_line_spacing: f32,
    pub bars_per_segment: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            scale: 1.75,
            pixels_per_quarter: 48.0,
            bar_padding: 12.0,
            staff_line_spacing: 10.0,
            bars_per_segment: 3,
        }
    }
}

/// Everything the loader hands to the player for one score
#[derive(Debug, Clone)]
pub struct LoadedScore {
    pub audio: ScoreAudio,
    pub timeline: BeatTimeline,
    pub graphics: SheetGraphics,
}

impl ScoreDocument {
    pub fn from_ron_str(data: &str) -> Result<Self, LoadError> {
        Ok(ron::from_str(data)?)
    }

    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_ron_str(&data)
    }

    /// Index of the first track that can be practised
    pub fn instrument_track(&self) -> Option<usize> {
        self.tracks.iter().position(|track| {
            BASS_PROGRAMS.contains(&track.program) && track.tuning.len() == BASS_STRING_COUNT
        })
    }

    /// Lay the score out and build the player payloads
    pub fn build(&self, layout: &SheetLayout) -> Result<LoadedScore, LoadError> {
        if !(20.0..=999.0).contains(&self.tempo) {
            return Err(LoadError::InvalidScore(format!("tempo {} out of range", self.tempo)));
        }
        let tempo = Tempo::new(self.tempo);

        let track_index = self.instrument_track().ok_or(LoadError::NoEligibleTrack)?;
        let track = &self.tracks[track_index];
        if track.bars.iter().all(|bar| bar.beats.is_empty()) {
            return Err(LoadError::EmptyScore);
        }

        let mut notes = Vec::new();
        for entry in &self.tracks {
            notes.extend(track_notes(entry)?);
        }

        let pixels_per_tick = layout.pixels_per_quarter * layout.scale / TICKS_PER_QUARTER as f32;
        let padding = layout.bar_padding * layout.scale;

        let mut beats = Vec::new();
        let mut time_signatures = Vec::new();
        let mut bar_edges = Vec::with_capacity(track.bars.len() + 1);
        let mut tick = 0i64;
        let mut x = 0.0f32;

        for bar in &track.bars {
            bar_edges.push(x);
            time_signatures.push((tick, bar.time_signature));
            x += padding;

            for entry in &bar.beats {
                let width = entry.duration as f32 * pixels_per_tick;
                let note = entry.note.map(|fretted| Note {
                    duration_ticks: entry.duration,
                    string: fretted.string,
                    fret: fretted.fret,
                    pitch: track.tuning[fretted.string as usize]
                        .saturating_add(fretted.fret)
                        .min(127),
                });
                beats.push(Beat::new(
                    tick,
                    SheetGraphics::beat_position(x, width),
                    note,
                    bar.time_signature,
                ));
                tick += entry.duration;
                x += width;
            }

            x += padding;
        }
        bar_edges.push(x);

        let width = x.ceil() as i32;
        let timeline = BeatTimeline::new(beats, tick, width, tempo)?;
        let audio = ScoreAudio::new(notes, track.channel, tempo, time_signatures, tick);
        let graphics = layout_graphics(&bar_edges, track.tuning.len(), layout);

        Ok(LoadedScore {
            audio,
            timeline,
            graphics,
        })
    }
}

/// Scheduled notes of one track
fn track_notes(track: &TrackEntry) -> Result<Vec<ScheduledNote>, LoadError> {
    let mut notes = Vec::new();
    let mut tick = 0i64;

    for bar in &track.bars {
        for entry in &bar.beats {
            if entry.duration <= 0 {
                return Err(LoadError::InvalidScore(format!(
                    "track '{}' has a beat of duration {}",
                    track.name, entry.duration
                )));
            }
            if let Some(fretted) = entry.note {
                let open = track.tuning.get(fretted.string as usize).ok_or_else(|| {
                    LoadError::InvalidScore(format!(
                        "track '{}' has no string {}",
                        track.name, fretted.string
                    ))
                })?;
                notes.push(ScheduledNote {
                    tick,
                    duration_ticks: entry.duration,
                    pitch: open.saturating_add(fretted.fret).min(127),
                    velocity: DEFAULT_VELOCITY,
                    channel: track.channel,
                });
            }
            tick += entry.duration;
        }
    }

    Ok(notes)
}

/// Group bars into sheet segments
fn layout_graphics(bar_edges: &[f32], string_count: usize, layout: &SheetLayout) -> SheetGraphics {
    let spacing = layout.staff_line_spacing * layout.scale;
    let staff_position = spacing.round() as i32;
    let staff_height = (spacing * (string_count.saturating_sub(1)) as f32).round() as i32;
    let height = (staff_position * 2 + staff_height) as u32;
    let staff_lines: Vec<u32> = (0..string_count)
        .map(|line| (staff_position as f32 + spacing * line as f32).round() as u32)
        .collect();

    let bar_count = bar_edges.len() - 1;
    let segments = (0..bar_count)
        .step_by(layout.bars_per_segment.max(1))
        .map(|first| {
            let last = (first + layout.bars_per_segment.max(1)).min(bar_count);
            let start = bar_edges[first].floor() as i32;
            let end = bar_edges[last].ceil() as i32;
            SheetSegment::new(start, (end - start) as u32, height, staff_lines.clone())
        })
        .collect();

    let width = bar_edges.last().map(|x| x.ceil() as i32).unwrap_or(0);
    SheetGraphics::new(width, staff_position, staff_height, segments)
}
