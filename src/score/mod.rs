// Score module - Data produced once per loaded score
// Beats, timeline, renderable audio and sheet graphics

pub mod audio;
pub mod beat;
pub mod document;
pub mod graphics;
pub mod timeline;

pub use audio::{ScheduledNote, ScoreAudio};
pub use beat::{Beat, Note, Tempo, TICKS_PER_QUARTER, TimeSignature};
pub use document::{LoadedScore, ScoreDocument, SheetLayout};
pub use graphics::{SheetGraphics, SheetSegment};
pub use timeline::{BeatTimeline, TimelineError};
