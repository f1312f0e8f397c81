// Score loading - Background score construction delivered in phases

pub mod library;
pub mod loader;

pub use library::*;
pub use loader::*;

use crate::score::TimelineError;
use thiserror::Error;

/// Score loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("A score is already being loaded")]
    Busy,

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("The score has no bass track with four strings")]
    NoEligibleTrack,

    #[error("The practised track has no beats")]
    EmptyScore,

    #[error("Invalid timeline: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Loading worker stopped before delivering the score")]
    WorkerPanicked,

    #[error("Failed to walk the score library: {0}")]
    Library(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

pub type LoadResult<T> = Result<T, LoadError>;
