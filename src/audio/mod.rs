// Audio output - Rendered blocks to the sound card

pub mod device;
pub mod format_conversion;
pub mod output;
pub mod parameters;

pub use device::{AudioOutputDevice, list_output_devices};
pub use output::{AudioOutputBridge, CHANNEL_COUNT, OutputLayout, OutputListener, SYNTH_BUFFER_SIZE};
pub use parameters::{AtomicF32, AtomicF64};

use thiserror::Error;

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid buffer layout: {0}")]
    Layout(String),

    #[error("An output listener is already connected")]
    AlreadyConnected,

    #[error("Output configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build the output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start the output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to start the render worker: {0}")]
    Worker(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
