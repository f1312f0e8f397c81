// Practice Player - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod loading;
pub mod midi;
pub mod player;
pub mod score;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::{AudioOutputBridge, AudioOutputDevice, OutputLayout};
pub use config::PlayerConfig;
pub use loading::{DocumentSource, LoadError, Loader, LoadingListener, ScoreLibrary};
pub use player::{PlaybackMode, Player, TransportState};
pub use score::{Beat, BeatTimeline, ScoreAudio};
pub use synth::{RenderEngine, ToneRenderer};
