// Playback mode of the transport

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Paused,
    /// One bar of clicks before the score plays
    CountingIn,
    Playing,
    /// The user is scrolling the sheet
    Seeking,
}

impl PlaybackMode {
    /// True when the render engine should be producing sound
    pub fn is_running(self) -> bool {
        matches!(self, PlaybackMode::Playing | PlaybackMode::CountingIn)
    }

    /// The play/pause toggle only acts in these modes
    pub fn accepts_toggle(self) -> bool {
        matches!(self, PlaybackMode::Playing | PlaybackMode::Paused)
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackMode::Paused => "paused",
            PlaybackMode::CountingIn => "counting in",
            PlaybackMode::Playing => "playing",
            PlaybackMode::Seeking => "seeking",
        };
        f.write_str(name)
    }
}
