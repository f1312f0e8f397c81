// Player - Playback synchronization of a practice session

pub mod components;
pub mod playback;
#[allow(clippy::module_inception)]
pub mod player;
pub mod state;

pub use components::{
    Controls, EngineBridge, InputMatcher, MatcherSettings, NoteCue, NoteCues,
};
pub use playback::PlaybackMode;
pub use player::Player;
pub use state::{
    Component, ComponentId, MAX_SPEED, MIN_SPEED, SPEED_EPSILON, SharedState, StateHandle,
    TransportState,
};
