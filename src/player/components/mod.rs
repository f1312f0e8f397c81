// Player components - Participants of the transport broadcast

pub mod controls;
pub mod cues;
pub mod engine_bridge;
pub mod input_matcher;

pub use controls::Controls;
pub use cues::{NoteCue, NoteCues};
pub use engine_bridge::EngineBridge;
pub use input_matcher::{InputMatcher, MatcherSettings};
