// Synthesis - Render engine interface and the built-in tone renderer

pub mod click;
pub mod engine;
pub mod tone;
pub mod voice;

pub use engine::RenderEngine;
pub use tone::ToneRenderer;
