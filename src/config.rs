// Configuration - Player settings persisted as RON in the user's config folder

use crate::audio::{AudioResult, CHANNEL_COUNT, OutputLayout, SYNTH_BUFFER_SIZE};
use crate::player::MatcherSettings;
use crate::score::SheetLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FOLDER: &str = "practice_player";
const CONFIG_FILE: &str = "config.ron";
const DATA_FOLDER: &str = "PracticePlayerData";
const SCORES_FOLDER: &str = "Scores";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings of a practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Seconds a played note stays active after its last event
    pub note_buffering_duration: f64,
    pub distinguish_octaves: bool,
    /// Seconds of lateness tolerated before a note counts as missed
    pub note_delay: f64,
    /// Seconds around a note in which a played pitch counts as a hit
    pub note_detection_radius: f64,
    /// Quarters shown ahead of the cursor by the note cues
    pub look_ahead_beats: u32,
    /// Interleaved samples per rendered block
    pub audio_buffer_size: usize,
    /// Frames the audio device asks for at once
    pub block_frames: usize,
    pub channels: usize,
    pub update_rate_hz: u32,
    /// MIDI input to connect to, the first available port otherwise
    pub midi_port: Option<String>,
    pub scores_folder: PathBuf,
    pub sheet_scale: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            note_buffering_duration: 0.3,
            distinguish_octaves: true,
            note_delay: 0.1,
            note_detection_radius: 0.4,
            look_ahead_beats: 4,
            audio_buffer_size: SYNTH_BUFFER_SIZE,
            block_frames: 512,
            channels: CHANNEL_COUNT,
            update_rate_hz: 60,
            midi_port: None,
            scores_folder: default_scores_folder(),
            sheet_scale: SheetLayout::default().scale,
        }
    }
}

fn default_scores_folder() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_FOLDER)
        .join(SCORES_FOLDER)
}

/// Location of the config file, `None` when the platform has no config folder
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FOLDER).join(CONFIG_FILE))
}

impl PlayerConfig {
    /// Load from the default location, defaults when no file exists yet
    pub fn load() -> ConfigResult<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config: Self = ron::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> ConfigResult<()> {
        let path = config_path()
            .ok_or_else(|| ConfigError::Invalid("no config folder on this platform".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let durations = [
            ("note_buffering_duration", self.note_buffering_duration),
            ("note_delay", self.note_delay),
            ("note_detection_radius", self.note_detection_radius),
        ];
        for (name, value) in durations {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0 and 1 second, got {}",
                    name, value
                )));
            }
        }

        if !(1..=16).contains(&self.look_ahead_beats) {
            return Err(ConfigError::Invalid(format!(
                "look_ahead_beats must be within 1 and 16, got {}",
                self.look_ahead_beats
            )));
        }
        if self.update_rate_hz == 0 {
            return Err(ConfigError::Invalid("update_rate_hz must not be 0".into()));
        }
        if self.sheet_scale.is_nan() || self.sheet_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sheet_scale must be positive, got {}",
                self.sheet_scale
            )));
        }

        self.layout()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn matcher_settings(&self) -> MatcherSettings {
        MatcherSettings {
            note_delay: self.note_delay,
            detection_radius: self.note_detection_radius,
            distinguish_octaves: self.distinguish_octaves,
        }
    }

    pub fn layout(&self) -> AudioResult<OutputLayout> {
        OutputLayout::new(self.audio_buffer_size, self.block_frames, self.channels)
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            scale: self.sheet_scale,
            ..SheetLayout::default()
        }
    }
}
