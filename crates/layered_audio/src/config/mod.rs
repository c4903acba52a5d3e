//! Configuration system
//!
//! [`AudioSettings`] is the persisted audio configuration. At runtime it is
//! shared through [`SharedSettings`], which implements the [`ConfigStore`]
//! read by every music volume recomputation.

pub use serde::{Deserialize, Serialize};

use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// On-disk settings format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl SettingsFormat {
    /// Format for a path; the extension is matched case-insensitively
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Deserialize settings text
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, ConfigError> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
            Self::Ron => ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Serialize settings to human-editable text
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, ConfigError> {
        match self {
            Self::Toml => toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string())),
            Self::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// Settings that persist to TOML or RON files
///
/// Unknown extensions are rejected before the file is touched.
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Read settings from `path`
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = SettingsFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let settings = format.parse(&text)?;
        log::debug!("Read {:?} settings from {}", format, path.display());
        Ok(settings)
    }

    /// Write settings to `path`, replacing any existing file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = SettingsFormat::from_path(path)?.render(self)?;
        std::fs::write(path, text)?;
        log::debug!("Wrote settings to {}", path.display());
        Ok(())
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its valid range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Persisted audio settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Global music volume applied on top of every slot volume
    pub music_volume: f32,
    /// Whether music may reach the output at all
    pub music_enabled: bool,
    /// Seconds between sweeps of finished sound effects
    pub sweep_interval_secs: f32,
    /// Channel budget for backends that enforce one
    pub max_channels: usize,
    /// Volume used by `play_ui_sound`
    pub ui_sound_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: 1.0,
            music_enabled: true,
            sweep_interval_secs: 2.5,
            max_channels: 32,
            ui_sound_volume: 1.0,
        }
    }
}

impl AudioSettings {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.music_volume.is_finite() {
            return Err(ConfigError::Invalid {
                field: "music_volume",
                reason: format!("{} is not finite", self.music_volume),
            });
        }
        if !self.ui_sound_volume.is_finite() {
            return Err(ConfigError::Invalid {
                field: "ui_sound_volume",
                reason: format!("{} is not finite", self.ui_sound_volume),
            });
        }
        if !(self.sweep_interval_secs > 0.0) {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_secs",
                reason: format!("{} must be positive", self.sweep_interval_secs),
            });
        }
        if self.max_channels == 0 {
            return Err(ConfigError::Invalid {
                field: "max_channels",
                reason: "at least one channel is required".to_string(),
            });
        }
        Ok(())
    }
}

impl Config for AudioSettings {}

/// Source of the global music volume
pub trait ConfigStore {
    /// Current global music volume
    fn music_volume(&self) -> f32;
}

/// Single-threaded shared handle to the live [`AudioSettings`]
///
/// UI code keeps a clone, edits through [`SharedSettings::update`] and then
/// publishes `AudioEvent::ConfigChanged` so the orchestrator re-applies volumes.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Rc<RefCell<AudioSettings>>);

impl SharedSettings {
    /// Wrap settings for sharing
    pub fn new(settings: AudioSettings) -> Self {
        Self(Rc::new(RefCell::new(settings)))
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> AudioSettings {
        self.0.borrow().clone()
    }

    /// Mutate the settings in place
    pub fn update(&self, f: impl FnOnce(&mut AudioSettings)) {
        f(&mut self.0.borrow_mut());
    }

    /// Shorthand for updating the music volume
    pub fn set_music_volume(&self, volume: f32) {
        self.0.borrow_mut().music_volume = volume;
    }
}

impl ConfigStore for SharedSettings {
    fn music_volume(&self) -> f32 {
        self.0.borrow().music_volume
    }
}

/// Fixed music volume, handy for tools and tests
impl ConfigStore for f32 {
    fn music_volume(&self) -> f32 {
        *self
    }
}
