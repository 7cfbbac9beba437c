//! Configuration system for retrohost

use crate::error::{HostError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub input: InputConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
}

/// General host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// New sessions go straight from `Created` to `Paused`, with audio held
    /// until the first resume
    pub start_paused: bool,
    /// Two-letter language code handed to the core
    pub language: String,
    /// Display refresh rate handed to the core, in Hz
    pub screen_refresh_rate: f32,
}

/// Video settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub backend: VideoBackendKind,
    pub shader: ShaderSelection,
    pub integer_scaling: bool,
}

/// Video backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum VideoBackendKind {
    #[default]
    Null,
}

/// Post-processing shader applied by the render surface binding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub enum ShaderSelection {
    #[default]
    Default,
    Crt,
    Lcd,
    Sharp,
}

impl ShaderSelection {
    /// Numeric value used on the binding surface
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Crt => 1,
            Self::Lcd => 2,
            Self::Sharp => 3,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Default),
            1 => Some(Self::Crt),
            2 => Some(Self::Lcd),
            3 => Some(Self::Sharp),
            _ => None,
        }
    }
}

/// Audio settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub backend: AudioBackendKind,
    pub enable: bool,
    pub volume: f32,
    pub buffer_duration_ms: u32,
}

/// Audio backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum AudioBackendKind {
    /// Device output when available, buffered otherwise
    #[default]
    Auto,
    Null,
    Buffered,
}

/// Input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Number of logical controller slots
    pub max_ports: usize,
    /// Hat-axis magnitude at which a d-pad direction counts as pressed
    pub dpad_threshold: f32,
    /// Analog magnitude below which a stick reads as centered
    pub analog_deadzone: f32,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub system: PathBuf,
    pub saves: PathBuf,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_paused: false,
            language: "en".to_string(),
            screen_refresh_rate: 60.0,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            backend: VideoBackendKind::default(),
            shader: ShaderSelection::default(),
            integer_scaling: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: AudioBackendKind::default(),
            enable: true,
            volume: 1.0,
            buffer_duration_ms: 100,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_ports: 4,
            dpad_threshold: 0.5,
            analog_deadzone: 0.0,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrohost");

        Self {
            system: base.join("system"),
            saves: base.join("saves"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or create it if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrohost")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.start_paused);
        assert_eq!(config.general.language, "en");
        assert_eq!(config.input.max_ports, 4);
        assert_eq!(config.video.shader, ShaderSelection::Default);
        assert!(config.audio.enable);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.video.shader = ShaderSelection::Lcd;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.video.shader, ShaderSelection::Lcd);
        assert_eq!(parsed.input.max_ports, config.input.max_ports);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[input]\nmax_ports = 2\n").unwrap();
        assert_eq!(parsed.input.max_ports, 2);
        assert_eq!(parsed.input.dpad_threshold, 0.5);
        assert_eq!(parsed.general.screen_refresh_rate, 60.0);
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.general.language = "it".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.general.language, "it");
    }

    #[test]
    fn test_shader_raw_values() {
        for raw in 0..4 {
            let shader = ShaderSelection::from_raw(raw).unwrap();
            assert_eq!(shader.as_raw(), raw);
        }
        assert!(ShaderSelection::from_raw(4).is_none());
        assert!(ShaderSelection::from_raw(-1).is_none());
    }
}
