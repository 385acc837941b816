//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "SPYSPEAK_CONFIG";
const RELAY_URL_ENV: &str = "SPYSPEAK_RELAY_URL";

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub recognition: RecognitionConfig,
    pub speech: SpeechConfig,
    pub interface: InterfaceConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket address of the relay service
    pub url: String,
    pub connect_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Recogniser program and arguments; empty disables recognition
    pub command: Vec<String>,
    /// How long to wait for the transcript after recording stops
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// TTS program and arguments; empty shows replies on screen only
    pub command: Vec<String>,
    /// Pause between showing "Received" and speaking
    pub delay_ms: u64,
    /// Longest time a reply holds the screen before recording is offered again
    pub hold_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// Show the connect prompt and boot animation before the first cycle
    pub play_intro: bool,
    /// Let a key press cut the boot animation short
    pub skippable_boot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file; defaults to `client.log` next to the config file
    pub file: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/relay".to_string(),
            connect_attempts: 5,
            retry_delay_ms: 1_000,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            delay_ms: 300,
            hold_ms: 1_500,
        }
    }
}

impl Config {
    /// Load configuration from the config file, environment and defaults
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var(RELAY_URL_ENV) {
            config.relay.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Location of the config file: `$SPYSPEAK_CONFIG`, else
    /// `~/.config/spyspeak/client.toml`
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Some(Self::config_dir()?.join("client.toml"))
    }

    /// Where logs are written. The terminal belongs to the display, so
    /// logs never go to stdout or stderr while it is in use.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log.file {
            Some(path) => Some(path.clone()),
            None => Some(Self::config_dir()?.join("client.log")),
        }
    }

    fn config_dir() -> Option<PathBuf> {
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config").join("spyspeak"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.relay.url.starts_with("ws://") || self.relay.url.starts_with("wss://")) {
            bail!("relay url must start with ws:// or wss://, got {:?}", self.relay.url);
        }
        if self.relay.connect_attempts == 0 {
            bail!("relay.connect_attempts must be at least 1");
        }
        if self.recognition.timeout_ms == 0 {
            bail!("recognition.timeout_ms must be greater than zero");
        }
        if self.speech.hold_ms == 0 {
            bail!("speech.hold_ms must be greater than zero");
        }
        Ok(())
    }
}
