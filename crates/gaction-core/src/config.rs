use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BridgeError, Result};

/// Top-level configuration for the bridge.
///
/// Loaded from `~/.recast-gaction/config.toml` by default. The same file is
/// the backing store for the connector registry, so `[[connectors]]` may be
/// edited while the server runs and picked up on the next reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub connectors: Vec<BotConnection>,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            connectors = config.connectors.len(),
            "Configuration loaded from {}",
            path.display()
        );
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject connector sets that the registry could not index.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for connector in &self.connectors {
            if connector.recast_bot_token.trim().is_empty() {
                return Err(BridgeError::Config(
                    "connector is missing recast_bot_token".to_string(),
                ));
            }
            if !seen.insert(connector.recast_bot_token.as_str()) {
                return Err(BridgeError::Config(format!(
                    "duplicate recast_bot_token for client '{}'",
                    connector.gaction_client_id
                )));
            }
        }
        if self.backend.timeout_secs == 0 {
            return Err(BridgeError::Config(
                "backend.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum accepted webhook body size.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Dialog backend settings shared by every connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the Recast API.
    pub base_url: String,
    /// Per-request timeout. A timeout is handled like any other backend failure.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.recast.ai".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Configuration of one bot exposed to Google Assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConnection {
    /// Actions on Google client id. Tags the bot's log lines; inbound
    /// requests are not checked against it.
    pub gaction_client_id: String,
    /// Recast bot token. Also the lookup key of the connector.
    pub recast_bot_token: String,
    /// Log full backend payloads at debug level.
    pub debug: bool,
    /// Ask the user to move to a screen device when a card cannot be shown.
    pub auto_change_surface: bool,
    /// Insert a pause between merged text messages instead of a space.
    pub pause_between_messages: bool,
    /// Spoken when the backend fails, keyed by full locale (`fr-FR`).
    pub default_error_messages: BTreeMap<String, String>,
    pub voice: VoiceProfile,
}

impl BotConnection {
    /// Default error message for an exact locale match.
    pub fn default_error_message(&self, locale: &str) -> Option<&str> {
        self.default_error_messages.get(locale).map(String::as_str)
    }
}

/// Prosody and pause settings applied to every spoken string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceProfile {
    /// SSML pitch, e.g. `0st`.
    pub pitch: String,
    /// SSML rate, e.g. `100%`.
    pub rate: String,
    /// Pause after sentence-ending punctuation.
    pub long_pause_ms: u32,
    /// Pause after clause punctuation.
    pub short_pause_ms: u32,
    /// Pause between merged text messages.
    pub message_pause_ms: u32,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            pitch: "0st".to_string(),
            rate: "100%".to_string(),
            long_pause_ms: 400,
            short_pause_ms: 200,
            message_pause_ms: 1000,
        }
    }
}
