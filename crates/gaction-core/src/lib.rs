pub mod config;
pub mod error;

pub use config::{BackendConfig, BotConnection, BridgeConfig, LoggingConfig, ServerConfig, VoiceProfile};
pub use error::{BridgeError, Result};
