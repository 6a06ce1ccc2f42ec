//! Connector lookup by bot token.
//!
//! The registry caches one [`BotConnector`] per Recast token. The cache is
//! rebuilt from its [`ConnectorStore`] on a lookup miss and whenever
//! [`ConnectorRegistry::reload`] is called, so connectors added to the
//! backing store become reachable without a restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use gaction_bridge::{BotConnector, DialogBackend};
use gaction_core::{BotConnection, BridgeConfig, Result};
use tokio::sync::RwLock;

/// Source of truth for the configured bots.
#[async_trait]
pub trait ConnectorStore: Send + Sync {
    async fn load(&self) -> Result<Vec<BotConnection>>;
}

/// Reads `[[connectors]]` from the TOML configuration file.
pub struct FileConnectorStore {
    path: PathBuf,
}

impl FileConnectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConnectorStore for FileConnectorStore {
    async fn load(&self) -> Result<Vec<BotConnection>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let config = BridgeConfig::from_toml_str(&content)?;
        Ok(config.connectors)
    }
}

/// Fixed connector list.
pub struct StaticConnectorStore {
    connections: Vec<BotConnection>,
}

impl StaticConnectorStore {
    pub fn new(connections: Vec<BotConnection>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl ConnectorStore for StaticConnectorStore {
    async fn load(&self) -> Result<Vec<BotConnection>> {
        Ok(self.connections.clone())
    }
}

pub struct ConnectorRegistry {
    store: Arc<dyn ConnectorStore>,
    backend: Arc<dyn DialogBackend>,
    cache: RwLock<HashMap<String, Arc<BotConnector>>>,
}

impl ConnectorRegistry {
    /// Create an empty registry. Call [`reload`](Self::reload) to populate it
    /// eagerly; otherwise the first lookup does.
    pub fn new(store: Arc<dyn ConnectorStore>, backend: Arc<dyn DialogBackend>) -> Self {
        Self {
            store,
            backend,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the cache from the store. On failure the current cache is kept.
    pub async fn reload(&self) -> Result<usize> {
        let connections = self.store.load().await?;
        let rebuilt: HashMap<String, Arc<BotConnector>> = connections
            .into_iter()
            .map(|connection| {
                let token = connection.recast_bot_token.clone();
                (token, Arc::new(BotConnector::new(connection, Arc::clone(&self.backend))))
            })
            .collect();
        let count = rebuilt.len();
        *self.cache.write().await = rebuilt;
        tracing::info!(connectors = count, "Connector cache rebuilt");
        Ok(count)
    }

    /// Connector for `token`, reloading the store once on a miss.
    pub async fn lookup(&self, token: &str) -> Option<Arc<BotConnector>> {
        if let Some(connector) = self.cache.read().await.get(token) {
            return Some(Arc::clone(connector));
        }

        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "Failed to reload connectors on cache miss");
            return None;
        }
        self.cache.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
