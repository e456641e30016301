//! Per-invocation capabilities supplied by the host

use std::collections::HashMap;

use tracing::Level;

use crate::error::{IngestError, IngestResult};
use crate::models::DEFAULT_NAMESPACE;

/// Configuration keys the ingestion core reads from its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Embedding provider credential
    ApiKey,
    /// Data API endpoint
    Endpoint,
    /// Data API token
    Token,
    /// Target collection name
    Collection,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::ApiKey,
        ConfigKey::Endpoint,
        ConfigKey::Token,
        ConfigKey::Collection,
    ];

    /// Key name used in host user configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "api_key",
            ConfigKey::Endpoint => "hcd_endpoint",
            ConfigKey::Token => "hcd_token",
            ConfigKey::Collection => "collection",
        }
    }
}

/// Read-only context for one handler invocation
///
/// The host builds one per message. The handler never mutates it.
pub trait InvocationContext: Send + Sync {
    /// Value of a user configuration key, if the host has one
    fn get_config(&self, key: ConfigKey) -> Option<String>;

    /// Identifier of the message being processed
    fn invocation_id(&self) -> String;

    /// Emit a log line on behalf of the handler
    fn log(&self, level: Level, message: &str) {
        let invocation_id = self.invocation_id();
        match level {
            Level::ERROR => tracing::error!(%invocation_id, "{}", message),
            Level::WARN => tracing::warn!(%invocation_id, "{}", message),
            Level::INFO => tracing::info!(%invocation_id, "{}", message),
            Level::DEBUG => tracing::debug!(%invocation_id, "{}", message),
            _ => tracing::trace!(%invocation_id, "{}", message),
        }
    }
}

/// Map-backed [`InvocationContext`]
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    invocation_id: String,
    config: HashMap<ConfigKey, String>,
}

impl StaticContext {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.config.insert(key, value.into());
        self
    }
}

impl InvocationContext for StaticContext {
    fn get_config(&self, key: ConfigKey) -> Option<String> {
        self.config.get(&key).cloned()
    }

    fn invocation_id(&self) -> String {
        self.invocation_id.clone()
    }
}

/// Client settings resolved from a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_key: String,
    pub endpoint: String,
    pub token: String,
    pub collection: String,
    pub namespace: String,
}

impl ClientSettings {
    /// Resolve every required key; a missing or blank one is a client init error
    pub fn from_context(ctx: &dyn InvocationContext) -> IngestResult<Self> {
        let required = |key: ConfigKey| {
            ctx.get_config(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    IngestError::ClientInit(format!(
                        "user config `{}` is not set",
                        key.as_str()
                    ))
                })
        };

        Ok(Self {
            api_key: required(ConfigKey::ApiKey)?,
            endpoint: required(ConfigKey::Endpoint)?,
            token: required(ConfigKey::Token)?,
            collection: required(ConfigKey::Collection)?,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }
}
