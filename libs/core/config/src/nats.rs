use crate::{env_or_default, env_optional, ConfigError, FromEnv};

/// NATS connection configuration
#[derive(Clone, Debug)]
pub struct NatsConfig {
    pub url: String,
    /// Connection name reported to the server
    pub client_name: Option<String>,
}

impl NatsConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client_name: None,
        }
    }

    pub fn with_client_name(mut self, name: String) -> Self {
        self.client_name = Some(name);
        self
    }
}

impl FromEnv for NatsConfig {
    /// NATS_URL defaults to a local server
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("NATS_URL", "nats://localhost:4222"),
            client_name: env_optional("NATS_CLIENT_NAME"),
        })
    }
}
