//! Configuration for the HCD ingest worker

use std::collections::HashMap;

use core_config::nats::NatsConfig;
use core_config::{
    ConfigError, Environment, FromEnv, env_optional, env_or_default, env_parse_or,
};
use domain_ingest::{ConfigKey, EmbeddingFailurePolicy};

/// Environment variable backing each user configuration key
const USER_CONFIG_VARS: [(ConfigKey, &str); 4] = [
    (ConfigKey::ApiKey, "OPENAI_API_KEY"),
    (ConfigKey::Endpoint, "HCD_ENDPOINT"),
    (ConfigKey::Token, "HCD_TOKEN"),
    (ConfigKey::Collection, "HCD_COLLECTION"),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub nats: NatsConfig,

    /// Subject events are consumed from
    pub input_subject: String,
    /// Subject enriched events are published to (unless the message has a reply subject)
    pub output_subject: Option<String>,
    /// Subject failed events are published to
    pub dlq_subject: Option<String>,
    pub queue_group: String,

    /// Worker settings
    pub worker_id: String,
    pub max_concurrent_handlers: usize,
    pub embedding_failure: EmbeddingFailurePolicy,

    /// Per-invocation user configuration handed to the ingestion handler
    pub user_config: HashMap<ConfigKey, String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let worker_id = env_optional("WORKER_ID").unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            format!("worker-{}", &id[..8])
        });

        let user_config = USER_CONFIG_VARS
            .iter()
            .filter_map(|(key, var)| env_optional(var).map(|value| (*key, value)))
            .collect();

        Ok(Self {
            environment: Environment::from_env(),
            nats: NatsConfig::from_env()?,
            input_subject: env_or_default("INGEST_INPUT_SUBJECT", "ingest.hcd"),
            output_subject: env_optional("INGEST_OUTPUT_SUBJECT"),
            dlq_subject: env_optional("INGEST_DLQ_SUBJECT"),
            queue_group: env_or_default("INGEST_QUEUE_GROUP", "hcd-ingest-workers"),
            worker_id,
            max_concurrent_handlers: env_parse_or("MAX_CONCURRENT_HANDLERS", 10usize)?.max(1),
            embedding_failure: parse_embedding_failure(&env_or_default(
                "INGEST_EMBEDDING_FAILURE",
                "continue",
            ))?,
            user_config,
        })
    }

    /// User configuration keys that are not set
    pub fn missing_user_config(&self) -> Vec<&'static str> {
        USER_CONFIG_VARS
            .iter()
            .filter(|(key, _)| !self.user_config.contains_key(key))
            .map(|(_, var)| *var)
            .collect()
    }
}

fn parse_embedding_failure(raw: &str) -> Result<EmbeddingFailurePolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "continue" => Ok(EmbeddingFailurePolicy::Continue),
        "fail" => Ok(EmbeddingFailurePolicy::Fail),
        other => Err(ConfigError::ParseError {
            key: "INGEST_EMBEDDING_FAILURE".to_string(),
            details: format!("expected `continue` or `fail`, got `{}`", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: [&str; 14] = [
        "APP_ENV",
        "NATS_URL",
        "NATS_CLIENT_NAME",
        "INGEST_INPUT_SUBJECT",
        "INGEST_OUTPUT_SUBJECT",
        "INGEST_DLQ_SUBJECT",
        "INGEST_QUEUE_GROUP",
        "WORKER_ID",
        "MAX_CONCURRENT_HANDLERS",
        "INGEST_EMBEDDING_FAILURE",
        "OPENAI_API_KEY",
        "HCD_ENDPOINT",
        "HCD_TOKEN",
        "HCD_COLLECTION",
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(ALL_VARS, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.nats.url, "nats://localhost:4222");
            assert_eq!(config.input_subject, "ingest.hcd");
            assert!(config.output_subject.is_none());
            assert!(config.dlq_subject.is_none());
            assert_eq!(config.queue_group, "hcd-ingest-workers");
            assert!(config.worker_id.starts_with("worker-"));
            assert_eq!(config.max_concurrent_handlers, 10);
            assert_eq!(config.embedding_failure, EmbeddingFailurePolicy::Continue);
            assert!(config.user_config.is_empty());
            assert_eq!(config.missing_user_config().len(), 4);
        });
    }

    #[test]
    fn test_user_config_from_env() {
        temp_env::with_vars(
            [
                ("OPENAI_API_KEY", Some("sk-test")),
                ("HCD_ENDPOINT", Some("http://hcd:8181")),
                ("HCD_TOKEN", Some("Cassandra:abc:def")),
                ("HCD_COLLECTION", Some("docs")),
                ("INGEST_OUTPUT_SUBJECT", Some("ingest.hcd.out")),
                ("INGEST_EMBEDDING_FAILURE", Some("FAIL")),
                ("MAX_CONCURRENT_HANDLERS", Some("0")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.user_config.get(&ConfigKey::Collection).map(String::as_str),
                    Some("docs")
                );
                assert_eq!(
                    config.user_config.get(&ConfigKey::Token).map(String::as_str),
                    Some("Cassandra:abc:def")
                );
                assert!(config.missing_user_config().is_empty());
                assert_eq!(config.output_subject.as_deref(), Some("ingest.hcd.out"));
                assert_eq!(config.embedding_failure, EmbeddingFailurePolicy::Fail);
                assert_eq!(config.max_concurrent_handlers, 1);
            },
        );
    }

    #[test]
    fn test_invalid_concurrency() {
        temp_env::with_var("MAX_CONCURRENT_HANDLERS", Some("lots"), || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("MAX_CONCURRENT_HANDLERS"));
        });
    }

    #[test]
    fn test_invalid_embedding_failure_policy() {
        let err = parse_embedding_failure("retry").unwrap_err();
        assert!(err.to_string().contains("INGEST_EMBEDDING_FAILURE"));
    }
}
