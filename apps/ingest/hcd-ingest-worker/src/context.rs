//! Invocation context handed to the ingestion handler for each NATS message

use std::collections::HashMap;
use std::sync::Arc;

use domain_ingest::{ConfigKey, InvocationContext};

use crate::messaging::ReceivedMessage;

/// Context for one message: shared user config plus the message identity
#[derive(Debug, Clone)]
pub struct MessageContext {
    message_id: String,
    user_config: Arc<HashMap<ConfigKey, String>>,
}

impl MessageContext {
    /// Uses the publisher's message id when present, otherwise a fresh UUID
    pub fn for_message(
        message: &ReceivedMessage,
        user_config: Arc<HashMap<ConfigKey, String>>,
    ) -> Self {
        let message_id = message
            .message_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            message_id,
            user_config,
        }
    }
}

impl InvocationContext for MessageContext {
    fn get_config(&self, key: ConfigKey) -> Option<String> {
        self.user_config.get(&key).cloned()
    }

    fn invocation_id(&self) -> String {
        self.message_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_id: Option<&str>) -> ReceivedMessage {
        ReceivedMessage {
            subject: "ingest.hcd".to_string(),
            payload: b"{}".to_vec(),
            reply: None,
            message_id: message_id.map(str::to_string),
        }
    }

    #[test]
    fn test_uses_header_message_id() {
        let ctx = MessageContext::for_message(&message(Some("abc-1")), Arc::default());
        assert_eq!(ctx.invocation_id(), "abc-1");
    }

    #[test]
    fn test_generates_message_id() {
        let ctx = MessageContext::for_message(&message(None), Arc::default());
        assert!(uuid::Uuid::parse_str(&ctx.invocation_id()).is_ok());
    }

    #[test]
    fn test_reads_user_config() {
        let config = HashMap::from([(ConfigKey::Collection, "docs".to_string())]);
        let ctx = MessageContext::for_message(&message(None), Arc::new(config));
        assert_eq!(ctx.get_config(ConfigKey::Collection), Some("docs".to_string()));
        assert_eq!(ctx.get_config(ConfigKey::Token), None);
    }
}
