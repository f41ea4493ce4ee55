use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use crate::rchain::chat_runtime::{ChatCompletionRequest, send_chat_completion};
use crate::rchain::error::ChatError;
use crate::rchain::message::{Role, Turn};
use crate::rchain::model::ModelSpec;
use crate::rchain::provider::{ChatAdapter, Provider, ProviderConfig};

/// Inserted when the history does not open with a system message.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant.";

/// Chat-model message type to Cerebras role.
const ROLE_TABLE: [(&str, &str); 3] = [
    ("human", "user"),
    ("ai", "assistant"),
    ("system", "system"),
];

/// Translates a chat-model message type into a Cerebras role; unknown types become `user`.
pub fn translate_role(message_type: &str) -> &'static str {
    ROLE_TABLE
        .iter()
        .find(|(kind, _)| *kind == message_type)
        .map(|(_, role)| *role)
        .unwrap_or("user")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CerebrasMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn to_cerebras_messages(history: &[Turn]) -> Vec<CerebrasMessage<'_>> {
    let mut messages = history
        .iter()
        .map(|turn| CerebrasMessage {
            role: translate_role(turn.role().message_type()),
            content: turn.content(),
        })
        .collect::<Vec<_>>();

    if messages
        .first()
        .is_none_or(|message| message.role != "system")
    {
        messages.insert(
            0,
            CerebrasMessage {
                role: "system",
                content: DEFAULT_SYSTEM_MESSAGE,
            },
        );
    }
    messages
}

/// Cerebras raw chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatCerebras {
    config: ProviderConfig,
    endpoint: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl ChatCerebras {
    pub(crate) fn new(
        config: ProviderConfig,
        endpoint: impl Into<String>,
        client: reqwest::Client,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            config,
            endpoint: endpoint.into(),
            timeout,
            client,
        }
    }
}

#[async_trait]
impl ChatAdapter for ChatCerebras {
    fn provider_id(&self) -> &str {
        Provider::Cerebras.as_str()
    }

    fn list_models(&self) -> &'static [&'static str] {
        Provider::Cerebras.models()
    }

    fn wire_role(&self, role: Role) -> &'static str {
        translate_role(role.message_type())
    }

    fn normalize_role(&self, wire: &str) -> Role {
        let message_type = ROLE_TABLE
            .iter()
            .find(|(_, role)| *role == wire)
            .map(|(kind, _)| *kind);
        match message_type {
            Some("system") => Role::System,
            Some("ai") => Role::Assistant,
            _ => Role::User,
        }
    }

    async fn complete(&self, history: &[Turn], spec: &ModelSpec) -> Result<Turn, ChatError> {
        let messages = to_cerebras_messages(history);
        debug!(model = %spec.model, ?messages, "messages being sent to cerebras");

        let payload = ChatCompletionRequest {
            model: &spec.model,
            messages: &messages,
            temperature: spec.effective_temperature(),
            max_tokens: spec.effective_max_tokens(),
        };

        let reply = send_chat_completion(
            &self.client,
            &self.endpoint,
            self.config.api_key(),
            &payload,
            self.timeout,
        )
        .await
        .map_err(|failure| {
            error!(provider = "cerebras", error = %failure, "error in cerebras API call");
            ChatError::call(self.provider_id(), failure)
        })?;

        Ok(reply.into_turn(self))
    }
}
