use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::rchain::chat_runtime::{ChatCompletionRequest, send_chat_completion};
use crate::rchain::error::ChatError;
use crate::rchain::message::Turn;
use crate::rchain::model::ModelSpec;
use crate::rchain::provider::{ChatAdapter, Provider, ProviderConfig};

/// Groq chat model. Normalized turns are already in Groq's message schema,
/// so history is sent as-is.
#[derive(Debug, Clone)]
pub struct ChatGroq {
    config: ProviderConfig,
    endpoint: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl ChatGroq {
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
impl ChatAdapter for ChatGroq {
    fn provider_id(&self) -> &str {
        Provider::Groq.as_str()
    }

    fn list_models(&self) -> &'static [&'static str] {
        Provider::Groq.models()
    }

    async fn complete(&self, history: &[Turn], spec: &ModelSpec) -> Result<Turn, ChatError> {
        let payload = ChatCompletionRequest {
            model: &spec.model,
            messages: history,
            temperature: spec.effective_temperature(),
            max_tokens: spec.effective_max_tokens(),
        };
        debug!(model = %spec.model, messages = history.len(), "sending groq chat completion");

        let reply = send_chat_completion(
            &self.client,
            &self.endpoint,
            self.config.api_key(),
            &payload,
            self.timeout,
        )
        .await
        .map_err(|failure| {
            warn!(provider = "groq", error = %failure, "chat completion failed");
            ChatError::call(self.provider_id(), failure)
        })?;

        Ok(reply.into_turn(self))
    }
}
