use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rchain::error::CallFailure;
use crate::rchain::message::{Role, Turn};
use crate::rchain::provider::ChatAdapter;

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a, M: Serialize> {
    pub model: &'a str,
    pub messages: &'a [M],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

/// First choice of a chat-completions reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub role: Option<String>,
    pub content: String,
}

impl Reply {
    /// Normalizes the reply into an assistant turn whatever role the backend reported.
    pub(crate) fn into_turn<A: ChatAdapter + ?Sized>(self, adapter: &A) -> Turn {
        if let Some(role) = self.role.as_deref().map(|wire| adapter.normalize_role(wire)) {
            if role != Role::Assistant {
                debug!(provider = adapter.provider_id(), %role, "ignoring non-assistant reply role");
            }
        }
        Turn::assistant(self.content)
    }
}

/// Posts one chat-completions request. Exactly one attempt is made.
pub(crate) async fn send_chat_completion<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &T,
    timeout: Option<Duration>,
) -> Result<Reply, CallFailure> {
    let mut request = client.post(url).bearer_auth(api_key).json(payload);

    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CallFailure::Api { status, body });
    }

    let raw = response.text().await?;
    parse_reply(&raw)
}

pub(crate) fn parse_reply(raw: &str) -> Result<Reply, CallFailure> {
    let body: ChatCompletionResponse =
        serde_json::from_str(raw).map_err(|err| CallFailure::Malformed(err.to_string()))?;

    if let Some(usage) = &body.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "token usage"
        );
    }

    let message = body
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| CallFailure::Malformed("response contained no choices".to_string()))?;
    let content = message
        .content
        .filter(|content| !content.is_empty())
        .ok_or(CallFailure::EmptyResponse)?;

    Ok(Reply {
        role: message.role,
        content,
    })
}

pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_retryable_request_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
