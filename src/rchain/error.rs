use reqwest::StatusCode;
use thiserror::Error;

use crate::rchain::chat_runtime::{is_retryable_request_error, is_retryable_status};
use crate::rchain::provider::Provider;

/// Errors surfaced by the provider layer and the conversation session.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Required secret absent or blank.
    #[error("API key for {provider} not found: set {key_env}")]
    MissingCredential {
        provider: Provider,
        key_env: &'static str,
    },
    #[error("Unknown provider '{0}'. Supported values: groq, cerebras.")]
    UnknownProvider(String),
    #[error("Invalid model configuration: {0}")]
    InvalidModelSpec(String),
    /// Backend invocation failed; never retried by this crate.
    #[error("{provider} call failed: {source}")]
    ProviderCall {
        provider: String,
        #[source]
        source: CallFailure,
    },
    #[error("Nothing to resend: the conversation does not end with an unanswered user turn")]
    NothingToResend,
}

impl ChatError {
    pub(crate) fn call(provider: impl Into<String>, source: CallFailure) -> Self {
        Self::ProviderCall {
            provider: provider.into(),
            source,
        }
    }

    /// Whether a caller retry policy may reasonably try the same call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderCall { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Underlying cause of a failed backend call.
#[derive(Debug, Error)]
pub enum CallFailure {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response did not contain message content")]
    EmptyResponse,
}

impl CallFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(err) => is_retryable_request_error(err),
            Self::Api { status, .. } => is_retryable_status(*status),
            Self::Malformed(_) | Self::EmptyResponse => false,
        }
    }
}
