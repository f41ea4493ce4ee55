use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::rchain::cerebras::ChatCerebras;
use crate::rchain::error::ChatError;
use crate::rchain::groq::ChatGroq;
use crate::rchain::message::{Role, Turn};
use crate::rchain::model::ModelSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Groq,
    Cerebras,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Groq, Provider::Cerebras];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Cerebras => "cerebras",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Self::Cerebras => "https://api.cerebras.ai/v1/chat/completions",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
        }
    }

    /// Static model catalog, in display order.
    pub fn models(self) -> &'static [&'static str] {
        match self {
            Self::Groq => &["mixtral-8x7b-32768", "llama-3.1-70b-versatile"],
            Self::Cerebras => &["llama3.1-8b", "llama3.1-70b"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "cerebras" => Ok(Self::Cerebras),
            _ => Err(ChatError::UnknownProvider(value.to_string())),
        }
    }
}

/// Validated credentials for one backend. Only the registry builds these.
#[derive(Clone)]
pub struct ProviderConfig {
    provider: Provider,
    api_key: String,
}

impl ProviderConfig {
    pub(crate) fn new(provider: Provider, api_key: String) -> Self {
        Self { provider, api_key }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Uniform chat-completion contract implemented once per backend.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Static catalog; never empty for a real backend.
    fn list_models(&self) -> &'static [&'static str];

    /// Role name sent on the wire for a normalized role.
    fn wire_role(&self, role: Role) -> &'static str {
        role.as_str()
    }

    /// Normalized role for a wire role name. Unknown names become [`Role::User`].
    fn normalize_role(&self, wire: &str) -> Role {
        match wire {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }

    /// Sends the full history and returns the assistant reply.
    async fn complete(&self, history: &[Turn], spec: &ModelSpec) -> Result<Turn, ChatError>;
}

/// Adapter built by the registry, one variant per supported backend.
#[derive(Debug, Clone)]
pub enum Adapter {
    Groq(ChatGroq),
    Cerebras(ChatCerebras),
}

#[async_trait]
impl ChatAdapter for Adapter {
    fn provider_id(&self) -> &str {
        match self {
            Self::Groq(chat) => chat.provider_id(),
            Self::Cerebras(chat) => chat.provider_id(),
        }
    }

    fn list_models(&self) -> &'static [&'static str] {
        match self {
            Self::Groq(chat) => chat.list_models(),
            Self::Cerebras(chat) => chat.list_models(),
        }
    }

    fn wire_role(&self, role: Role) -> &'static str {
        match self {
            Self::Groq(chat) => chat.wire_role(role),
            Self::Cerebras(chat) => chat.wire_role(role),
        }
    }

    fn normalize_role(&self, wire: &str) -> Role {
        match self {
            Self::Groq(chat) => chat.normalize_role(wire),
            Self::Cerebras(chat) => chat.normalize_role(wire),
        }
    }

    async fn complete(&self, history: &[Turn], spec: &ModelSpec) -> Result<Turn, ChatError> {
        match self {
            Self::Groq(chat) => chat.complete(history, spec).await,
            Self::Cerebras(chat) => chat.complete(history, spec).await,
        }
    }
}
