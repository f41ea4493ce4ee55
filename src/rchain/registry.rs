use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::rchain::cerebras::ChatCerebras;
use crate::rchain::error::ChatError;
use crate::rchain::groq::ChatGroq;
use crate::rchain::provider::{Adapter, Provider, ProviderConfig};

/// Builds adapters from a provider id and an API key.
///
/// Holds only construction settings (shared HTTP client, endpoint overrides,
/// request timeout); resolving never changes it.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    client: reqwest::Client,
    endpoints: HashMap<Provider, String>,
    timeout: Option<Duration>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points one provider at a different chat-completions URL.
    pub fn with_endpoint(mut self, provider: Provider, url: impl Into<String>) -> Self {
        self.endpoints.insert(provider, url.into());
        self
    }

    /// Applies a per-request timeout to every adapter built afterwards.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Provider ids this registry can resolve.
    pub fn supported() -> &'static [Provider] {
        &Provider::ALL
    }

    /// Resolves a fresh adapter. The provider id is checked first, then the key,
    /// and nothing touches the network.
    pub fn resolve(&self, provider_id: &str, api_key: &str) -> Result<Adapter, ChatError> {
        let provider: Provider = provider_id.parse()?;

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ChatError::MissingCredential {
                provider,
                key_env: provider.api_key_env(),
            });
        }

        let config = ProviderConfig::new(provider, api_key.to_string());
        let endpoint = self
            .endpoints
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.endpoint().to_string());
        debug!(%provider, %endpoint, timeout = ?self.timeout, "building adapter");

        let client = self.client.clone();
        Ok(match provider {
            Provider::Groq => Adapter::Groq(ChatGroq::new(config, endpoint, client, self.timeout)),
            Provider::Cerebras => {
                Adapter::Cerebras(ChatCerebras::new(config, endpoint, client, self.timeout))
            }
        })
    }
}
