use std::fmt;

use tracing::{debug, info, warn};

use crate::rchain::credentials::Credentials;
use crate::rchain::error::ChatError;
use crate::rchain::message::{Role, Turn};
use crate::rchain::model::ModelSpec;
use crate::rchain::provider::ChatAdapter;
use crate::rchain::registry::ProviderRegistry;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and smart assistant.
Your answers are always clear and to the point.
If you are asked a technical question, you give code examples.
If you do not know the answer, you say so honestly.";

/// One conversation bound to one adapter and model.
///
/// History always starts with the system turn. Switching provider or model
/// starts a new conversation.
pub struct Session {
    registry: ProviderRegistry,
    credentials: Credentials,
    system_prompt: String,
    adapter: Box<dyn ChatAdapter>,
    spec: ModelSpec,
    history: Vec<Turn>,
}

impl Session {
    /// Resolves `provider_id` through `registry` and starts an empty conversation.
    pub fn open(
        registry: ProviderRegistry,
        credentials: Credentials,
        provider_id: &str,
        spec: ModelSpec,
    ) -> Result<Self, ChatError> {
        spec.validate()?;
        let adapter = registry.resolve(provider_id, credentials.key_for(provider_id))?;
        Ok(Self::bind(registry, credentials, Box::new(adapter), spec))
    }

    /// Binds an adapter built elsewhere. Later provider switches go through a
    /// default registry with no credentials.
    pub fn with_adapter(
        adapter: impl ChatAdapter + 'static,
        spec: ModelSpec,
    ) -> Result<Self, ChatError> {
        spec.validate()?;
        Ok(Self::bind(
            ProviderRegistry::default(),
            Credentials::default(),
            Box::new(adapter),
            spec,
        ))
    }

    fn bind(
        registry: ProviderRegistry,
        credentials: Credentials,
        adapter: Box<dyn ChatAdapter>,
        spec: ModelSpec,
    ) -> Self {
        let system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        Self {
            registry,
            credentials,
            history: vec![Turn::system(system_prompt.clone())],
            system_prompt,
            adapter,
            spec,
        }
    }

    /// Replaces the system prompt and starts a new conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self.reset_history();
        self
    }

    /// Binds a new adapter and model, then resets history to the system turn.
    ///
    /// On error the session keeps its previous adapter and history.
    pub fn select_provider(&mut self, provider_id: &str, model_name: &str) -> Result<(), ChatError> {
        let spec = ModelSpec {
            model: model_name.to_string(),
            ..self.spec.clone()
        };
        spec.validate()?;
        let adapter = self
            .registry
            .resolve(provider_id, self.credentials.key_for(provider_id))?;

        if !adapter.list_models().contains(&spec.model.as_str()) {
            warn!(
                provider = adapter.provider_id(),
                model = %spec.model,
                "model is not in the provider catalog"
            );
        }
        info!(provider = adapter.provider_id(), model = %spec.model, "starting new conversation");

        self.adapter = Box::new(adapter);
        self.spec = spec;
        self.reset_history();
        Ok(())
    }

    /// Changes generation parameters for later calls. History is kept.
    pub fn set_generation(
        &mut self,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<(), ChatError> {
        let spec = ModelSpec {
            temperature,
            max_tokens,
            ..self.spec.clone()
        };
        spec.validate()?;
        self.spec = spec;
        Ok(())
    }

    /// Appends the user turn, asks the adapter, appends and returns the reply.
    ///
    /// When the adapter fails the user turn stays in history unanswered.
    pub async fn send_user_message(&mut self, text: impl Into<String>) -> Result<Turn, ChatError> {
        self.history.push(Turn::user(text));
        self.complete_pending().await
    }

    /// Asks again for a reply to the trailing unanswered user turn.
    pub async fn resend(&mut self) -> Result<Turn, ChatError> {
        if self.history.last().map(Turn::role) != Some(Role::User) {
            return Err(ChatError::NothingToResend);
        }
        self.complete_pending().await
    }

    async fn complete_pending(&mut self) -> Result<Turn, ChatError> {
        debug!(
            provider = self.adapter.provider_id(),
            turns = self.history.len(),
            "requesting completion"
        );
        let reply = self.adapter.complete(&self.history, &self.spec).await?;
        self.history.push(reply.clone());
        Ok(reply)
    }

    fn reset_history(&mut self) {
        self.history.clear();
        self.history.push(Turn::system(self.system_prompt.clone()));
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn provider_id(&self) -> &str {
        self.adapter.provider_id()
    }

    pub fn model_spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Catalog of the bound adapter.
    pub fn models(&self) -> &'static [&'static str] {
        self.adapter.list_models()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.adapter.provider_id())
            .field("spec", &self.spec)
            .field("turns", &self.history.len())
            .finish()
    }
}
