use serde::Serialize;

use crate::rchain::error::ChatError;

/// Temperature used when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Completion budget used when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Concrete model plus generation parameters for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ModelSpec {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Rejects out-of-range generation parameters before anything is dispatched.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.model.trim().is_empty() {
            return Err(ChatError::InvalidModelSpec(
                "model name must not be empty".to_string(),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(ChatError::InvalidModelSpec(format!(
                    "temperature {temperature} is outside [0.0, 1.0]"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ChatError::InvalidModelSpec(
                "max_tokens must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}
