use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read-only provider id to API key map, shared cheaply between sessions.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: Arc<HashMap<String, String>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key for `provider_id`. Blank keys are ignored.
    pub fn with_key(mut self, provider_id: &str, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        if !api_key.trim().is_empty() {
            Arc::make_mut(&mut self.keys).insert(provider_id.trim().to_ascii_lowercase(), api_key);
        }
        self
    }

    /// Key for `provider_id`, or an empty string when none was supplied.
    pub fn key_for(&self, provider_id: &str) -> &str {
        self.keys
            .get(&provider_id.trim().to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        !self.key_for(provider_id).is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers = self.keys.keys().collect::<Vec<_>>();
        providers.sort();
        f.debug_struct("Credentials")
            .field("providers", &providers)
            .finish()
    }
}
