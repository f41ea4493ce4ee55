//! Provider-agnostic chat layer.
//!
//! Normalized turns go in, one assistant turn comes out; each backend's
//! request shape, roles and auth stay inside its adapter.

/// Cerebras raw chat-completions adapter.
pub mod cerebras;
pub(crate) mod chat_runtime;
/// Per-provider API keys supplied by the caller.
pub mod credentials;
pub mod error;
/// Groq chat-model adapter.
pub mod groq;
/// Conversation turns and roles.
pub mod message;
pub mod model;
/// Provider ids and the adapter contract.
pub mod provider;
/// Provider id to adapter resolution.
pub mod registry;
/// Conversation state and completion flow.
pub mod session;

pub use credentials::Credentials;
pub use error::{CallFailure, ChatError};
pub use message::{Role, Turn};
pub use model::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, ModelSpec};
pub use provider::{Adapter, ChatAdapter, Provider, ProviderConfig};
pub use registry::ProviderRegistry;
pub use session::{DEFAULT_SYSTEM_PROMPT, Session};
