//! Multi-provider LLM chat with per-session conversation history.

pub mod commands;
pub mod config;
pub mod logging;
pub mod rchain;
