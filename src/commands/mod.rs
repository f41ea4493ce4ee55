//! Command-line front ends over [`crate::rchain::Session`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::config::{ProfileConfig, env_parse, env_string, load_profile};
use crate::logging::Verbosity;
use crate::rchain::{ModelSpec, Provider, ProviderRegistry};

pub mod ask;
pub mod chat;
pub mod config;
pub mod models;

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("MC_GIT_SHA"),
    "\nbuilt: ",
    env!("MC_BUILD_TS")
);

pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Flags shared by every command that opens a conversation.
#[derive(Debug, Args, Clone, Default)]
pub struct SessionArgs {
    #[arg(long, help = "Provider id (groq, cerebras)")]
    pub provider: Option<String>,
    #[arg(long, help = "Model name within the provider")]
    pub model: Option<String>,
    #[arg(long, help = "Named profile from the config file")]
    pub profile: Option<String>,
    #[arg(long, help = "System prompt opening the conversation")]
    pub system: Option<String>,
    #[arg(long, help = "Sampling temperature in [0.0, 1.0]")]
    pub temperature: Option<f32>,
    #[arg(long, help = "Maximum tokens in each reply")]
    pub max_tokens: Option<u32>,
    #[arg(long, value_name = "SECS", help = "Per-request timeout")]
    pub timeout: Option<u64>,
    #[arg(long, short, help = "Log request details to stderr")]
    pub verbose: bool,
    #[arg(long, short, help = "Only print the answer and fatal errors")]
    pub quiet: bool,
}

impl SessionArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err("Supported values: text, json.".to_string()),
        }
    }
}

/// Settings after layering CLI flags over env vars over the selected profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: Provider,
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub output: OutputMode,
}

impl Settings {
    pub fn resolve(args: &SessionArgs) -> Result<Self> {
        let profile = match &args.profile {
            Some(name) => load_profile(name)?,
            None => ProfileConfig::default(),
        };

        let provider = match &args.provider {
            Some(id) => id.parse::<Provider>()?,
            None => match env_parse::<Provider>("MC_PROVIDER")? {
                Some(provider) => provider,
                None => profile
                    .provider
                    .as_deref()
                    .map(str::parse::<Provider>)
                    .transpose()?
                    .unwrap_or(Provider::Groq),
            },
        };

        Ok(Self {
            provider,
            model: args
                .model
                .clone()
                .or_else(|| env_string("MC_MODEL"))
                .or(profile.model),
            system: args
                .system
                .clone()
                .or_else(|| env_string("MC_SYSTEM"))
                .or(profile.system),
            temperature: layer(args.temperature, env_parse("MC_TEMPERATURE")?, profile.temperature),
            max_tokens: layer(args.max_tokens, env_parse("MC_MAX_TOKENS")?, profile.max_tokens),
            timeout_secs: layer(args.timeout, env_parse("MC_TIMEOUT")?, profile.timeout),
            retries: layer(None, env_parse("MC_RETRIES")?, profile.retries).unwrap_or(0),
            retry_delay_ms: layer(None, env_parse("MC_RETRY_DELAY")?, profile.retry_delay)
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            output: layer(
                None,
                env_parse::<OutputMode>("MC_OUTPUT")?,
                profile.output.as_deref().and_then(|value| value.parse().ok()),
            )
            .unwrap_or_default(),
        })
    }

    /// Model spec for `model` carrying the resolved generation parameters.
    pub fn model_spec(&self, model: impl Into<String>) -> ModelSpec {
        ModelSpec {
            model: model.into(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn registry(&self) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        match self.timeout_secs {
            Some(secs) => registry.with_timeout(Duration::from_secs(secs)),
            None => registry,
        }
    }

    pub fn require_model(&self) -> Result<String> {
        self.model
            .clone()
            .context("No model provided. Use --model or set MC_MODEL.")
    }
}

fn layer<T>(cli: Option<T>, env: Option<T>, profile: Option<T>) -> Option<T> {
    cli.or(env).or(profile)
}
