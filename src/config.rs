use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::rchain::{Credentials, Provider};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot resolve config path: set MC_CONFIG or HOME/XDG_CONFIG_HOME.")]
    NoConfigPath,
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Config file '{}' does not contain a [profiles] section.", .path.display())]
    NoProfiles { path: PathBuf },
    #[error("Profile '{name}' not found in config file '{}'.", .path.display())]
    ProfileNotFound { name: String, path: PathBuf },
    #[error("Invalid profile {field} '{value}' in profile '{profile}'.")]
    InvalidProfileValue {
        profile: String,
        field: &'static str,
        value: String,
    },
    #[error("Invalid {var} '{value}'. {hint}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        hint: String,
    },
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, ConfigError> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;
    let profile = profiles
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
            path: path.clone(),
        })?;
    validate_profile(name, &profile)?;
    Ok(profile)
}

/// Checks the whole config file, or only `profile` when given. Returns the file path.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    match profile {
        Some(name) => {
            let config = profiles
                .get(name)
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                    path: path.clone(),
                })?;
            validate_profile(name, config)?;
        }
        None => {
            let mut names = profiles.keys().collect::<Vec<_>>();
            names.sort();
            for name in names {
                validate_profile(name, &profiles[name])?;
            }
        }
    }

    Ok(path)
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_profiles(&raw, path)
}

fn parse_profiles(raw: &str, path: &Path) -> Result<HashMap<String, ProfileConfig>, ConfigError> {
    let config: ConfigFile = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.profiles.ok_or_else(|| ConfigError::NoProfiles {
        path: path.to_path_buf(),
    })
}

fn validate_profile(name: &str, profile: &ProfileConfig) -> Result<(), ConfigError> {
    let invalid = |field: &'static str, value: String| ConfigError::InvalidProfileValue {
        profile: name.to_string(),
        field,
        value,
    };

    if let Some(provider) = &profile.provider {
        if provider.parse::<Provider>().is_err() {
            return Err(invalid("provider", provider.clone()));
        }
    }
    if let Some(output) = &profile.output {
        if !matches!(output.as_str(), "text" | "json") {
            return Err(invalid("output", output.clone()));
        }
    }
    if let Some(temperature) = profile.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(invalid("temperature", temperature.to_string()));
        }
    }
    if profile.max_tokens == Some(0) {
        return Err(invalid("max_tokens", "0".to_string()));
    }
    Ok(())
}

fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_string("MC_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = env_string("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("mchat").join("config.toml"));
    }

    let home = env_string("HOME").ok_or(ConfigError::NoConfigPath)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("mchat")
        .join("config.toml"))
}

/// Trimmed value of `var`, treating blank as unset.
pub fn env_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses `var` when set.
pub fn env_parse<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(var)
        .map(|value| {
            value.parse::<T>().map_err(|err| ConfigError::InvalidEnv {
                var,
                hint: err.to_string(),
                value,
            })
        })
        .transpose()
}

/// API keys for every supported provider whose env var is set.
pub fn credentials_from_env() -> Credentials {
    Provider::ALL
        .into_iter()
        .fold(Credentials::new(), |credentials, provider| {
            match env_string(provider.api_key_env()) {
                Some(key) => credentials.with_key(provider.as_str(), key),
                None => credentials,
            }
        })
}
