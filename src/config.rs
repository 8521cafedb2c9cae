//! Runtime configuration read from the environment (and `.env`, if present).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` puts the inference gateway in fallback mode.
    pub upstream: Option<UpstreamConfig>,
    pub cache_capacity: usize,
    pub history_window: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;
        let cache_capacity = parse_nonzero(&lookup, "CACHE_CAPACITY", 100)?;
        let history_window = parse_or(&lookup, "HISTORY_WINDOW", 5usize)?;
        let timeout_secs = parse_nonzero(&lookup, "UPSTREAM_TIMEOUT_SECS", 30u64)?;
        let max_tokens = parse_nonzero(&lookup, "MAX_TOKENS", 512u32)?;

        let upstream = lookup("HF_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|api_key| UpstreamConfig {
                endpoint: lookup("UPSTREAM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key,
                model: lookup("UPSTREAM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                max_tokens,
            });

        Ok(Self {
            bind_addr,
            upstream,
            cache_capacity,
            history_window,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_nonzero<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let parsed = parse_or(lookup, var, default)?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: lookup(var).unwrap_or_default(),
        });
    }
    Ok(parsed)
}
