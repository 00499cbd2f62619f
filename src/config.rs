use std::env;
use std::time::Duration;

use log::warn;

use crate::blockchain::{DEFAULT_DIFFICULTY_PREFIX, DEFAULT_TIMEOUT_SECS, DEFAULT_VERSION};

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub host: String,
    pub port: u16,
    pub node_number: String,
    pub version: String,
    pub difficulty_prefix: String,
    pub timeout: Duration,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            node_number: "1".to_string(),
            version: DEFAULT_VERSION.to_string(),
            difficulty_prefix: DEFAULT_DIFFICULTY_PREFIX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MinerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let difficulty_prefix = lookup("DIFFICULTY_PREFIX").unwrap_or(defaults.difficulty_prefix);
        if !is_lower_hex(&difficulty_prefix) {
            warn!("DIFFICULTY_PREFIX {difficulty_prefix:?} is not lowercase hex; no hash can satisfy it");
        }

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            node_number: lookup("NODE_NUMBER").unwrap_or(defaults.node_number),
            version: lookup("MINER_VERSION").unwrap_or(defaults.version),
            difficulty_prefix,
            timeout: lookup("MINING_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

pub fn is_lower_hex(s: &str) -> bool {
    s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
