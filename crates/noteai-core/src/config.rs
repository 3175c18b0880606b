//! Client configuration
//!
//! A `GenerationConfig` is built once, validated up front, and shared
//! read-only by every call a client makes.

use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigError;
use crate::tokens::{DEFAULT_MAX_TOKENS, RESERVED_TOKENS};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const MAX_TOKENS_VAR: &str = "GEMINI_MAX_TOKENS";
pub const TIMEOUT_VAR: &str = "GEMINI_TIMEOUT_MS";
pub const DEBUG_VAR: &str = "GEMINI_DEBUG";
pub const RATE_LIMIT_VAR: &str = "GEMINI_RATE_LIMIT";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

#[derive(Clone)]
pub struct GenerationConfig {
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    debug: bool,
    rate_limit_per_minute: u32,
}

impl GenerationConfig {
    /// Create a configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(API_KEY_VAR));
        }

        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            debug: false,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        })
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration from an arbitrary key/value source.
    ///
    /// Unset or blank values fall back to defaults; values that are present but
    /// unparseable are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;
        let mut config = Self::new(api_key)?;

        if let Some(model) = get(MODEL_VAR) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = get(MAX_TOKENS_VAR) {
            config.max_tokens = parse_number(MAX_TOKENS_VAR, &raw)?;
        }
        if let Some(raw) = get(TIMEOUT_VAR) {
            config.timeout = Duration::from_millis(parse_number(TIMEOUT_VAR, &raw)?);
        }
        if let Some(raw) = get(DEBUG_VAR) {
            config.debug = raw.trim().eq_ignore_ascii_case("true");
        }
        if let Some(raw) = get(RATE_LIMIT_VAR) {
            config.rate_limit_per_minute = parse_number(RATE_LIMIT_VAR, &raw)?;
        }

        config.warn_on_budget();
        Ok(config)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self.warn_on_budget();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_rate_limit_per_minute(mut self, rate_limit: u32) -> Self {
        self.rate_limit_per_minute = rate_limit;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Advisory only; the client never throttles on it.
    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Returns a truncated hash suffix of the key for safe logging
    pub fn key_id(&self) -> String {
        let hash = Sha256::digest(self.api_key.as_bytes());
        let hex_hash = hex::encode(hash);
        format!("...{}", &hex_hash[hex_hash.len() - 8..])
    }

    fn warn_on_budget(&self) {
        if self.max_tokens <= RESERVED_TOKENS {
            warn!(
                max_tokens = self.max_tokens,
                reserved = RESERVED_TOKENS,
                "max tokens leaves no room for input; every request will be rejected"
            );
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &self.key_id())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config =
            GenerationConfig::from_lookup(lookup_from(&[(API_KEY_VAR, "secret")])).unwrap();
        assert_eq!(config.api_key(), "secret");
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.max_tokens(), 8192);
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
        assert!(!config.debug());
        assert_eq!(config.rate_limit_per_minute(), 60);
    }

    #[test]
    fn test_config_missing_api_key() {
        let result = GenerationConfig::from_lookup(lookup_from(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::MissingApiKey(API_KEY_VAR));
    }

    #[test]
    fn test_config_blank_api_key() {
        let result = GenerationConfig::from_lookup(lookup_from(&[(API_KEY_VAR, "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey(_))));
        assert!(GenerationConfig::new("").is_err());
    }

    #[test]
    fn test_config_overrides() {
        let config = GenerationConfig::from_lookup(lookup_from(&[
            (API_KEY_VAR, "secret"),
            (MODEL_VAR, "gemini-2.5-flash"),
            (MAX_TOKENS_VAR, "4096"),
            (TIMEOUT_VAR, "2500"),
            (DEBUG_VAR, "true"),
            (RATE_LIMIT_VAR, "15"),
        ]))
        .unwrap();

        assert_eq!(config.model(), "gemini-2.5-flash");
        assert_eq!(config.max_tokens(), 4096);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert!(config.debug());
        assert_eq!(config.rate_limit_per_minute(), 15);
    }

    #[test]
    fn test_config_debug_flag_requires_true() {
        let config =
            GenerationConfig::from_lookup(lookup_from(&[(API_KEY_VAR, "k"), (DEBUG_VAR, "yes")]))
                .unwrap();
        assert!(!config.debug());

        let config =
            GenerationConfig::from_lookup(lookup_from(&[(API_KEY_VAR, "k"), (DEBUG_VAR, "TRUE")]))
                .unwrap();
        assert!(config.debug());
    }

    #[test]
    fn test_config_invalid_number() {
        let result = GenerationConfig::from_lookup(lookup_from(&[
            (API_KEY_VAR, "secret"),
            (TIMEOUT_VAR, "ten seconds"),
        ]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                key: TIMEOUT_VAR,
                value: "ten seconds".to_string(),
            }
        );
    }

    #[test]
    fn test_config_negative_max_tokens_rejected() {
        let result = GenerationConfig::from_lookup(lookup_from(&[
            (API_KEY_VAR, "secret"),
            (MAX_TOKENS_VAR, "-1"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: MAX_TOKENS_VAR, .. })
        ));
    }

    #[test]
    fn test_config_builders() {
        let config = GenerationConfig::new("secret")
            .unwrap()
            .with_model("gemini-pro")
            .with_max_tokens(1000)
            .with_timeout(Duration::from_secs(1))
            .with_debug(true)
            .with_rate_limit_per_minute(5);

        assert_eq!(config.model(), "gemini-pro");
        assert_eq!(config.max_tokens(), 1000);
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert!(config.debug());
        assert_eq!(config.rate_limit_per_minute(), 5);
    }

    #[test]
    fn test_config_with_blank_model_keeps_default() {
        let config = GenerationConfig::new("secret").unwrap().with_model("  ");
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_config_debug_output_hides_key() {
        let config = GenerationConfig::new("super-secret-key").unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains(&config.key_id()));
    }

    #[test]
    fn test_key_id_is_short_and_stable() {
        let a = GenerationConfig::new("key-a").unwrap();
        let b = GenerationConfig::new("key-a").unwrap();
        let c = GenerationConfig::new("key-b").unwrap();
        assert_eq!(a.key_id().len(), 11);
        assert!(a.key_id().starts_with("..."));
        assert_eq!(a.key_id(), b.key_id());
        assert_ne!(a.key_id(), c.key_id());
    }
}
