use crate::error::{CsrfError, Result};
use serde::Deserialize;
use std::env;

/// Default namespace for attribute keys and the session storage key
pub const DEFAULT_PREFIX: &str = "csrf";

/// Smallest accepted random token length in bytes
pub const MIN_STRENGTH: usize = 16;

/// Default maximum number of live tokens
pub const DEFAULT_STORAGE_LIMIT: usize = 200;

/// CSRF guard configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Namespace for `<prefix>_name` / `<prefix>_value` and the session key
    pub prefix: String,

    /// Number of random bytes in a token value
    pub strength: usize,

    /// Maximum number of live tokens, `0` disables eviction
    pub storage_limit: usize,

    /// Reuse the newest token across requests until a validation fails
    pub persistent_token_mode: bool,

    /// Methods that must carry a valid token
    pub protected_methods: Vec<String>,

    /// Paths to exclude from validation
    pub exclude_paths: Vec<String>,

    /// Also read the token from `X-<PREFIX>-Name` / `X-<PREFIX>-Value` headers
    pub header_fallback: bool,
}

impl CsrfConfig {
    /// Create a configuration with the given prefix and default settings
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: normalize_prefix(&prefix.into()),
            strength: MIN_STRENGTH,
            storage_limit: DEFAULT_STORAGE_LIMIT,
            persistent_token_mode: false,
            protected_methods: ["POST", "PUT", "DELETE", "PATCH"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude_paths: Vec::new(),
            header_fallback: false,
        }
    }

    /// Load settings from `ARMATURE_CSRF_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("ARMATURE_CSRF_PREFIX") {
            Ok(prefix) => Self::new(prefix),
            Err(_) => Self::default(),
        };

        if let Some(strength) = env_number("ARMATURE_CSRF_STRENGTH")? {
            config.strength = strength;
        }

        if let Some(limit) = env_number("ARMATURE_CSRF_STORAGE_LIMIT")? {
            config.storage_limit = limit;
        }

        if let Ok(value) = env::var("ARMATURE_CSRF_PERSISTENT") {
            config.persistent_token_mode = value == "1" || value.eq_ignore_ascii_case("true");
        }

        if let Ok(paths) = env::var("ARMATURE_CSRF_EXCLUDE_PATHS") {
            config.exclude_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }

    /// Check invariants that must hold before any token is issued
    pub fn validate(&self) -> Result<()> {
        if self.strength < MIN_STRENGTH {
            return Err(CsrfError::Configuration(format!(
                "CSRF middleware failed. Minimum strength is {}.",
                MIN_STRENGTH
            )));
        }
        if self.prefix.is_empty() {
            return Err(CsrfError::Configuration(
                "CSRF prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Request attribute / body field holding the token name
    pub fn name_key(&self) -> String {
        format!("{}_name", self.prefix)
    }

    /// Request attribute / body field holding the token value
    pub fn value_key(&self) -> String {
        format!("{}_value", self.prefix)
    }

    /// Header carrying the token name when `header_fallback` is on
    pub fn name_header(&self) -> String {
        format!("X-{}-Name", self.prefix.to_uppercase())
    }

    /// Header carrying the token value when `header_fallback` is on
    pub fn value_header(&self) -> String {
        format!("X-{}-Value", self.prefix.to_uppercase())
    }

    /// Whether requests with this method must be validated
    pub fn is_protected_method(&self, method: &str) -> bool {
        self.protected_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Whether the path is excluded from validation
    pub fn is_excluded_path(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|excluded| path.starts_with(excluded.as_str()))
    }

    /// Set the prefix, stripping trailing underscores
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = normalize_prefix(&prefix.into());
        self
    }

    /// Set token strength in bytes
    pub fn with_strength(mut self, strength: usize) -> Self {
        self.strength = strength;
        self
    }

    /// Set the storage limit
    pub fn with_storage_limit(mut self, limit: usize) -> Self {
        self.storage_limit = limit;
        self
    }

    /// Enable or disable persistent token mode
    pub fn with_persistent_token_mode(mut self, enabled: bool) -> Self {
        self.persistent_token_mode = enabled;
        self
    }

    /// Replace the protected methods
    pub fn with_protected_methods(mut self, methods: Vec<String>) -> Self {
        self.protected_methods = methods;
        self
    }

    /// Add excluded paths
    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Enable or disable the header fallback
    pub fn with_header_fallback(mut self, enabled: bool) -> Self {
        self.header_fallback = enabled;
        self
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim_end_matches('_').to_string()
}

fn env_number(key: &str) -> Result<Option<usize>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                CsrfError::Configuration(format!("{} must be a number, got {:?}", key, raw))
            }),
        Err(_) => Ok(None),
    }
}
