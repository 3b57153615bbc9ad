//! Configuration types.

use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Runtime knobs shared by every wizard session.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Quiet period after the last trigger-field change before a suggestion
    /// lookup starts.
    pub debounce: Duration,
    /// Upper bound on a single suggestion lookup.
    pub lookup_timeout: Duration,
    /// Suggestions kept after trimming and de-duplication.
    pub max_suggestions: usize,
    /// Check catalogs for dangling references when they are loaded.
    pub strict_catalog: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            lookup_timeout: Duration::from_secs(5),
            max_suggestions: 12,
            strict_catalog: true,
        }
    }
}

impl WizardConfig {
    /// Read overrides from `INTAKE_WIZARD_*` environment variables.
    /// Unparseable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let parse = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparseable configuration value");
                    None
                }
            }
        };

        let strict_catalog = match lookup("INTAKE_WIZARD_STRICT_CATALOG") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    warn!(value = %raw, "Ignoring unparseable INTAKE_WIZARD_STRICT_CATALOG");
                    defaults.strict_catalog
                }
            },
            None => defaults.strict_catalog,
        };

        Self {
            debounce: parse("INTAKE_WIZARD_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            lookup_timeout: parse("INTAKE_WIZARD_LOOKUP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.lookup_timeout),
            max_suggestions: parse("INTAKE_WIZARD_MAX_SUGGESTIONS")
                .map(|n| n as usize)
                .unwrap_or(defaults.max_suggestions),
            strict_catalog,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookup_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "lookup_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_suggestions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_suggestions".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
