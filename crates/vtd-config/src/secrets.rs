//! Runtime secret resolution.
//!
//! Config stores only env var NAMES (`oracle.api_key_env`). Callers resolve
//! them once at startup and pass [`ResolvedSecrets`] into constructors.
//! `Debug` redacts values; errors name the variable, never its value.

use anyhow::{bail, Result};

use crate::desk::DeskConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` if the named env var is unset or blank.
    pub oracle_api_key: Option<String>,
    /// The env var the key was read from.
    pub oracle_api_key_env: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "oracle_api_key",
                &self.oracle_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("oracle_api_key_env", &self.oracle_api_key_env)
            .finish()
    }
}

impl ResolvedSecrets {
    /// The oracle key, or an error naming the missing variable.
    pub fn require_oracle_key(&self) -> Result<&str> {
        match self.oracle_api_key.as_deref() {
            Some(k) => Ok(k),
            None => bail!(
                "SECRETS_MISSING: env var '{}' (quote oracle api key) is not set or empty",
                self.oracle_api_key_env
            ),
        }
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(config: &DeskConfig) -> ResolvedSecrets {
    let var = config.oracle.api_key_env.trim().to_string();
    ResolvedSecrets {
        oracle_api_key: resolve_env(&var),
        oracle_api_key_env: var,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key() {
        let s = ResolvedSecrets {
            oracle_api_key: Some("abc123-very-secret".to_string()),
            oracle_api_key_env: "FINNHUB_API_KEY".to_string(),
        };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("abc123"));
        assert!(dbg.contains("<REDACTED>"));
        assert!(dbg.contains("FINNHUB_API_KEY"));
    }

    #[test]
    fn missing_key_error_names_variable() {
        let mut cfg = DeskConfig::default();
        cfg.oracle.api_key_env = "VTD_TEST_SURELY_UNSET_KEY_VAR".to_string();
        let s = resolve_secrets(&cfg);
        assert!(s.oracle_api_key.is_none());
        let err = s.require_oracle_key().unwrap_err().to_string();
        assert!(err.contains("VTD_TEST_SURELY_UNSET_KEY_VAR"));
    }
}
