//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (`loki.token_env: "LOKI_TOKEN"`).
//! Callers resolve once at startup and pass the result to the source
//! constructor. `Debug` output redacts values, and error messages name the
//! variable, never its content.

use anyhow::{bail, Result};

use crate::LokiSettings;

/// Loki credentials resolved from the environment.
///
/// **Values are redacted in `Debug` output.**
#[derive(Clone, Default)]
pub struct ResolvedLokiAuth {
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ResolvedLokiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLokiAuth")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve Loki credentials from the process environment.
pub fn resolve_loki_auth(settings: &LokiSettings) -> Result<ResolvedLokiAuth> {
    resolve_loki_auth_with(settings, |name| std::env::var(name).ok())
}

/// Same as [`resolve_loki_auth`] with an injectable variable lookup.
///
/// No `token_env` configured means no token. A configured name whose
/// variable is unset or blank is an error.
pub fn resolve_loki_auth_with<F>(settings: &LokiSettings, lookup: F) -> Result<ResolvedLokiAuth>
where
    F: Fn(&str) -> Option<String>,
{
    let var_name = match settings.token_env.as_deref().map(str::trim) {
        None | Some("") => return Ok(ResolvedLokiAuth::default()),
        Some(name) => name,
    };

    match lookup(var_name) {
        Some(v) if !v.trim().is_empty() => Ok(ResolvedLokiAuth {
            bearer_token: Some(v.trim().to_string()),
        }),
        _ => bail!(
            "SECRETS_MISSING: env var '{}' (loki.token_env) is not set or empty",
            var_name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token_env(name: Option<&str>) -> LokiSettings {
        LokiSettings {
            token_env: name.map(str::to_string),
            ..LokiSettings::default()
        }
    }

    #[test]
    fn no_token_env_means_anonymous() {
        let auth = resolve_loki_auth_with(&with_token_env(None), |_| {
            panic!("lookup must not be called")
        })
        .unwrap();
        assert!(auth.bearer_token.is_none());
    }

    #[test]
    fn named_var_is_resolved() {
        let auth = resolve_loki_auth_with(&with_token_env(Some("LOKI_TOKEN")), |name| {
            assert_eq!(name, "LOKI_TOKEN");
            Some("glsa_value_from_env".to_string())
        })
        .unwrap();
        assert_eq!(auth.bearer_token.as_deref(), Some("glsa_value_from_env"));
        assert!(!format!("{auth:?}").contains("glsa_value_from_env"));
    }

    #[test]
    fn missing_var_names_the_var_only() {
        let err = resolve_loki_auth_with(&with_token_env(Some("LOKI_TOKEN")), |_| None)
            .unwrap_err()
            .to_string();
        assert!(err.contains("SECRETS_MISSING"));
        assert!(err.contains("LOKI_TOKEN"));
    }
}
