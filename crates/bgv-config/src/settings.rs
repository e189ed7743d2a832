use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Env var that overrides `loki.url` when set and non-empty.
pub const LOKI_URL_ENV: &str = "BGV_LOKI_URL";

/// Typed validator configuration. Every key is optional; unknown keys are
/// rejected so a typo cannot silently fall back to a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub loki: LokiSettings,
    pub verdict: VerdictSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LokiSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub page_limit: usize,
    pub producer_query: String,
    pub consumer_query: String,
    /// NAME of the env var holding a bearer token.
    pub token_env: Option<String>,
    pub tenant_id: Option<String>,
}

impl Default for LokiSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:3100".to_string(),
            timeout_secs: 30,
            page_limit: 5000,
            producer_query: r#"{app="bg-producer"} |= "Message sent" | json"#.to_string(),
            consumer_query: r#"{app="bg-consumer"} |= "Message consumed" | json"#.to_string(),
            token_env: None,
            tenant_id: None,
        }
    }
}

impl LokiSettings {
    /// URL to query: explicit CLI value, then `BGV_LOKI_URL`, then config.
    pub fn effective_url(&self, cli_url: Option<&str>) -> String {
        self.effective_url_with(cli_url, |name| std::env::var(name).ok())
    }

    pub fn effective_url_with<F>(&self, cli_url: Option<&str>, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = cli_url.map(str::trim).filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        match lookup(LOKI_URL_ENV) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerdictSettings {
    /// Percent of consumed deliveries that may be duplicates before a
    /// loss-free run becomes a conditional pass.
    pub duplication_tolerance_pct: f64,
}

impl Default for VerdictSettings {
    fn default() -> Self {
        Self {
            duplication_tolerance_pct: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    pub text_duplicate_rows: usize,
    pub text_missing_sequences: usize,
    pub markdown_duplicate_rows: usize,
    pub markdown_sequence_items: usize,
    pub sequences_per_line: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            text_duplicate_rows: 50,
            text_missing_sequences: 100,
            markdown_duplicate_rows: 100,
            markdown_sequence_items: 200,
            sequences_per_line: 20,
        }
    }
}

impl ValidatorConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: ValidatorConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: config does not match the validator schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.loki.url.trim().is_empty() {
            bail!("CONFIG_INVALID: loki.url must not be empty");
        }
        if self.loki.timeout_secs == 0 {
            bail!("CONFIG_INVALID: loki.timeout_secs must be > 0");
        }
        if self.loki.page_limit == 0 {
            bail!("CONFIG_INVALID: loki.page_limit must be > 0");
        }
        let tol = self.verdict.duplication_tolerance_pct;
        if !tol.is_finite() || tol < 0.0 {
            bail!("CONFIG_INVALID: verdict.duplication_tolerance_pct must be a finite value >= 0 (got {tol})");
        }
        if self.report.sequences_per_line == 0 {
            bail!("CONFIG_INVALID: report.sequences_per_line must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = ValidatorConfig::from_json(&json!({})).unwrap();
        assert_eq!(cfg, ValidatorConfig::default());
        assert_eq!(cfg.loki.page_limit, 5000);
        assert_eq!(cfg.report.sequences_per_line, 20);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = ValidatorConfig::from_json(&json!({"loki": {"page_limit": 100}})).unwrap();
        assert_eq!(cfg.loki.page_limit, 100);
        assert_eq!(cfg.loki.timeout_secs, 30);
        assert_eq!(cfg.loki.url, "http://localhost:3100");
    }

    #[test]
    fn zero_page_limit_is_invalid() {
        let err = ValidatorConfig::from_json(&json!({"loki": {"page_limit": 0}})).unwrap_err();
        assert!(err.to_string().contains("page_limit"));
    }

    #[test]
    fn url_precedence_cli_then_env_then_config() {
        let s = LokiSettings::default();
        let env = |_: &str| Some("http://env:3100".to_string());
        let no_env = |_: &str| None;

        assert_eq!(s.effective_url_with(Some("http://cli:3100"), env), "http://cli:3100");
        assert_eq!(s.effective_url_with(None, env), "http://env:3100");
        assert_eq!(s.effective_url_with(None, no_env), "http://localhost:3100");
        assert_eq!(
            s.effective_url_with(None, |_: &str| Some("  ".to_string())),
            "http://localhost:3100"
        );
    }
}
