//! bgv-config
//!
//! Layered YAML configuration for the validator.
//!
//! Documents are merged in order (later layers override earlier ones), the
//! result is serialized as canonical JSON with sorted keys, and that string is
//! hashed with SHA-256 so every report can name the exact config it ran with.
//! The merged document is then read into the typed [`ValidatorConfig`].
//!
//! Secrets never appear as literal values. YAML carries env var NAMES only;
//! see [`secrets`].

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub mod secrets;
mod settings;

pub use secrets::{resolve_loki_auth, resolve_loki_auth_with, ResolvedLokiAuth};
pub use settings::{
    LokiSettings, ReportSettings, ValidatorConfig, VerdictSettings, LOKI_URL_ENV,
};

/// Leaf string prefixes that look like credentials. Any match aborts loading
/// with `CONFIG_SECRET_DETECTED`.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "glsa_",      // Grafana service account token
    "glc_",       // Grafana Cloud access policy token
    "Bearer ",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged document.
    pub fn settings(&self) -> Result<ValidatorConfig> {
        ValidatorConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw)
            .with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        match v_json {
            // An empty file parses as null and contributes nothing.
            Value::Null => {}
            Value::Object(_) => merged = deep_merge(merged, v_json),
            _ => bail!("CONFIG_INVALID: layer {i} is not a mapping"),
        }
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON. `serde_json::Map` is key-sorted, so layout in the source
/// YAML does not affect the output.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves: Vec<(String, &str)> = Vec::new();
    collect_string_leaves(v, "", &mut leaves);

    for (ptr, s) in leaves {
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
    }
    Ok(())
}

fn collect_string_leaves<'a>(v: &'a Value, prefix: &str, out: &mut Vec<(String, &'a str)>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, k.replace('~', "~0").replace('/', "~1"));
                collect_string_leaves(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_string_leaves(vv, &format!("{prefix}/{i}"), out);
            }
        }
        Value::String(s) => {
            let ptr = if prefix.is_empty() { "/" } else { prefix };
            out.push((ptr.to_string(), s.as_str()));
        }
        _ => {}
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim_start();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_overrides_leaves_and_keeps_siblings() {
        let a = json!({"loki": {"url": "http://a:3100", "page_limit": 10}});
        let b = json!({"loki": {"url": "http://b:3100"}});
        let m = deep_merge(a, b);
        assert_eq!(m, json!({"loki": {"url": "http://b:3100", "page_limit": 10}}));
    }

    #[test]
    fn empty_layer_is_ignored() {
        let a = load_layered_yaml_from_strings(&["verdict:\n  duplication_tolerance_pct: 0.5\n", ""])
            .unwrap();
        assert_eq!(
            a.config_json.pointer("/verdict/duplication_tolerance_pct"),
            Some(&json!(0.5))
        );
    }

    #[test]
    fn scalar_layer_is_rejected() {
        let err = load_layered_yaml_from_strings(&["just a string"]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_INVALID"));
    }

    #[test]
    fn short_values_are_never_secrets() {
        assert!(!looks_like_secret("sk-1"));
        assert!(looks_like_secret("glsa_abcdefgh12345678"));
        assert!(!looks_like_secret("LOKI_TOKEN"));
    }
}
