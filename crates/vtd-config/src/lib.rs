//! vtd-config
//!
//! Layered YAML configuration for the virtual trading desk.
//! - Documents merge in order: later documents override earlier ones
//! - Literal secrets in any leaf string abort the load
//! - Unknown keys are reported (warn or fail, caller's choice)
//! - The merged document deserializes into [`DeskConfig`] with defaults

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

mod desk;
mod secrets;

pub use desk::{
    DeskConfig, OracleSection, PortfolioSection, RefreshSection, StoreSection, SyntheticSection,
};
pub use secrets::{resolve_secrets, ResolvedSecrets};

/// Known secret-like prefixes. A leaf string starting with one of these
/// aborts the load with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

/// Top-level sections [`DeskConfig`] reads. Leaves outside these are unused.
const CONSUMED_PREFIXES: &[&str] = &["/oracle", "/portfolio", "/refresh", "/store", "/synthetic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DeskConfig,
    pub config_json: Value,
    /// Leaf pointers no section reads (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

pub fn load_layered_yaml<P: AsRef<Path>>(
    paths: &[P],
    policy: UnusedKeyPolicy,
) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs, policy)
}

pub fn load_layered_yaml_from_strings(
    yaml_docs: &[&str],
    policy: UnusedKeyPolicy,
) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let unused = unused_leaf_pointers(&merged);
    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {:?}",
            unused.len(),
            unused.iter().take(12).collect::<Vec<_>>()
        );
    }

    let config: DeskConfig =
        serde_json::from_value(merged.clone()).context("config does not match schema")?;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        config_json: merged,
        unused_leaf_pointers: unused,
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

/// Return true if `prefix` is a JSON-pointer prefix of `leaf`.
///
/// "/a/b" consumes "/a/b/c" but NOT "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn unused_leaf_pointers(v: &Value) -> Vec<String> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);
    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !CONSUMED_PREFIXES.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();
    unused
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            // Leaf (empty containers count as leaves)
            if !prefix.is_empty() {
                out.push(prefix.to_string());
            }
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
