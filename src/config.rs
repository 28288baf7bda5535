use crate::calc::OverallPolicy;
use crate::categories::DEFAULT_WEIGHT_EPSILON;
use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const CONFIG_ENV: &str = "GRADEBOOKD_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Tolerance when checking that category percentages total 100.
    pub weight_epsilon: f64,
    pub overall_policy: OverallPolicy,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            overall_policy: OverallPolicy::Exclude,
            log_level: "info".to_string(),
        }
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read settings {}", path.display()))?;
    let raw: Value = serde_json::from_str(&text)
        .with_context(|| format!("parse settings {}", path.display()))?;
    let Some(obj) = raw.as_object() else {
        anyhow::bail!("settings {} must be a JSON object", path.display());
    };
    apply_patch(&Settings::default(), obj).map_err(|msg| anyhow::anyhow!(msg))
}

/// Settings from `GRADEBOOKD_CONFIG` when set. A broken file must not keep the
/// sidecar from starting, so failures fall back to defaults.
pub fn settings_from_env() -> (Settings, Option<String>) {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return (Settings::default(), None);
    };
    match load_settings(Path::new(&path)) {
        Ok(s) => (s, None),
        Err(e) => (Settings::default(), Some(format!("{e:#}"))),
    }
}

/// Merge a partial camelCase patch over `base`, rejecting bad values.
pub fn apply_patch(base: &Settings, patch: &Map<String, Value>) -> Result<Settings, String> {
    let mut out = base.clone();

    if let Some(v) = patch.get("weightEpsilon") {
        let Some(eps) = v.as_f64() else {
            return Err("weightEpsilon must be a number".into());
        };
        if !eps.is_finite() || eps <= 0.0 {
            return Err("weightEpsilon must be finite and positive".into());
        }
        out.weight_epsilon = eps;
    }

    if let Some(v) = patch.get("overallPolicy") {
        let policy = v.as_str().and_then(OverallPolicy::parse);
        let Some(policy) = policy else {
            return Err("overallPolicy must be 'exclude' or 'countAsZero'".into());
        };
        out.overall_policy = policy;
    }

    if let Some(v) = patch.get("logLevel") {
        let Some(level) = v.as_str() else {
            return Err("logLevel must be a string".into());
        };
        let t = level.trim();
        if t.is_empty() {
            return Err("logLevel must not be empty".into());
        }
        out.log_level = t.to_string();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn partial_patch_keeps_other_fields() {
        let s = apply_patch(
            &Settings::default(),
            &patch(json!({ "overallPolicy": "countAsZero", "unknownKey": 1 })),
        )
        .expect("patch");
        assert_eq!(s.overall_policy, OverallPolicy::CountAsZero);
        assert_eq!(s.weight_epsilon, DEFAULT_WEIGHT_EPSILON);
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn invalid_values_rejected() {
        let base = Settings::default();
        assert!(apply_patch(&base, &patch(json!({ "weightEpsilon": -1 }))).is_err());
        assert!(apply_patch(&base, &patch(json!({ "weightEpsilon": "x" }))).is_err());
        assert!(apply_patch(&base, &patch(json!({ "overallPolicy": "zero" }))).is_err());
        assert!(apply_patch(&base, &patch(json!({ "logLevel": " " }))).is_err());
    }

    #[test]
    fn settings_serialize_camel_case() {
        let v = serde_json::to_value(Settings::default()).expect("serialize");
        assert_eq!(v["overallPolicy"], "exclude");
        assert_eq!(v["logLevel"], "info");
        assert!(v["weightEpsilon"].as_f64().is_some());
    }
}
