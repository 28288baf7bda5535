use crate::calc::OverallPolicy;
use crate::categories::{weights_from_categories, WeightValidationError};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::{Assessment, AssessmentCategory, CategoryWeights, Subject};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn required_list<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Vec<T>, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {}: {}", key, e), None))
}

pub fn parse_assessments(req: &Request) -> Result<Vec<Assessment>, serde_json::Value> {
    required_list(req, "assessments")
}

pub fn parse_subjects(req: &Request) -> Result<Vec<Subject>, serde_json::Value> {
    required_list(req, "subjects")
}

pub fn parse_categories(req: &Request) -> Result<Vec<AssessmentCategory>, serde_json::Value> {
    required_list(req, "categories")
}

pub fn weights_error(id: &str, e: &WeightValidationError) -> serde_json::Value {
    err(
        id,
        "invalid_category_weights",
        e.to_string(),
        Some(e.details()),
    )
}

/// Weights come either as ready fractions (`categoryWeights`) or as the
/// percentage record (`categories`), which must validate first.
pub fn parse_weights(
    state: &AppState,
    req: &Request,
) -> Result<CategoryWeights, serde_json::Value> {
    if let Some(raw) = req.params.get("categoryWeights") {
        let weights: CategoryWeights = serde_json::from_value(raw.clone()).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid categoryWeights: {}", e),
                None,
            )
        })?;
        if let Some((name, w)) = weights.iter().find(|(_, w)| !(0.0..=1.0).contains(w)) {
            return Err(err(
                &req.id,
                "bad_params",
                format!("categoryWeights.{} must be a fraction in [0, 1] (got {})", name, w),
                None,
            ));
        }
        return Ok(weights);
    }
    if req.params.get("categories").is_some() {
        let categories = parse_categories(req)?;
        return weights_from_categories(&categories, state.settings.weight_epsilon)
            .map_err(|e| weights_error(&req.id, &e));
    }
    Err(err(
        &req.id,
        "bad_params",
        "missing categoryWeights or categories",
        None,
    ))
}

pub fn parse_policy(state: &AppState, req: &Request) -> Result<OverallPolicy, serde_json::Value> {
    match req.params.get("policy") {
        None => Ok(state.settings.overall_policy),
        Some(v) if v.is_null() => Ok(state.settings.overall_policy),
        Some(v) => v.as_str().and_then(OverallPolicy::parse).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "policy must be 'exclude' or 'countAsZero'",
                None,
            )
        }),
    }
}

pub fn parse_roster(req: &Request) -> Result<Vec<String>, serde_json::Value> {
    let Some(raw) = req.params.get("rosterStudentIds").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing rosterStudentIds", None));
    };
    let mut out = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();
    for v in raw {
        let Some(id) = v.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                "rosterStudentIds must contain only strings",
                None,
            ));
        };
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(err(
                &req.id,
                "bad_params",
                "rosterStudentIds must not contain empty ids",
                None,
            ));
        }
        let owned = trimmed.to_string();
        if seen.insert(owned.clone()) {
            out.push(owned);
        }
    }
    Ok(out)
}
