use crate::categories::{
    category_total, default_categories, validate_category_weights, weights_from_categories,
};
use crate::ipc::error::ok;
use crate::ipc::helpers::{parse_categories, weights_error};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_defaults(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "categories": default_categories() }))
}

// An invalid configuration is an expected answer here, not a failed request.
fn handle_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let categories = match parse_categories(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match validate_category_weights(&categories, state.settings.weight_epsilon) {
        Ok(total) => ok(&req.id, json!({ "valid": true, "total": total })),
        Err(e) => ok(
            &req.id,
            json!({
                "valid": false,
                "total": category_total(&categories),
                "message": e.to_string(),
                "details": e.details(),
            }),
        ),
    }
}

fn handle_weights(state: &mut AppState, req: &Request) -> serde_json::Value {
    let categories = match parse_categories(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match weights_from_categories(&categories, state.settings.weight_epsilon) {
        Ok(weights) => ok(&req.id, json!({ "categoryWeights": weights })),
        Err(e) => weights_error(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "categories.defaults" => Some(handle_defaults(state, req)),
        "categories.validate" => Some(handle_validate(state, req)),
        "categories.weights" => Some(handle_weights(state, req)),
        _ => None,
    }
}
