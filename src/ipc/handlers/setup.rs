use crate::config::{self, Settings};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "settings": state.settings,
            "defaults": Settings::default(),
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    match config::apply_patch(&state.settings, patch) {
        Ok(next) => {
            // logLevel only takes effect on the next start.
            tracing::info!(
                weight_epsilon = next.weight_epsilon,
                overall_policy = ?next.overall_policy,
                "settings updated"
            );
            state.settings = next;
            ok(&req.id, json!({ "settings": state.settings }))
        }
        Err(message) => err(&req.id, "bad_params", message, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
