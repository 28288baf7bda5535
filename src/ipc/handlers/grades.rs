use crate::calc::{self, CalcContext};
use crate::diagnostics::Diagnostics;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::helpers::{
    parse_assessments, parse_policy, parse_roster, parse_subjects, parse_weights, required_str,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_letter(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(score) = req.params.get("score").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "score must be a number", None);
    };
    ok(
        &req.id,
        json!({ "score": score, "letter": calc::letter_grade(score) }),
    )
}

fn handle_subject_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let assessments = match parse_assessments(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let weights = match parse_weights(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let ctx = CalcContext {
        assessments: &assessments,
        subjects: &[],
        weights: &weights,
    };
    let mut diagnostics = Diagnostics::new();
    let score = calc::compute_subject_score(&ctx, &student_id, &subject_id, &mut diagnostics);
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "subjectId": subject_id,
            "score": score,
            "diagnostics": diagnostics.into_vec(),
        }),
    )
}

fn handle_student_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let assessments = match parse_assessments(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subjects = match parse_subjects(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let weights = match parse_weights(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy = match parse_policy(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let ctx = CalcContext {
        assessments: &assessments,
        subjects: &subjects,
        weights: &weights,
    };
    let mut diagnostics = Diagnostics::new();
    let summary = calc::compute_student_overall(&ctx, &student_id, policy, &mut diagnostics);
    ok(
        &req.id,
        json!({
            "summary": summary,
            "policy": policy,
            "diagnostics": diagnostics.into_vec(),
        }),
    )
}

fn handle_class_aggregate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = match parse_roster(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let assessments = match parse_assessments(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subjects = match parse_subjects(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let weights = match parse_weights(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let policy = match parse_policy(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let filters = match calc::parse_class_filters(req.params.get("filters")) {
        Ok(v) => v,
        Err(e) => return calc_err(&req.id, e),
    };
    if weights.is_empty() {
        tracing::info!(id = %req.id, "class aggregate requested with no category weights");
    }

    let ctx = CalcContext {
        assessments: &assessments,
        subjects: &subjects,
        weights: &weights,
    };
    let mut diagnostics = Diagnostics::new();
    let aggregate =
        calc::compute_class_aggregate(&ctx, &roster, &filters, policy, &mut diagnostics);
    if !diagnostics.is_empty() {
        tracing::debug!(id = %req.id, count = diagnostics.len(), "aggregate carried diagnostics");
    }
    ok(
        &req.id,
        json!({
            "aggregate": aggregate,
            "policy": policy,
            "diagnostics": diagnostics.into_vec(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.letter" => Some(handle_letter(state, req)),
        "grades.subjectScore" => Some(handle_subject_score(state, req)),
        "grades.studentSummary" => Some(handle_student_summary(state, req)),
        "grades.classAggregate" => Some(handle_class_aggregate(state, req)),
        _ => None,
    }
}
