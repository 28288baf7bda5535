use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn unknown_category_is_no_score_with_a_diagnostic() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.subjectScore",
        json!({
            "studentId": "S1",
            "subjectId": "eng",
            "assessments": [{
                "assessmentId": "old-quiz",
                "subjectId": "eng",
                "category": "Pop Quiz",
                "totalMarks": 10,
                "scores": { "S1": 7 }
            }],
            "categoryWeights": { "Classwork": 0.5, "End-Semester": 0.5 },
        }),
    );
    assert!(result["score"].is_null());
    let diagnostics = result["diagnostics"].as_array().cloned().unwrap_or_default();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["kind"].as_str(), Some("unknownCategory"));
    assert_eq!(diagnostics[0]["assessmentId"].as_str(), Some("old-quiz"));
    assert_eq!(diagnostics[0]["category"].as_str(), Some("Pop Quiz"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn non_positive_total_marks_is_skipped_everywhere() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.classAggregate",
        json!({
            "rosterStudentIds": ["S1", "S2"],
            "assessments": [
                {
                    "assessmentId": "broken",
                    "subjectId": "eng",
                    "category": "Classwork",
                    "totalMarks": 0,
                    "scores": { "S1": 5, "S2": 3 }
                },
                {
                    "assessmentId": "essay",
                    "subjectId": "eng",
                    "category": "Classwork",
                    "totalMarks": 20,
                    "scores": { "S1": 18, "S2": 12 }
                }
            ],
            "subjects": [{ "subjectId": "eng", "displayName": "English" }],
            "categoryWeights": { "Classwork": 1.0 },
        }),
    );
    let aggregate = &result["aggregate"];
    let broken = &aggregate["perAssessment"][0];
    assert!(broken["avgPercent"].is_null());
    assert!(broken["avgRaw"].is_null());
    assert!(broken["medianPercent"].is_null());
    assert_eq!(broken["scoredCount"].as_u64(), Some(0));
    assert_eq!(broken["missingCount"].as_u64(), Some(2));
    assert_eq!(aggregate["perAssessment"][1]["avgPercent"].as_i64(), Some(75));
    assert_eq!(aggregate["perStudent"][0]["overallAverage"].as_i64(), Some(90));
    assert_eq!(aggregate["perStudent"][1]["overallAverage"].as_i64(), Some(60));
    assert_eq!(aggregate["overallAverage"].as_i64(), Some(75));

    // One warning for the assessment, however many students it touched.
    let diagnostics = result["diagnostics"].as_array().cloned().unwrap_or_default();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["kind"].as_str(), Some("nonPositiveTotalMarks"));
    assert_eq!(diagnostics[0]["assessmentId"].as_str(), Some("broken"));
    assert_eq!(diagnostics[0]["totalMarks"].as_f64(), Some(0.0));

    drop(stdin);
    let _ = child.wait();
}
