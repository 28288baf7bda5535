use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{category_key, Assessment, CategoryWeights, Subject};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

// Keeps x.5 that arrives as x.4999999999999 from binary fractions on the
// upper side.
const ROUND_GUARD: f64 = 1e-9;

/// Round half up to the nearest whole percentage point: `Int(x + 0.5)`.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5 + ROUND_GUARD).floor() as i64
}

/// 1-decimal variant used for raw-score averages: `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5 + ROUND_GUARD).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

/// Maps a percentage onto A/B/C/D/F; a boundary value belongs to the higher
/// band. Input outside [0, 100] is clamped first (NaN counts as 0), so
/// bonus-inflated scores read as A and negative ones as F.
pub fn letter_grade(score_percent: f64) -> LetterGrade {
    let s = if score_percent.is_nan() {
        0.0
    } else {
        score_percent.clamp(0.0, 100.0)
    };
    match s {
        s if s >= 90.0 => LetterGrade::A,
        s if s >= 80.0 => LetterGrade::B,
        s if s >= 70.0 => LetterGrade::C,
        s if s >= 60.0 => LetterGrade::D,
        _ => LetterGrade::F,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn bad_filter(field: &str, message: &str) -> CalcError {
    CalcError::new("bad_params", message).with_details(serde_json::json!({ "field": field }))
}

/// How a subject without any score counts toward the overall average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallPolicy {
    #[default]
    Exclude,
    CountAsZero,
}

impl OverallPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exclude" => Some(Self::Exclude),
            "countAsZero" => Some(Self::CountAsZero),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalcContext<'a> {
    pub assessments: &'a [Assessment],
    pub subjects: &'a [Subject],
    pub weights: &'a CategoryWeights,
}

fn has_usable_total(a: &Assessment, diagnostics: &mut Diagnostics) -> bool {
    if a.total_marks > 0.0 {
        return true;
    }
    diagnostics.record(Diagnostic::non_positive_total_marks(
        &a.assessment_id,
        a.total_marks,
    ));
    false
}

/// Category-weighted percentage for one student in one subject.
///
/// `None` means the subject carries no signal for the student: nothing
/// scored, or every scored assessment sits in a category with no weight.
pub fn compute_subject_score(
    ctx: &CalcContext<'_>,
    student_id: &str,
    subject_id: &str,
    diagnostics: &mut Diagnostics,
) -> Option<i64> {
    let mut weighted_sum = 0.0_f64;
    let mut weight_total = 0.0_f64;

    for a in ctx.assessments.iter().filter(|a| a.subject_id == subject_id) {
        let Some(score) = a.score_for(student_id) else {
            continue;
        };
        if !has_usable_total(a, diagnostics) {
            continue;
        }
        let percent = 100.0 * score / a.total_marks;
        let weight = match ctx.weights.get(&a.category) {
            Some(w) => w,
            None => {
                diagnostics.record(Diagnostic::unknown_category(&a.assessment_id, &a.category));
                0.0
            }
        };
        weighted_sum += percent * weight;
        weight_total += weight;
    }

    if weight_total > 0.0 {
        Some(round_half_up(weighted_sum / weight_total))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    pub subject_id: String,
    pub subject_name: String,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSubject {
    pub subject_name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    /// Every subject in input order, no-score included.
    pub subjects: Vec<SubjectScore>,
    /// Subjects that produced a score, in input order.
    pub scored: Vec<ScoredSubject>,
    pub overall_average: i64,
    pub letter_grade: LetterGrade,
}

fn mean_rounded(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(round_half_up(sum as f64 / values.len() as f64))
}

pub fn compute_student_overall(
    ctx: &CalcContext<'_>,
    student_id: &str,
    policy: OverallPolicy,
    diagnostics: &mut Diagnostics,
) -> StudentSummary {
    let subjects: Vec<SubjectScore> = ctx
        .subjects
        .iter()
        .map(|s| SubjectScore {
            subject_id: s.subject_id.clone(),
            subject_name: s.display_name.clone(),
            score: compute_subject_score(ctx, student_id, &s.subject_id, diagnostics),
        })
        .collect();

    let scored: Vec<ScoredSubject> = subjects
        .iter()
        .filter_map(|s| {
            s.score.map(|score| ScoredSubject {
                subject_name: s.subject_name.clone(),
                score,
            })
        })
        .collect();

    let averaged: Vec<i64> = match policy {
        OverallPolicy::Exclude => scored.iter().map(|s| s.score).collect(),
        OverallPolicy::CountAsZero => subjects.iter().map(|s| s.score.unwrap_or(0)).collect(),
    };
    // Nothing to average still has to render as a number.
    let overall_average = mean_rounded(&averaged).unwrap_or(0);

    StudentSummary {
        student_id: student_id.to_string(),
        subjects,
        scored,
        overall_average,
        letter_grade: letter_grade(overall_average as f64),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFilters {
    pub subject_id: Option<String>,
    /// Stored lowercased.
    pub category_name: Option<String>,
    pub assessment_ids: Option<Vec<String>>,
}

impl ClassFilters {
    pub fn matches(&self, a: &Assessment) -> bool {
        let subject_ok = self
            .subject_id
            .as_ref()
            .map(|s| a.subject_id == *s)
            .unwrap_or(true);
        let cat_ok = self
            .category_name
            .as_ref()
            .map(|c| category_key(&a.category) == *c)
            .unwrap_or(true);
        let id_ok = self
            .assessment_ids
            .as_ref()
            .map(|ids| ids.iter().any(|id| *id == a.assessment_id))
            .unwrap_or(true);
        subject_ok && cat_ok && id_ok
    }
}

pub fn parse_class_filters(raw: Option<&serde_json::Value>) -> Result<ClassFilters, CalcError> {
    let Some(raw) = raw else {
        return Ok(ClassFilters::default());
    };
    if raw.is_null() {
        return Ok(ClassFilters::default());
    }
    let Some(obj) = raw.as_object() else {
        return Err(bad_filter("filters", "filters must be an object"));
    };

    let subject_id = match obj.get("subjectId") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(bad_filter(
                    "filters.subjectId",
                    "filters.subjectId must be string or null",
                ));
            };
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("ALL") {
                None
            } else {
                Some(t.to_string())
            }
        }
    };

    let category_name = match obj.get("categoryName") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(bad_filter(
                    "filters.categoryName",
                    "filters.categoryName must be string or null",
                ));
            };
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("ALL") {
                None
            } else {
                Some(category_key(t))
            }
        }
    };

    let assessment_ids = match obj.get("assessmentIds") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(arr) = v.as_array() else {
                return Err(bad_filter(
                    "filters.assessmentIds",
                    "filters.assessmentIds must be an array of strings",
                ));
            };
            let mut ids = Vec::with_capacity(arr.len());
            for item in arr {
                let Some(id) = item.as_str() else {
                    return Err(bad_filter(
                        "filters.assessmentIds",
                        "filters.assessmentIds must contain only strings",
                    ));
                };
                ids.push(id.to_string());
            }
            Some(ids)
        }
    };

    Ok(ClassFilters {
        subject_id,
        category_name,
        assessment_ids,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentAverage {
    pub avg_raw: Option<f64>,
    pub avg_percent: Option<f64>,
    pub scored_count: usize,
    pub missing_count: usize,
}

/// Simple mean over the students who have a score. Missing entries are
/// counted but never enter the denominator.
pub fn assessment_average<I>(scores: I, total_marks: f64) -> AssessmentAverage
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum_raw = 0.0_f64;
    let mut scored_count: usize = 0;
    let mut missing_count: usize = 0;

    for s in scores {
        match s {
            Some(v) => {
                scored_count += 1;
                sum_raw += v;
            }
            None => missing_count += 1,
        }
    }

    let avg_raw = (scored_count > 0).then(|| sum_raw / scored_count as f64);
    let avg_percent = avg_raw
        .filter(|_| total_marks > 0.0)
        .map(|raw| 100.0 * raw / total_marks);

    AssessmentAverage {
        avg_raw,
        avg_percent,
        scored_count,
        missing_count,
    }
}

fn compute_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentClassStats {
    pub assessment_id: String,
    pub subject_id: String,
    pub category: String,
    pub total_marks: f64,
    pub avg_raw: Option<f64>,
    pub avg_percent: Option<i64>,
    pub median_percent: Option<f64>,
    pub scored_count: usize,
    pub missing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectClassAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub average: Option<i64>,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAggregate {
    pub roster_size: usize,
    pub filters: ClassFilters,
    #[serde(rename = "perAssessment")]
    pub per_assessment: Vec<AssessmentClassStats>,
    #[serde(rename = "perSubject")]
    pub per_subject: Vec<SubjectClassAverage>,
    #[serde(rename = "perStudent")]
    pub per_student: Vec<StudentSummary>,
    pub overall_average: i64,
    pub letter_grade: LetterGrade,
}

fn assessment_class_stats(
    a: &Assessment,
    roster: &[&str],
    diagnostics: &mut Diagnostics,
) -> AssessmentClassStats {
    let usable = has_usable_total(a, diagnostics);
    // Plain mean over whoever took it; no category weighting at this level.
    // A skipped assessment counts every roster student as missing.
    let stats = assessment_average(
        roster.iter().map(|s| a.score_for(s).filter(|_| usable)),
        a.total_marks,
    );
    let percents: Vec<f64> = if usable {
        roster.iter().filter_map(|s| a.percent_for(s)).collect()
    } else {
        Vec::new()
    };

    AssessmentClassStats {
        assessment_id: a.assessment_id.clone(),
        subject_id: a.subject_id.clone(),
        category: a.category.clone(),
        total_marks: a.total_marks,
        avg_raw: stats.avg_raw.map(round_off_1_decimal),
        avg_percent: stats.avg_percent.map(round_half_up),
        median_percent: compute_median(&percents).map(round_off_1_decimal),
        scored_count: stats.scored_count,
        missing_count: stats.missing_count,
    }
}

/// Roster-wide rollup over the assessments selected by `filters`.
///
/// The overall class average is the mean of the students' overall averages,
/// not a re-weighted recomputation. Duplicate roster ids count once.
pub fn compute_class_aggregate(
    ctx: &CalcContext<'_>,
    roster_student_ids: &[String],
    filters: &ClassFilters,
    policy: OverallPolicy,
    diagnostics: &mut Diagnostics,
) -> ClassAggregate {
    let mut seen = HashSet::new();
    let roster: Vec<&str> = roster_student_ids
        .iter()
        .map(|s| s.as_str())
        .filter(|s| seen.insert(*s))
        .collect();

    let scoped_assessments: Vec<Assessment> = ctx
        .assessments
        .iter()
        .filter(|a| filters.matches(a))
        .cloned()
        .collect();
    let scoped_subjects: Vec<Subject> = ctx
        .subjects
        .iter()
        .filter(|s| {
            filters
                .subject_id
                .as_ref()
                .map(|id| s.subject_id == *id)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    let scoped = CalcContext {
        assessments: &scoped_assessments,
        subjects: &scoped_subjects,
        weights: ctx.weights,
    };

    let per_assessment: Vec<AssessmentClassStats> = scoped_assessments
        .iter()
        .map(|a| assessment_class_stats(a, &roster, diagnostics))
        .collect();

    let per_student: Vec<StudentSummary> = roster
        .iter()
        .map(|s| compute_student_overall(&scoped, s, policy, diagnostics))
        .collect();

    let per_subject: Vec<SubjectClassAverage> = scoped_subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| {
            let scores: Vec<i64> = per_student
                .iter()
                .filter_map(|p| p.subjects.get(i).and_then(|s| s.score))
                .collect();
            SubjectClassAverage {
                subject_id: subject.subject_id.clone(),
                subject_name: subject.display_name.clone(),
                average: mean_rounded(&scores),
                student_count: scores.len(),
            }
        })
        .collect();

    let overalls: Vec<i64> = per_student.iter().map(|p| p.overall_average).collect();
    let overall_average = mean_rounded(&overalls).unwrap_or(0);
    let grade = letter_grade(overall_average as f64);

    tracing::debug!(
        roster = roster.len(),
        assessments = scoped_assessments.len(),
        weights = ctx.weights.len(),
        overall_average,
        letter = grade.as_str(),
        "class aggregate computed"
    );

    ClassAggregate {
        roster_size: roster.len(),
        filters: filters.clone(),
        per_assessment,
        per_subject,
        per_student,
        overall_average,
        letter_grade: grade,
    }
}
