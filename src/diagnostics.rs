use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Data-integrity warnings. Never fatal: the offending assessment is left out
/// of the computation and the rest of the result is still produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    #[serde(rename_all = "camelCase")]
    NonPositiveTotalMarks {
        assessment_id: String,
        total_marks: f64,
    },
    #[serde(rename_all = "camelCase")]
    UnknownCategory {
        assessment_id: String,
        category: String,
    },
}

impl Diagnostic {
    pub fn non_positive_total_marks(assessment_id: &str, total_marks: f64) -> Self {
        Self::NonPositiveTotalMarks {
            assessment_id: assessment_id.to_string(),
            total_marks,
        }
    }

    pub fn unknown_category(assessment_id: &str, category: &str) -> Self {
        Self::UnknownCategory {
            assessment_id: assessment_id.to_string(),
            category: category.to_string(),
        }
    }
}

// Ordered by kind, then assessment; totalMarks compares by `total_cmp` so the
// set stays a total order.
impl Ord for Diagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Self::NonPositiveTotalMarks {
                    assessment_id: a,
                    total_marks: ta,
                },
                Self::NonPositiveTotalMarks {
                    assessment_id: b,
                    total_marks: tb,
                },
            ) => a.cmp(b).then_with(|| ta.total_cmp(tb)),
            (
                Self::UnknownCategory {
                    assessment_id: a,
                    category: ca,
                },
                Self::UnknownCategory {
                    assessment_id: b,
                    category: cb,
                },
            ) => a.cmp(b).then_with(|| ca.cmp(cb)),
            (Self::NonPositiveTotalMarks { .. }, Self::UnknownCategory { .. }) => Ordering::Less,
            (Self::UnknownCategory { .. }, Self::NonPositiveTotalMarks { .. }) => {
                Ordering::Greater
            }
        }
    }
}

impl PartialOrd for Diagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Diagnostic {}

/// One entry per (assessment, kind), however many students hit it.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    seen: BTreeSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, d: Diagnostic) {
        if self.seen.contains(&d) {
            return;
        }
        match &d {
            Diagnostic::NonPositiveTotalMarks {
                assessment_id,
                total_marks,
            } => tracing::warn!(
                assessment_id = %assessment_id,
                total_marks = *total_marks,
                "skipping assessment with non-positive totalMarks"
            ),
            Diagnostic::UnknownCategory {
                assessment_id,
                category,
            } => tracing::warn!(
                assessment_id = %assessment_id,
                category = %category,
                "assessment category not configured; contributes zero weight"
            ),
        }
        self.seen.insert(d);
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.seen.into_iter().collect()
    }
}
