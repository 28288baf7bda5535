use crate::model::{category_key, AssessmentCategory, CategoryWeights};
use serde_json::json;
use std::collections::HashSet;

pub const DEFAULT_WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightValidationError {
    #[error("category {name:?} weight must be a percentage in [0, 100] (got {weight})")]
    OutOfRange { name: String, weight: f64 },
    #[error("category {name:?} is configured more than once")]
    Duplicate { name: String },
    #[error("category weights must total 100 (got {total})")]
    Total { total: f64 },
}

impl WeightValidationError {
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::OutOfRange { name, weight } => json!({ "category": name, "weight": weight }),
            Self::Duplicate { name } => json!({ "category": name }),
            Self::Total { total } => json!({ "total": total }),
        }
    }
}

pub fn category_total(categories: &[AssessmentCategory]) -> f64 {
    categories.iter().map(|c| c.weight).sum()
}

/// Succeeds iff every weight is a percentage in [0, 100], no name repeats
/// (ignoring case and surrounding whitespace), and the total is 100 within
/// `epsilon`. Returns the total on success so a setup screen can echo it back.
pub fn validate_category_weights(
    categories: &[AssessmentCategory],
    epsilon: f64,
) -> Result<f64, WeightValidationError> {
    let mut seen = HashSet::new();
    for c in categories {
        if !c.weight.is_finite() || !(0.0..=100.0).contains(&c.weight) {
            return Err(WeightValidationError::OutOfRange {
                name: c.name.clone(),
                weight: c.weight,
            });
        }
        if !seen.insert(category_key(&c.name)) {
            return Err(WeightValidationError::Duplicate {
                name: c.name.clone(),
            });
        }
    }
    let total = category_total(categories);
    if (total - 100.0).abs() <= epsilon {
        Ok(total)
    } else {
        Err(WeightValidationError::Total { total })
    }
}

/// Validated percentage record -> weight fractions handed to the engine.
pub fn weights_from_categories(
    categories: &[AssessmentCategory],
    epsilon: f64,
) -> Result<CategoryWeights, WeightValidationError> {
    validate_category_weights(categories, epsilon)?;
    Ok(categories
        .iter()
        .map(|c| (c.name.as_str(), c.weight / 100.0))
        .collect())
}

pub fn default_categories() -> Vec<AssessmentCategory> {
    [
        ("Classwork", 25.0),
        ("Homework", 5.0),
        ("Unit Assessment", 30.0),
        ("End-Semester", 40.0),
    ]
    .into_iter()
    .map(|(name, weight)| AssessmentCategory {
        name: name.to_string(),
        weight,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(items: &[(&str, f64)]) -> Vec<AssessmentCategory> {
        items
            .iter()
            .map(|(n, w)| AssessmentCategory {
                name: n.to_string(),
                weight: *w,
            })
            .collect()
    }

    #[test]
    fn defaults_total_one_hundred() {
        let total = validate_category_weights(&default_categories(), DEFAULT_WEIGHT_EPSILON)
            .expect("defaults valid");
        assert_eq!(total, 100.0);
    }

    #[test]
    fn short_total_is_reported() {
        let c = cats(&[
            ("Classwork", 25.0),
            ("Homework", 5.0),
            ("Unit", 30.0),
            ("End-Semester", 35.0),
        ]);
        let e = validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).expect_err("95 rejected");
        assert_eq!(e, WeightValidationError::Total { total: 95.0 });
        assert!(e.to_string().contains("95"));
        assert_eq!(e.details()["total"], 95.0);
    }

    #[test]
    fn fractional_percentages_within_epsilon_pass() {
        let c = cats(&[("A", 33.3), ("B", 33.3), ("C", 33.4)]);
        assert!(validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).is_ok());
        let c = cats(&[("A", 10.1), ("B", 20.2), ("C", 69.7)]);
        assert!(validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).is_ok());
    }

    #[test]
    fn over_total_rejected() {
        let c = cats(&[("A", 60.0), ("B", 40.5)]);
        assert!(validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).is_err());
        assert!(validate_category_weights(&[], DEFAULT_WEIGHT_EPSILON).is_err());
    }

    #[test]
    fn weights_outside_percent_range_rejected_even_when_total_is_100() {
        let c = cats(&[("A", 150.0), ("B", -50.0)]);
        let e = validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).expect_err("range");
        assert_eq!(
            e,
            WeightValidationError::OutOfRange {
                name: "A".to_string(),
                weight: 150.0
            }
        );
        assert!(e.to_string().contains("\"A\""));
        assert!(weights_from_categories(&c, DEFAULT_WEIGHT_EPSILON).is_err());

        let c = cats(&[("A", 100.0), ("B", f64::NAN)]);
        assert!(matches!(
            validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON),
            Err(WeightValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected_ignoring_case() {
        let c = cats(&[("Homework", 50.0), (" homework", 50.0)]);
        let e = validate_category_weights(&c, DEFAULT_WEIGHT_EPSILON).expect_err("duplicate");
        assert_eq!(
            e,
            WeightValidationError::Duplicate {
                name: " homework".to_string()
            }
        );
        assert_eq!(e.details()["category"], " homework");
        assert!(weights_from_categories(&c, DEFAULT_WEIGHT_EPSILON).is_err());
    }

    #[test]
    fn fractions_are_percent_over_hundred() {
        let w = weights_from_categories(&default_categories(), DEFAULT_WEIGHT_EPSILON)
            .expect("weights");
        assert_eq!(w.get("classwork"), Some(0.25));
        assert_eq!(w.get("End-Semester"), Some(0.4));
        assert_eq!(w.len(), 4);
    }
}
