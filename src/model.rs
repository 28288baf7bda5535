use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentCategory {
    pub name: String,
    /// Percentage in [0, 100].
    pub weight: f64,
}

/// One gradable event. Category is referenced by name only, so it may no
/// longer exist in the current configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub assessment_id: String,
    pub subject_id: String,
    pub category: String,
    pub total_marks: f64,
    /// `null` and absent entries both mean the student did not take it.
    #[serde(default)]
    pub scores: HashMap<String, Option<f64>>,
}

impl Assessment {
    pub fn score_for(&self, student_id: &str) -> Option<f64> {
        self.scores.get(student_id).copied().flatten()
    }

    pub fn percent_for(&self, student_id: &str) -> Option<f64> {
        self.score_for(student_id).map(|v| 100.0 * v / self.total_marks)
    }
}

pub(crate) fn category_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Category name -> weight fraction in [0, 1].
///
/// Lookup ignores case and surrounding whitespace so historical assessments
/// keep matching after a category is re-cased in the configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights {
    by_key: BTreeMap<String, (String, f64)>,
}

impl CategoryWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, fraction: f64) {
        self.by_key
            .insert(category_key(name), (name.trim().to_string(), fraction));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.by_key.get(&category_key(name)).map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.by_key.values().map(|(n, w)| (n.as_str(), *w))
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, w) in iter {
            out.insert(name.as_ref(), w);
        }
        out
    }
}

impl Serialize for CategoryWeights {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, f64> = self.iter().collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryWeights {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}
