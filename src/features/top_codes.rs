//! Most frequent admitting diagnoses and physicians

use crate::error::Result;
use crate::processing::Claim;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Length of each ranked list
pub const TOP_N: usize = 20;

/// Ranked reference lists, most frequent first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopCodeSet {
    pub diagnosis_codes: Vec<String>,
    pub attending_physicians: Vec<String>,
    pub operating_physicians: Vec<String>,
}

impl TopCodeSet {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Count values and keep the `n` most frequent.
///
/// Missing values are skipped. Equal counts keep first-seen order.
pub fn rank_by_frequency<'a, I>(values: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for value in values.into_iter().flatten() {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(n)
        .map(|(value, _)| value.to_string())
        .collect()
}

/// Extracts the top-N reference lists from the full claim population
#[derive(Debug, Clone, Default)]
pub struct TopCodeExtractor;

impl TopCodeExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, claims: &[Claim]) -> TopCodeSet {
        let set = TopCodeSet {
            diagnosis_codes: rank_by_frequency(
                claims.iter().map(|c| c.admit_diagnosis_code.as_deref()),
                TOP_N,
            ),
            attending_physicians: rank_by_frequency(
                claims.iter().map(|c| c.attending_physician.as_deref()),
                TOP_N,
            ),
            operating_physicians: rank_by_frequency(
                claims.iter().map(|c| c.operating_physician.as_deref()),
                TOP_N,
            ),
        };

        info!(
            diagnosis = set.diagnosis_codes.len(),
            attending = set.attending_physicians.len(),
            operating = set.operating_physicians.len(),
            "Top codes extracted"
        );
        set
    }
}

/// Hash-set view of a [`TopCodeSet`] for membership tests
#[derive(Debug, Clone, Default)]
pub struct TopCodeLookup {
    diagnosis: HashSet<String>,
    attending: HashSet<String>,
    operating: HashSet<String>,
}

impl TopCodeLookup {
    pub fn new(set: &TopCodeSet) -> Self {
        Self {
            diagnosis: set.diagnosis_codes.iter().cloned().collect(),
            attending: set.attending_physicians.iter().cloned().collect(),
            operating: set.operating_physicians.iter().cloned().collect(),
        }
    }

    pub fn is_top_diagnosis(&self, code: Option<&str>) -> bool {
        code.map_or(false, |c| self.diagnosis.contains(c))
    }

    pub fn is_top_attending(&self, physician: Option<&str>) -> bool {
        physician.map_or(false, |p| self.attending.contains(p))
    }

    pub fn is_top_operating(&self, physician: Option<&str>) -> bool {
        physician.map_or(false, |p| self.operating.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_frequency() {
        let values = vec![Some("b"), Some("a"), None, Some("a"), Some("c"), Some("a"), Some("b")];
        assert_eq!(rank_by_frequency(values, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let values = vec![Some("x"), Some("y"), Some("z"), Some("z"), Some("y"), Some("x"), Some("w")];
        assert_eq!(rank_by_frequency(values.clone(), 2), vec!["x", "y"]);
        assert_eq!(rank_by_frequency(values, 10), vec!["x", "y", "z", "w"]);
    }

    #[test]
    fn test_missing_values_never_ranked() {
        let values: Vec<Option<&str>> = vec![None, None, Some("a")];
        assert_eq!(rank_by_frequency(values, 20), vec!["a"]);
    }

    #[test]
    fn test_extract_caps_each_list() {
        use crate::data::{ClaimRecord, ClaimSource};

        let claims: Vec<Claim> = (0..30)
            .map(|i| {
                let mut claim = Claim::from_record(
                    ClaimRecord::new(format!("CLM{i}"), "BENE1", "PRV1"),
                    ClaimSource::Inpatient,
                );
                claim.admit_diagnosis_code = Some(format!("D{i}"));
                claim.attending_physician = Some(format!("PHY{}", i % 3));
                claim
            })
            .collect();
        let set = TopCodeExtractor::new().extract(&claims);
        assert_eq!(set.diagnosis_codes.len(), TOP_N);
        assert_eq!(set.diagnosis_codes[0], "D0");
        assert_eq!(set.attending_physicians, vec!["PHY0", "PHY1", "PHY2"]);
        assert!(set.operating_physicians.is_empty());
    }

    #[test]
    fn test_lookup() {
        let set = TopCodeSet {
            diagnosis_codes: vec!["4019".to_string()],
            attending_physicians: vec!["PHY1".to_string()],
            operating_physicians: vec![],
        };
        let lookup = TopCodeLookup::new(&set);
        assert!(lookup.is_top_diagnosis(Some("4019")));
        assert!(!lookup.is_top_diagnosis(None));
        assert!(lookup.is_top_attending(Some("PHY1")));
        assert!(!lookup.is_top_operating(Some("PHY1")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_codes.json");
        let set = TopCodeSet {
            diagnosis_codes: vec!["4019".to_string(), "2724".to_string()],
            attending_physicians: vec!["PHY1".to_string()],
            operating_physicians: vec!["PHY2".to_string()],
        };
        set.save(&path).unwrap();
        assert_eq!(TopCodeSet::load(&path).unwrap(), set);
    }
}
