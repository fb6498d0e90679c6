//! Stratified splitting for tuning and evaluation

use crate::error::{FraudError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
    }
}

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Sample indices per class, classes in ascending order
fn class_indices(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        classes.entry(val.round() as i64).or_default().push(idx);
    }
    classes
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn stratified_k_fold_split(
        &self,
        y: &Array1<f64>,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        if n_splits < 2 {
            return Err(FraudError::invalid_parameter("n_splits", n_splits, "must be at least 2"));
        }

        let mut classes = class_indices(y);
        if let Some((class, members)) = classes.iter().find(|(_, m)| m.len() < n_splits) {
            return Err(FraudError::DataError(format!(
                "class {} has {} samples, fewer than {} folds",
                class,
                members.len(),
                n_splits
            )));
        }

        if shuffle {
            let mut rng = seeded_rng(self.random_state);
            for indices in classes.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // round-robin per class keeps the class ratio in every fold
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for indices in classes.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let mut test_indices = folds[fold_idx].clone();
                test_indices.sort_unstable();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Train and test indices of a single stratified hold-out split
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Stratified shuffled hold-out split.
///
/// Each class contributes `round(test_size * n_class)` samples to the test
/// side, clamped so that a class with two or more samples appears on both sides.
pub fn stratified_train_test_split(
    y: &Array1<f64>,
    test_size: f64,
    random_state: Option<u64>,
) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FraudError::invalid_parameter("test_size", test_size, "must be in (0, 1)"));
    }
    if y.len() < 2 {
        return Err(FraudError::DataError(format!(
            "cannot split {} samples into train and test",
            y.len()
        )));
    }

    let mut rng = seeded_rng(random_state);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for (_, mut members) in class_indices(y) {
        members.shuffle(&mut rng);
        let n = members.len();
        let mut n_test = (test_size * n as f64).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        }
        test_indices.extend_from_slice(&members[..n_test]);
        train_indices.extend_from_slice(&members[n_test..]);
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();
    Ok(TrainTestSplit {
        train_indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pos: usize, neg: usize) -> Array1<f64> {
        (0..pos + neg).map(|i| if i < pos { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = labels(10, 40);
        let cv = CrossValidator::new(CVStrategy::default()).with_random_state(42);
        let splits = cv.split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 10);
            assert_eq!(split.train_indices.len(), 40);
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 2);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_is_reproducible() {
        let y = labels(7, 23);
        let cv = CrossValidator::new(CVStrategy::default()).with_random_state(42);
        assert_eq!(cv.split(&y).unwrap(), cv.split(&y).unwrap());
    }

    #[test]
    fn test_too_few_class_members() {
        let y = labels(3, 20);
        let cv = CrossValidator::new(CVStrategy::default()).with_random_state(42);
        assert!(cv.split(&y).is_err());
    }

    #[test]
    fn test_train_test_split() {
        let y = labels(30, 70);
        let split = stratified_train_test_split(&y, 0.33, Some(42)).unwrap();
        assert_eq!(split.test_indices.len(), 33);
        assert_eq!(split.train_indices.len(), 67);
        let test_pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 10);

        let again = stratified_train_test_split(&y, 0.33, Some(42)).unwrap();
        assert_eq!(split, again);
    }

    #[test]
    fn test_split_keeps_small_class_on_both_sides() {
        let y = labels(2, 10);
        let split = stratified_train_test_split(&y, 0.1, Some(1)).unwrap();
        assert!(split.test_indices.iter().any(|&i| y[i] == 1.0));
        assert!(split.train_indices.iter().any(|&i| y[i] == 1.0));
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(stratified_train_test_split(&labels(5, 5), 1.0, Some(1)).is_err());
    }
}
