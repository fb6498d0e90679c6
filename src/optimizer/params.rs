//! Booster hyperparameters and their search space

use super::search_space::{SearchSpace, TrialParams};
use crate::error::{FraudError, Result};
use crate::training::XGBoostConfig;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Search space of the fraud booster
pub fn xgboost_search_space() -> SearchSpace {
    SearchSpace::new()
        .int("n_estimators", 100, 600)
        .float("learning_rate", 0.01, 0.1)
        .int("max_depth", 3, 7)
        .float("subsample", 0.5, 0.9)
        .float("colsample_bytree", 0.5, 0.9)
        .int("min_child_weight", 1, 10)
        .float("gamma", 0.0, 1.0)
        .float("reg_alpha", 0.0, 5.0)
        .float("reg_lambda", 0.0, 5.0)
}

/// round(negatives / positives) over a label vector, at least 1
pub fn compute_scale_pos_weight(y: &Array1<f64>) -> Result<f64> {
    let positives = y.iter().filter(|&&v| v == 1.0).count();
    let negatives = y.len() - positives;
    if positives == 0 {
        return Err(FraudError::NumericError(
            "scale_pos_weight undefined: no positive samples".to_string(),
        ));
    }
    // a majority of positives would round to 0 and disable them
    Ok((negatives as f64 / positives as f64).round().max(1.0))
}

/// A complete booster hyperparameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSet {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub min_child_weight: f64,
    pub gamma: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub scale_pos_weight: f64,
}

impl Default for HyperparameterSet {
    fn default() -> Self {
        let c = XGBoostConfig::default();
        Self {
            n_estimators: c.n_estimators,
            learning_rate: c.learning_rate,
            max_depth: c.max_depth,
            subsample: c.subsample,
            colsample_bytree: c.colsample_bytree,
            min_child_weight: c.min_child_weight,
            gamma: c.gamma,
            reg_alpha: c.reg_alpha,
            reg_lambda: c.reg_lambda,
            scale_pos_weight: c.scale_pos_weight,
        }
    }
}

impl HyperparameterSet {
    /// Build from a sampled trial; every searched parameter must be present
    pub fn from_trial(params: &TrialParams, scale_pos_weight: f64) -> Result<Self> {
        let get = |name: &str| {
            params
                .get(name)
                .copied()
                .ok_or_else(|| FraudError::ConfigError(format!("trial is missing {name}")))
        };
        let count = |name: &str| -> Result<usize> {
            let v = get(name)?.as_int();
            usize::try_from(v).map_err(|_| FraudError::invalid_parameter(name, v, "must be >= 0"))
        };

        Ok(Self {
            n_estimators: count("n_estimators")?,
            learning_rate: get("learning_rate")?.as_float(),
            max_depth: count("max_depth")?,
            subsample: get("subsample")?.as_float(),
            colsample_bytree: get("colsample_bytree")?.as_float(),
            min_child_weight: get("min_child_weight")?.as_float(),
            gamma: get("gamma")?.as_float(),
            reg_alpha: get("reg_alpha")?.as_float(),
            reg_lambda: get("reg_lambda")?.as_float(),
            scale_pos_weight,
        })
    }

    pub fn to_config(&self, random_state: Option<u64>) -> XGBoostConfig {
        XGBoostConfig {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            gamma: self.gamma,
            subsample: self.subsample,
            colsample_bytree: self.colsample_bytree,
            scale_pos_weight: self.scale_pos_weight,
            random_state,
        }
    }

    pub fn with_scale_pos_weight(mut self, weight: f64) -> Self {
        self.scale_pos_weight = weight;
        self
    }

    /// Flat name -> value mapping
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("n_estimators", self.n_estimators as f64),
            ("learning_rate", self.learning_rate),
            ("max_depth", self.max_depth as f64),
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
            ("min_child_weight", self.min_child_weight),
            ("gamma", self.gamma),
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
            ("scale_pos_weight", self.scale_pos_weight),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_scale_pos_weight() {
        let y: Array1<f64> = (0..100).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect();
        assert_eq!(compute_scale_pos_weight(&y).unwrap(), 9.0);
        let y: Array1<f64> = (0..10).map(|i| if i < 3 { 1.0 } else { 0.0 }).collect();
        assert_eq!(compute_scale_pos_weight(&y).unwrap(), 2.0);
        assert!(compute_scale_pos_weight(&Array1::zeros(5)).is_err());
        assert_eq!(compute_scale_pos_weight(&Array1::from_vec(vec![1.0, 1.0, 1.0, 0.0])).unwrap(), 1.0);
        assert_eq!(compute_scale_pos_weight(&Array1::ones(4)).unwrap(), 1.0);
    }

    #[test]
    fn test_from_trial() {
        let space = xgboost_search_space();
        assert_eq!(space.len(), 9);
        let params = space.sample(&mut Xoshiro256PlusPlus::seed_from_u64(42));
        let set = HyperparameterSet::from_trial(&params, 9.0).unwrap();
        assert!((100..=600).contains(&set.n_estimators));
        assert!((3..=7).contains(&set.max_depth));
        assert_eq!(set.scale_pos_weight, 9.0);
        assert!(set.to_config(Some(42)).validate().is_ok());

        let map = set.to_map();
        assert_eq!(map.len(), 10);
        assert_eq!(map["scale_pos_weight"], 9.0);
    }

    #[test]
    fn test_missing_trial_param() {
        let params = TrialParams::new();
        assert!(matches!(
            HyperparameterSet::from_trial(&params, 1.0),
            Err(FraudError::ConfigError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_params.json");
        let set = HyperparameterSet::default().with_scale_pos_weight(9.0);
        set.save(&path).unwrap();
        assert_eq!(HyperparameterSet::load(&path).unwrap(), set);
    }
}
