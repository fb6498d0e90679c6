//! Cross-validated hyperparameter search
//!
//! Every trial fits the scaler plus booster pipeline on each stratified fold
//! of the training split and scores it by mean ROC AUC. Folds run in parallel.
//! A trial that fails is recorded with a score of 0 and the search moves on.

use super::gaussian_process::GPSampler;
use super::params::{compute_scale_pos_weight, xgboost_search_space, HyperparameterSet};
use super::search_space::{SearchSpace, TrialParams};
use super::Sampler;
use crate::config::{SplitConfig, TuningConfig};
use crate::error::{FraudError, Result};
use crate::features::LabeledFeatureTable;
use crate::training::cross_validation::{stratified_train_test_split, CVSplit, CVStrategy, CrossValidator};
use crate::training::metrics::roc_auc;
use crate::training::FraudPipeline;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Score recorded for a failed trial
pub const FAILED_TRIAL_SCORE: f64 = 0.0;

/// Outcome of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Complete,
    Failed,
}

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: TrialParams,
    /// Mean CV ROC AUC, or the failure score
    pub value: f64,
    pub state: TrialState,
    pub error: Option<String>,
    pub duration_secs: f64,
}

/// All trials of one search, maximizing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    pub best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.and_then(|idx| self.trials.get(idx))
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| t.state == TrialState::Failed).count()
    }

    /// Add a trial; only completed trials can become the best
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        let is_better = result.state == TrialState::Complete
            && self.best_value().map_or(true, |best| result.value > best);
        if is_better {
            self.best_trial_idx = Some(idx);
        }
        self.trials.push(result);
    }

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

/// Best hyperparameters and the search that found them
#[derive(Debug, Clone)]
pub struct TuningOutcome {
    /// Includes the imbalance weight of the training split
    pub best_params: HyperparameterSet,
    pub best_score: f64,
    pub study: Study,
}

/// Bayesian search over the booster hyperparameters
#[derive(Debug, Clone)]
pub struct HyperparameterTuner {
    tuning: TuningConfig,
    split: SplitConfig,
    space: SearchSpace,
}

impl HyperparameterTuner {
    pub fn new(tuning: TuningConfig, split: SplitConfig) -> Self {
        Self {
            tuning,
            split,
            space: xgboost_search_space(),
        }
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    pub fn tune(&self, table: &LabeledFeatureTable) -> Result<TuningOutcome> {
        self.space.validate()?;
        if self.tuning.n_trials == 0 {
            return Err(FraudError::ConfigError("n_trials must be > 0".to_string()));
        }

        let x = table.x();
        let y = table.y();
        let split = stratified_train_test_split(&y, self.split.test_size, Some(self.split.random_state))?;
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);

        let scale_pos_weight = compute_scale_pos_weight(&y_train)?;
        let folds = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.tuning.cv_folds,
            shuffle: true,
        })
        .with_random_state(self.tuning.random_state)
        .split(&y_train)?;

        info!(
            train_rows = y_train.len(),
            folds = folds.len(),
            trials = self.tuning.n_trials,
            scale_pos_weight,
            "Starting hyperparameter search"
        );

        let mut sampler = GPSampler::new(Some(self.tuning.random_state))
            .with_n_startup(self.tuning.n_startup_trials)
            .with_n_candidates(self.tuning.n_candidates);
        let study = run_trials(&self.space, self.tuning.n_trials, &mut sampler, |params| {
            self.evaluate(params, scale_pos_weight, &x_train, &y_train, &folds)
        })?;

        let best = study.best_trial().ok_or_else(|| {
            FraudError::TrainingError(format!("all {} tuning trials failed", study.trials.len()))
        })?;
        let best_score = best.value;
        let best_params = HyperparameterSet::from_trial(&best.params, scale_pos_weight)?;

        info!(
            best_score,
            best_trial = best.trial_id,
            failed = study.n_failed(),
            elapsed_secs = study.total_duration_secs,
            "Hyperparameter search finished"
        );

        Ok(TuningOutcome {
            best_params,
            best_score,
            study,
        })
    }

    /// Mean ROC AUC of one configuration across the folds
    fn evaluate(
        &self,
        params: &TrialParams,
        scale_pos_weight: f64,
        x: &Array2<f64>,
        y: &Array1<f64>,
        folds: &[CVSplit],
    ) -> Result<f64> {
        let config = HyperparameterSet::from_trial(params, scale_pos_weight)?
            .to_config(Some(self.tuning.random_state));
        config.validate()?;

        let scores = folds
            .par_iter()
            .map(|fold| {
                let mut pipeline = FraudPipeline::new(config.clone());
                pipeline.fit(
                    &x.select(Axis(0), &fold.train_indices),
                    &y.select(Axis(0), &fold.train_indices),
                )?;
                let proba = pipeline.predict_proba(&x.select(Axis(0), &fold.test_indices))?;
                roc_auc(&y.select(Axis(0), &fold.test_indices), &proba)
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Run `n_trials` sampled trials, recording failures instead of aborting
pub fn run_trials<S, F>(space: &SearchSpace, n_trials: usize, sampler: &mut S, mut objective: F) -> Result<Study>
where
    S: Sampler + ?Sized,
    F: FnMut(&TrialParams) -> Result<f64>,
{
    let mut study = Study::new();
    let mut history: Vec<(TrialParams, f64)> = Vec::new();
    let start = Instant::now();

    for trial_id in 0..n_trials {
        let trial_start = Instant::now();
        let params = sampler.sample(space, &history)?;

        let (value, state, error) = match objective(&params) {
            Ok(score) => (score, TrialState::Complete, None),
            Err(err) => {
                let err = FraudError::TuningTrialError {
                    trial: trial_id,
                    reason: err.to_string(),
                };
                warn!(error = %err, "Trial failed");
                (FAILED_TRIAL_SCORE, TrialState::Failed, Some(err.to_string()))
            }
        };

        history.push((params.clone(), value));
        study.add_trial(TrialResult {
            trial_id,
            params,
            value,
            state,
            error,
            duration_secs: trial_start.elapsed().as_secs_f64(),
        });

        debug!(
            trial = trial_id,
            value,
            best = study.best_value().unwrap_or(FAILED_TRIAL_SCORE),
            "Trial finished"
        );
    }
    study.total_duration_secs = start.elapsed().as_secs_f64();
    Ok(study)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ProviderFeatures;
    use crate::optimizer::search_space::ParameterValue;

    fn table(n: usize) -> LabeledFeatureTable {
        let mut table = LabeledFeatureTable::default();
        for i in 0..n {
            let fraud = i % 5 == 0;
            let features = ProviderFeatures {
                count_unique_claims: if fraud { 40.0 + (i % 3) as f64 } else { 3.0 + (i % 4) as f64 },
                total_claim_amount: if fraud { 20000.0 } else { 800.0 + i as f64 },
                count_unique_beneficiary: 2.0,
                ..Default::default()
            };
            table.push(format!("PRV{i:03}"), u8::from(fraud), features);
        }
        table
    }

    fn small_space(learning_rate: (f64, f64)) -> SearchSpace {
        SearchSpace::new()
            .int("n_estimators", 5, 15)
            .float("learning_rate", learning_rate.0, learning_rate.1)
            .int("max_depth", 2, 3)
            .float("subsample", 0.7, 0.9)
            .float("colsample_bytree", 0.7, 0.9)
            .int("min_child_weight", 1, 2)
            .float("gamma", 0.0, 0.5)
            .float("reg_alpha", 0.0, 1.0)
            .float("reg_lambda", 0.5, 2.0)
    }

    fn tuner(n_trials: usize) -> HyperparameterTuner {
        let tuning = TuningConfig {
            n_trials,
            cv_folds: 3,
            n_startup_trials: 2,
            n_candidates: 50,
            ..Default::default()
        };
        HyperparameterTuner::new(tuning, SplitConfig::default())
            .with_search_space(small_space((0.05, 0.3)))
    }

    #[test]
    fn test_tune_separable_data() {
        let outcome = tuner(4).tune(&table(60)).unwrap();
        assert_eq!(outcome.study.trials.len(), 4);
        assert!(outcome.best_score > 0.9, "best = {}", outcome.best_score);
        // 40 train rows, 8 positive
        assert_eq!(outcome.best_params.scale_pos_weight, 4.0);
        assert!(outcome.best_params.to_map().contains_key("scale_pos_weight"));
    }

    #[test]
    fn test_failed_trials_do_not_abort() {
        // learning_rate above 1 is rejected by the booster
        let space = small_space((1.5, 2.0));
        let err = tuner(3).with_search_space(space).tune(&table(60)).unwrap_err();
        assert!(matches!(err, FraudError::TrainingError(_)));
    }

    /// Replays fixed learning rates in order
    struct ScriptedSampler {
        rates: Vec<f64>,
        seen: Vec<usize>,
    }

    impl Sampler for ScriptedSampler {
        fn sample(&mut self, _space: &SearchSpace, history: &[(TrialParams, f64)]) -> Result<TrialParams> {
            self.seen.push(history.len());
            let mut params = TrialParams::new();
            params.insert("learning_rate".to_string(), ParameterValue::Float(self.rates[history.len()]));
            Ok(params)
        }
    }

    #[test]
    fn test_mixed_trials_keep_best_completed() {
        let space = SearchSpace::new().float("learning_rate", 0.01, 2.0);
        let mut sampler = ScriptedSampler {
            rates: vec![1.5, 0.1, 2.0, 0.3, 0.2],
            seen: Vec::new(),
        };
        let study = run_trials(&space, 5, &mut sampler, |params| {
            let lr = params["learning_rate"].as_float();
            if lr > 1.0 {
                return Err(FraudError::TrainingError(format!("learning_rate {lr} out of range")));
            }
            Ok(0.5 + lr)
        })
        .unwrap();

        assert_eq!(sampler.seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(study.trials.len(), 5);
        assert_eq!(study.n_failed(), 2);
        for id in [0, 2] {
            let trial = &study.trials[id];
            assert_eq!(trial.state, TrialState::Failed);
            assert_eq!(trial.value, FAILED_TRIAL_SCORE);
            assert!(trial.error.as_deref().unwrap().contains("out of range"));
        }
        let best = study.best_trial().unwrap();
        assert_eq!(best.trial_id, 3);
        assert_eq!(best.state, TrialState::Complete);
        assert!((best.value - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_study_tracks_best_completed_trial() {
        let mut study = Study::new();
        let trial = |id, value, state| TrialResult {
            trial_id: id,
            params: TrialParams::new(),
            value,
            state,
            error: None,
            duration_secs: 0.0,
        };
        study.add_trial(trial(0, 0.7, TrialState::Complete));
        study.add_trial(trial(1, 0.0, TrialState::Failed));
        study.add_trial(trial(2, 0.9, TrialState::Complete));
        study.add_trial(trial(3, 0.8, TrialState::Complete));
        assert_eq!(study.best_trial().unwrap().trial_id, 2);
        assert_eq!(study.n_failed(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.json");
        study.save(&path).unwrap();
        assert_eq!(Study::load(&path).unwrap().trials.len(), 4);
    }
}
