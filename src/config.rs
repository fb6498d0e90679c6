//! Pipeline configuration
//!
//! Every knob of a run lives in [`PipelineConfig`]. Defaults reproduce the
//! reference setup (stratified 67/33 split with seed 42, five CV folds, a
//! hundred tuning trials); a JSON file can override any subset of fields.

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do with rows that find no counterpart in a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Abort with a join integrity error
    #[default]
    Fail,
    /// Keep the row with missing counterpart fields
    KeepMissing,
    /// Remove the row and log how many were removed
    Drop,
}

/// Locations of the four raw input tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub inpatient: PathBuf,
    pub outpatient: PathBuf,
    pub beneficiary: PathBuf,
    pub labels: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            inpatient: PathBuf::from("data/Train_Inpatientdata-1542865627584.csv"),
            outpatient: PathBuf::from("data/Train_Outpatientdata-1542865627584.csv"),
            beneficiary: PathBuf::from("data/Train_Beneficiarydata-1542865627584.csv"),
            labels: PathBuf::from("data/Train-1542865627584.csv"),
        }
    }
}

impl DataPaths {
    /// Resolve all four tables relative to one directory using the default file names
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let defaults = Self::default();
        let file = |p: &Path| dir.join(p.file_name().unwrap_or(p.as_os_str()));
        Self {
            inpatient: file(&defaults.inpatient),
            outpatient: file(&defaults.outpatient),
            beneficiary: file(&defaults.beneficiary),
            labels: file(&defaults.labels),
        }
    }
}

/// Where run outputs are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Processed training table and top-code reference sets
    pub processed_dir: PathBuf,
    /// Model artifact, best hyperparameters, study log
    pub artifacts_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            processed_dir: PathBuf::from("data/processed"),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

impl OutputConfig {
    pub fn training_table(&self) -> PathBuf {
        self.processed_dir.join("training_data.csv")
    }

    pub fn top_codes(&self) -> PathBuf {
        self.processed_dir.join("top_codes.json")
    }

    pub fn model_artifact(&self) -> PathBuf {
        self.artifacts_dir.join("model.bin")
    }

    pub fn best_params(&self) -> PathBuf {
        self.artifacts_dir.join("best_params.json")
    }

    pub fn study(&self) -> PathBuf {
        self.artifacts_dir.join("study.json")
    }
}

/// Train/test split settings shared by the tuner and the trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.33,
            random_state: 42,
        }
    }
}

/// Hyperparameter search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Fixed trial budget
    pub n_trials: usize,
    /// Stratified CV folds per trial
    pub cv_folds: usize,
    /// Random trials before the Gaussian process takes over
    pub n_startup_trials: usize,
    /// Candidates scored by the acquisition function per trial
    pub n_candidates: usize,
    /// Seed for the fold shuffle and the sampler
    pub random_state: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            n_trials: 100,
            cv_folds: 5,
            n_startup_trials: 10,
            n_candidates: 500,
            random_state: 42,
        }
    }
}

/// Policies for the two joins of the feature pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Claims without a beneficiary record
    pub beneficiary: UnmatchedPolicy,
    /// Labelled providers without any claims
    pub labels: UnmatchedPolicy,
}

/// Local run tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub experiment: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("runs"),
            experiment: "provider-fraud".to_string(),
        }
    }
}

/// Prioritised list of places a model artifact may live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelLocator {
    pub candidates: Vec<PathBuf>,
}

impl Default for ModelLocator {
    fn default() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("/app/model/model.bin"),
                PathBuf::from("model/model.bin"),
                PathBuf::from("artifacts/model.bin"),
            ],
        }
    }
}

impl ModelLocator {
    /// Locator with a single explicit path
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }

    /// Put a path ahead of the existing candidates
    pub fn prefer(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.insert(0, path.into());
        self
    }

    /// First candidate that exists on disk
    pub fn resolve(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
    }
}

/// Full configuration of a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataPaths,
    pub output: OutputConfig,
    pub split: SplitConfig,
    pub tuning: TuningConfig,
    pub joins: JoinConfig,
    pub tracking: TrackingConfig,
    pub model: ModelLocator,
}

impl PipelineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            FraudError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn with_data(mut self, data: DataPaths) -> Self {
        self.data = data;
        self
    }

    pub fn with_output_dirs(
        mut self,
        processed_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        self.output.processed_dir = processed_dir.into();
        self.output.artifacts_dir = artifacts_dir.into();
        self
    }

    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.tuning.n_trials = n;
        self
    }

    pub fn with_cv_folds(mut self, n: usize) -> Self {
        self.tuning.cv_folds = n;
        self
    }

    pub fn with_startup_trials(mut self, n: usize) -> Self {
        self.tuning.n_startup_trials = n;
        self
    }

    pub fn with_beneficiary_policy(mut self, policy: UnmatchedPolicy) -> Self {
        self.joins.beneficiary = policy;
        self
    }

    pub fn with_label_policy(mut self, policy: UnmatchedPolicy) -> Self {
        self.joins.labels = policy;
        self
    }

    pub fn with_tracking(mut self, enabled: bool) -> Self {
        self.tracking.enabled = enabled;
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking.dir = dir.into();
        self
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(FraudError::ConfigError(format!(
                "split.test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.tuning.cv_folds < 2 {
            return Err(FraudError::ConfigError(format!(
                "tuning.cv_folds must be at least 2, got {}",
                self.tuning.cv_folds
            )));
        }
        if self.tuning.n_trials == 0 {
            return Err(FraudError::ConfigError(
                "tuning.n_trials must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
