//! Hyperparameter optimization
//!
//! A Gaussian-process sampler proposes booster configurations and the
//! [`HyperparameterTuner`] scores them by cross-validated ROC AUC.

pub mod gaussian_process;
pub mod params;
pub mod search_space;
pub mod tuner;

pub use gaussian_process::{GPSampler, GaussianProcess, Matern52};
pub use params::{compute_scale_pos_weight, xgboost_search_space, HyperparameterSet};
pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
pub use tuner::{run_trials, HyperparameterTuner, Study, TrialResult, TrialState, TuningOutcome};

use crate::error::Result;

/// Proposes the next configuration from the trials seen so far
pub trait Sampler: Send {
    fn sample(&mut self, space: &SearchSpace, history: &[(TrialParams, f64)]) -> Result<TrialParams>;
}
