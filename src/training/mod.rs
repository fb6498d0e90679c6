//! Model training module
//!
//! Provides the pieces used to fit and evaluate the fraud classifier:
//! - Gradient-boosted trees (XGBoost-style binary classifier)
//! - Stratified K-fold and train/test splitting
//! - ROC AUC and confusion-matrix metrics
//! - The scaler plus booster pipeline and the final trainer

pub mod cross_validation;
pub mod metrics;
pub mod pipeline;
pub mod trainer;
pub mod xgboost;

pub use cross_validation::{stratified_train_test_split, CVSplit, CVStrategy, CrossValidator, TrainTestSplit};
pub use metrics::{label_at, roc_auc, ClassificationMetrics, ConfusionCounts};
pub use pipeline::{FraudPipeline, DEFAULT_THRESHOLD};
pub use trainer::{ModelTrainer, TrainingOutcome, TrainingSummary};
pub use xgboost::{XGBoostClassifier, XGBoostConfig};
