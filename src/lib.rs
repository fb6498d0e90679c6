//! Provider Fraud - Healthcare provider fraud detection pipeline
//!
//! This crate turns raw per-claim billing records into one feature vector
//! per provider and fits a tuned gradient-boosted classifier over them:
//! - Input validation and typed record parsing
//! - Beneficiary and claim processing
//! - Claim-level feature engineering and provider aggregation
//! - Bayesian hyperparameter search with stratified cross-validation
//! - Model training, persistence and single-provider prediction
//!
//! # Modules
//!
//! ## Data pipeline
//! - [`validation`] - Schema and data quality checks per table
//! - [`data`] - Raw record types and column names
//! - [`processing`] - Beneficiary recoding and claim concatenation
//! - [`features`] - Top codes, claim features, joins and aggregation
//!
//! ## Modelling
//! - [`preprocessing`] - Per-column feature scaling
//! - [`training`] - Gradient-boosted trees, CV splits, metrics, trainer
//! - [`optimizer`] - Gaussian-process hyperparameter search
//! - [`export`] - Binary model artifact
//! - [`inference`] - Loaded model and the predict boundary
//!
//! ## Orchestration
//! - [`runner`] - Stage-by-stage pipeline runner
//! - [`tracking`] - Local run records
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Data pipeline
pub mod data;
pub mod validation;
pub mod processing;
pub mod features;

// Modelling
pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod export;
pub mod inference;

// Orchestration
pub mod runner;
pub mod tracking;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{FraudError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling and configuration
    pub use crate::error::{FraudError, Result};
    pub use crate::config::{ModelLocator, PipelineConfig, UnmatchedPolicy};

    // Validation
    pub use crate::validation::{TableRole, ValidationReport, Validator};

    // Records and processing
    pub use crate::data::{BeneficiaryRecord, ClaimRecord, ClaimSource, ProviderLabel};
    pub use crate::processing::{Beneficiary, BeneficiaryProcessor, Claim, ClaimsProcessor};

    // Features
    pub use crate::features::{
        Aggregator, ClaimFeatureBuilder, LabelMerger, LabeledFeatureTable, Merger, ProviderFeatures,
        TopCodeExtractor, TopCodeSet, FEATURE_NAMES,
    };

    // Training and tuning
    pub use crate::optimizer::{HyperparameterSet, HyperparameterTuner, SearchSpace};
    pub use crate::training::{ClassificationMetrics, FraudPipeline, ModelTrainer, XGBoostConfig};

    // Serving
    pub use crate::inference::{FraudModel, Verdict};

    // Orchestration
    pub use crate::runner::{PipelineRunner, RunSummary, Stage};
}
