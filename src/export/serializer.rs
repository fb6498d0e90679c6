//! Binary model artifact
//!
//! The fitted pipeline is bincode-encoded and wrapped in an envelope carrying
//! magic bytes, a format version, metadata and an FNV-1a checksum of the
//! payload.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use crate::error::{FraudError, Result};
use crate::features::FEATURE_NAMES;
use crate::optimizer::HyperparameterSet;
use crate::training::{FraudPipeline, TrainingSummary};

/// Descriptive fields stored next to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub version: String,
    /// RFC 3339 timestamp
    pub trained_at: String,
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub model_type: String,
    pub hyperparameters: BTreeMap<String, f64>,
    pub metrics: BTreeMap<String, f64>,
    pub extra: BTreeMap<String, String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "provider-fraud".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: String::new(),
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            target_name: "PotentialFraud".to_string(),
            model_type: "xgboost_classifier".to_string(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl ModelMetadata {
    /// Stamp with the current time
    pub fn trained_now(mut self) -> Self {
        self.trained_at = Utc::now().to_rfc3339();
        self
    }

    pub fn with_hyperparameters(mut self, params: &HyperparameterSet) -> Self {
        self.hyperparameters = params.to_map();
        self
    }

    pub fn with_summary(mut self, summary: &TrainingSummary) -> Self {
        self.metrics.insert("roc_auc".to_string(), summary.roc_auc);
        self.metrics.insert("recall".to_string(), summary.recall);
        self.metrics.insert("f1_score".to_string(), summary.f1_score);
        self.extra.insert("train_size".to_string(), summary.train_size.to_string());
        self.extra.insert("test_size".to_string(), summary.test_size.to_string());
        self
    }

    pub fn add_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedModel {
    magic: [u8; 4],
    format_version: u32,
    metadata: ModelMetadata,
    model_data: Vec<u8>,
    checksum: u64,
}

impl SerializedModel {
    const MAGIC: [u8; 4] = *b"PFRD";
    const VERSION: u32 = 1;

    fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = fnv1a(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(FraudError::ModelPersistenceError(
                "not a provider-fraud model artifact".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(FraudError::ModelPersistenceError(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if fnv1a(&self.model_data) != self.checksum {
            return Err(FraudError::ModelPersistenceError(
                "checksum verification failed, artifact may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn persistence<E: std::fmt::Display>(context: &str) -> impl Fn(E) -> FraudError + '_ {
    move |e| FraudError::ModelPersistenceError(format!("{context}: {e}"))
}

/// Write a fitted pipeline to `path`
pub fn save_model(pipeline: &FraudPipeline, metadata: ModelMetadata, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !pipeline.is_fitted() {
        return Err(FraudError::ModelNotFitted);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persistence("failed to create artifact directory"))?;
    }

    let model_data = bincode::serialize(pipeline).map_err(persistence("failed to encode model"))?;
    let envelope = SerializedModel::new(metadata, model_data);

    let file = File::create(path).map_err(persistence("failed to create artifact"))?;
    bincode::serialize_into(BufWriter::new(file), &envelope)
        .map_err(persistence("failed to write artifact"))?;

    info!(path = %path.display(), bytes = envelope.model_data.len(), "Model saved");
    Ok(())
}

/// Read a pipeline written by [`save_model`]
pub fn load_model(path: impl AsRef<Path>) -> Result<(FraudPipeline, ModelMetadata)> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| FraudError::ModelPersistenceError(format!("cannot open {}: {e}", path.display())))?;
    let envelope: SerializedModel = bincode::deserialize_from(BufReader::new(file))
        .map_err(persistence("failed to decode artifact"))?;
    envelope.verify()?;

    let pipeline: FraudPipeline =
        bincode::deserialize(&envelope.model_data).map_err(persistence("failed to decode model"))?;

    if pipeline.feature_names() != FEATURE_NAMES.as_slice() {
        return Err(FraudError::ModelPersistenceError(format!(
            "artifact expects {} features that do not match this build",
            pipeline.feature_names().len()
        )));
    }
    if !pipeline.is_fitted() {
        return Err(FraudError::ModelPersistenceError("artifact holds an unfitted model".to_string()));
    }

    Ok((pipeline, envelope.metadata))
}
