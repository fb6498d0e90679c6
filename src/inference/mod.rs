//! Model serving boundary
//!
//! Loads a persisted artifact and answers `predict(features) -> {0, 1}` for a
//! single provider feature mapping. Batches are scored in parallel via rayon.

use crate::config::ModelLocator;
use crate::error::{FraudError, Result};
use crate::export::{load_model, ModelMetadata};
use crate::features::ProviderFeatures;
use crate::training::FraudPipeline;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Rows scored per parallel chunk
const BATCH_CHUNK: usize = 256;

/// Human-readable form of a predicted label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Legitimate,
    Fraudulent,
}

impl Verdict {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Verdict::Fraudulent
        } else {
            Verdict::Legitimate
        }
    }

    pub fn label(self) -> u8 {
        match self {
            Verdict::Legitimate => 0,
            Verdict::Fraudulent => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Legitimate => write!(f, "legitimate"),
            Verdict::Fraudulent => write!(f, "fraudulent"),
        }
    }
}

/// Counters since the model was loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub flagged: u64,
    pub error_count: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    flagged: AtomicU64,
    errors: AtomicU64,
}

/// A loaded, ready-to-serve fraud model
#[derive(Debug, Clone)]
pub struct FraudModel {
    pipeline: Arc<FraudPipeline>,
    metadata: ModelMetadata,
    path: PathBuf,
    counters: Arc<Counters>,
}

impl FraudModel {
    /// Load from the first existing candidate location
    pub fn load(locator: &ModelLocator) -> Result<Self> {
        let path = locator.resolve().ok_or_else(|| {
            let tried: Vec<String> = locator
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            FraudError::ModelPersistenceError(format!("no model artifact found (tried {})", tried.join(", ")))
        })?;
        Self::from_path(path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (pipeline, metadata) = load_model(path)?;
        info!(
            path = %path.display(),
            name = %metadata.name,
            trained_at = %metadata.trained_at,
            "Model loaded"
        );
        Ok(Self::from_pipeline(pipeline, metadata, path))
    }

    /// Wrap an in-memory pipeline
    pub fn from_pipeline(pipeline: FraudPipeline, metadata: ModelMetadata, path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            metadata,
            path: path.into(),
            counters: Arc::default(),
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pipeline(&self) -> &FraudPipeline {
        &self.pipeline
    }

    /// 1 for fraudulent, 0 for legitimate
    ///
    /// The mapping must name exactly the model's features.
    pub fn predict(&self, features: &HashMap<String, f64>) -> Result<u8> {
        let result = self.pipeline.predict_one(features);
        self.record(&result);
        debug!(label = ?result.as_ref().ok(), "Prediction served");
        result
    }

    pub fn predict_verdict(&self, features: &HashMap<String, f64>) -> Result<Verdict> {
        self.predict(features).map(Verdict::from_label)
    }

    /// Positive-class probability of one provider
    pub fn predict_proba(&self, features: &HashMap<String, f64>) -> Result<f64> {
        let row = ProviderFeatures::from_map(features)?.to_array();
        let x = Array2::from_shape_vec((1, row.len()), row.to_vec())?;
        let proba = self.pipeline.predict_proba(&x)?;
        proba
            .first()
            .copied()
            .ok_or_else(|| FraudError::TrainingError("empty prediction".to_string()))
    }

    /// Labels for many providers, in input order
    pub fn predict_batch(&self, rows: &[ProviderFeatures]) -> Result<Vec<u8>> {
        let chunks = rows
            .par_chunks(BATCH_CHUNK)
            .map(|chunk| {
                let flat: Vec<f64> = chunk.iter().flat_map(|f| f.to_array()).collect();
                let width = flat.len() / chunk.len().max(1);
                let x = Array2::from_shape_vec((chunk.len(), width), flat)?;
                Ok(self.pipeline.predict(&x)?.to_vec())
            })
            .collect::<Result<Vec<Vec<u8>>>>();

        let labels: Result<Vec<u8>> = chunks.map(|c| c.into_iter().flatten().collect());
        match &labels {
            Ok(l) => {
                self.counters.total.fetch_add(l.len() as u64, Ordering::Relaxed);
                let flagged = l.iter().filter(|&&v| v == 1).count() as u64;
                self.counters.flagged.fetch_add(flagged, Ordering::Relaxed);
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        labels
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_predictions: self.counters.total.load(Ordering::Relaxed),
            flagged: self.counters.flagged.load(Ordering::Relaxed),
            error_count: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    fn record(&self, result: &Result<u8>) {
        match result {
            Ok(label) => {
                self.counters.total.fetch_add(1, Ordering::Relaxed);
                if *label == 1 {
                    self.counters.flagged.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use crate::training::XGBoostConfig;
    use ndarray::Array1;

    fn model() -> FraudModel {
        let n = 40;
        let x = Array2::from_shape_fn((n, FEATURE_COUNT), |(i, j)| {
            if i % 4 == 0 { 100.0 + j as f64 } else { (i % 7) as f64 }
        });
        let y: Array1<f64> = (0..n).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        let mut pipeline = FraudPipeline::new(XGBoostConfig {
            n_estimators: 10,
            max_depth: 2,
            random_state: Some(3),
            ..Default::default()
        });
        pipeline.fit(&x, &y).unwrap();
        FraudModel::from_pipeline(pipeline, ModelMetadata::default(), "memory")
    }

    fn row(value: f64) -> ProviderFeatures {
        let mut values = [value; FEATURE_COUNT];
        if value >= 100.0 {
            for (j, v) in values.iter_mut().enumerate() {
                *v = 100.0 + j as f64;
            }
        }
        ProviderFeatures::from_array(values)
    }

    #[test]
    fn test_predict_mapping() {
        let model = model();
        assert_eq!(model.predict(&row(100.0).to_map()).unwrap(), 1);
        assert_eq!(model.predict(&row(2.0).to_map()).unwrap(), 0);
        assert_eq!(model.predict_verdict(&row(2.0).to_map()).unwrap(), Verdict::Legitimate);

        let p = model.predict_proba(&row(100.0).to_map()).unwrap();
        assert!(p > 0.5 && p <= 1.0);

        let stats = model.stats();
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.flagged, 1);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = model();
        let features = row(3.0).to_map();
        let first = model.predict(&features).unwrap();
        for _ in 0..5 {
            assert_eq!(model.predict(&features).unwrap(), first);
        }
    }

    #[test]
    fn test_bad_mapping_rejected() {
        let model = model();
        let mut features = row(1.0).to_map();
        features.remove("count_inpatient");
        assert!(model.predict(&features).is_err());

        let mut features = row(1.0).to_map();
        features.insert("unexpected".to_string(), 1.0);
        assert!(model.predict(&features).is_err());
        assert_eq!(model.stats().error_count, 2);
    }

    #[test]
    fn test_predict_batch_matches_single() {
        let model = model();
        let rows: Vec<ProviderFeatures> = (0..600).map(|i| row(if i % 3 == 0 { 100.0 } else { 1.0 })).collect();
        let labels = model.predict_batch(&rows).unwrap();
        assert_eq!(labels.len(), 600);
        for (row, label) in rows.iter().zip(&labels).take(10) {
            assert_eq!(model.predict(&row.to_map()).unwrap(), *label);
        }
    }

    #[test]
    fn test_missing_artifact() {
        let locator = ModelLocator::single("/nonexistent/model.bin");
        assert!(matches!(FraudModel::load(&locator), Err(FraudError::ModelPersistenceError(_))));
    }

    #[test]
    fn test_verdict() {
        assert_eq!(Verdict::from_label(1), Verdict::Fraudulent);
        assert_eq!(Verdict::from_label(0).label(), 0);
        assert_eq!(Verdict::Fraudulent.to_string(), "fraudulent");
        assert_eq!(Verdict::Legitimate.to_string(), "legitimate");
    }
}
