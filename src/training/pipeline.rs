//! Scaler plus booster, fitted and applied as one unit

use super::metrics::label_at;
use super::xgboost::{XGBoostClassifier, XGBoostConfig};
use crate::error::{FraudError, Result};
use crate::features::{ProviderFeatures, FEATURE_COUNT, FEATURE_NAMES};
use crate::preprocessing::ColumnScaler;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decision threshold on the positive-class probability
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Preprocessing and classifier over the provider feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudPipeline {
    feature_names: Vec<String>,
    scaler: ColumnScaler,
    classifier: XGBoostClassifier,
    threshold: f64,
}

impl FraudPipeline {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            scaler: ColumnScaler::new(),
            classifier: XGBoostClassifier::new(config),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn config(&self) -> &XGBoostConfig {
        self.classifier.config()
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted() && self.classifier.is_fitted()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let scaled = self.scaler.fit_transform(x)?;
        self.classifier.fit(&scaled, y)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.scaler.transform(x)?;
        self.classifier.predict_proba(&scaled)
    }

    /// Hard labels, 1 where the probability exceeds the threshold
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>> {
        let threshold = self.threshold;
        Ok(self.predict_proba(x)?.mapv(|p| label_at(p, threshold)))
    }

    /// Label of a single provider vector
    pub fn predict_features(&self, features: &ProviderFeatures) -> Result<u8> {
        let x = Array2::from_shape_vec((1, FEATURE_COUNT), features.to_array().to_vec())?;
        self.predict(&x)?
            .first()
            .copied()
            .ok_or_else(|| FraudError::TrainingError("empty prediction".to_string()))
    }

    /// Label of a name -> value mapping holding exactly the model features
    pub fn predict_one(&self, features: &HashMap<String, f64>) -> Result<u8> {
        self.predict_features(&ProviderFeatures::from_map(features)?)
    }

    /// Named importances, largest first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut named: Vec<(String, f64)> = match self.classifier.feature_importances() {
            Some(values) => self.feature_names.iter().cloned().zip(values).collect(),
            None => Vec::new(),
        };
        named.sort_by(|a, b| b.1.total_cmp(&a.1));
        named
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> (FraudPipeline, Array2<f64>) {
        let n = 40;
        let mut x = Array2::zeros((n, FEATURE_COUNT));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let fraud = i % 4 == 0;
            x[[i, 1]] = if fraud { 50.0 + i as f64 } else { 5.0 + (i % 7) as f64 };
            x[[i, 14]] = if fraud { 9000.0 } else { 300.0 + i as f64 };
            y[i] = if fraud { 1.0 } else { 0.0 };
        }
        let mut pipeline = FraudPipeline::new(XGBoostConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        });
        pipeline.fit(&x, &y).unwrap();
        (pipeline, x)
    }

    #[test]
    fn test_fit_and_predict() {
        let (pipeline, x) = fitted();
        assert!(pipeline.is_fitted());
        let labels = pipeline.predict(&x).unwrap();
        assert_eq!(labels[0], 1);
        assert_eq!(labels[1], 0);
        assert!(!pipeline.feature_importances().is_empty());
    }

    #[test]
    fn test_labels_follow_strict_threshold() {
        let (pipeline, x) = fitted();
        let proba = pipeline.predict_proba(&x).unwrap();
        let labels = pipeline.predict(&x).unwrap();
        for (&p, &label) in proba.iter().zip(labels.iter()) {
            assert_eq!(label, u8::from(p > DEFAULT_THRESHOLD));
        }
    }

    #[test]
    fn test_predict_one_is_deterministic() {
        let (pipeline, x) = fitted();
        let row = ProviderFeatures::from_slice(x.row(0).as_slice().unwrap()).unwrap();
        let map = row.to_map();
        let first = pipeline.predict_one(&map).unwrap();
        for _ in 0..5 {
            assert_eq!(pipeline.predict_one(&map).unwrap(), first);
        }
    }

    #[test]
    fn test_predict_one_rejects_incomplete_vector() {
        let (pipeline, _) = fitted();
        let mut map = ProviderFeatures::default().to_map();
        map.remove("mean_age");
        assert!(matches!(pipeline.predict_one(&map), Err(FraudError::FeatureNotFound(_))));
    }

    #[test]
    fn test_unfitted_pipeline() {
        let pipeline = FraudPipeline::new(XGBoostConfig::default());
        assert!(!pipeline.is_fitted());
        assert!(pipeline.predict_features(&ProviderFeatures::default()).is_err());
    }
}
