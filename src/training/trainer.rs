//! Final fit on the hold-out split

use super::cross_validation::stratified_train_test_split;
use super::metrics::ClassificationMetrics;
use super::pipeline::FraudPipeline;
use crate::config::SplitConfig;
use crate::error::Result;
use crate::features::LabeledFeatureTable;
use crate::optimizer::{compute_scale_pos_weight, HyperparameterSet};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Importances reported after training
const REPORTED_IMPORTANCES: usize = 10;

/// Fitted pipeline with its held-out evaluation
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: FraudPipeline,
    pub metrics: ClassificationMetrics,
    /// Hyperparameters as fitted, imbalance weight recomputed on this split
    pub params: HyperparameterSet,
    pub train_size: usize,
    pub test_size: usize,
    pub top_features: Vec<(String, f64)>,
}

/// Summary written next to the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub roc_auc: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub train_size: usize,
    pub test_size: usize,
}

impl TrainingOutcome {
    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            roc_auc: self.metrics.roc_auc,
            recall: self.metrics.recall,
            f1_score: self.metrics.f1_score,
            train_size: self.train_size,
            test_size: self.test_size,
        }
    }
}

/// Fits the pipeline with tuned hyperparameters and evaluates it
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    split: SplitConfig,
}

impl ModelTrainer {
    pub fn new(split: SplitConfig) -> Self {
        Self { split }
    }

    pub fn train(&self, table: &LabeledFeatureTable, params: &HyperparameterSet) -> Result<TrainingOutcome> {
        let x = table.x();
        let y = table.y();
        let split = stratified_train_test_split(&y, self.split.test_size, Some(self.split.random_state))?;

        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let params = params
            .clone()
            .with_scale_pos_weight(compute_scale_pos_weight(&y_train)?);
        let mut pipeline = FraudPipeline::new(params.to_config(Some(self.split.random_state)));
        pipeline.fit(&x_train, &y_train)?;

        let proba = pipeline.predict_proba(&x_test)?;
        let metrics = ClassificationMetrics::compute(&y_test, &proba, pipeline.threshold())?;

        let top_features: Vec<(String, f64)> = pipeline
            .feature_importances()
            .into_iter()
            .take(REPORTED_IMPORTANCES)
            .collect();

        info!(
            roc_auc = metrics.roc_auc,
            recall = metrics.recall,
            f1 = metrics.f1_score,
            train_rows = y_train.len(),
            test_rows = y_test.len(),
            "Model trained"
        );

        Ok(TrainingOutcome {
            pipeline,
            metrics,
            params,
            train_size: y_train.len(),
            test_size: y_test.len(),
            top_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ProviderFeatures;

    fn table() -> LabeledFeatureTable {
        let mut table = LabeledFeatureTable::default();
        for i in 0..90 {
            let fraud = i % 9 == 0;
            table.push(
                format!("PRV{i:03}"),
                u8::from(fraud),
                ProviderFeatures {
                    count_unique_claims: if fraud { 60.0 } else { 4.0 + (i % 6) as f64 },
                    mean_claim_amount: if fraud { 5000.0 } else { 400.0 + (i % 11) as f64 },
                    count_unique_beneficiary: 3.0,
                    ..Default::default()
                },
            );
        }
        table
    }

    #[test]
    fn test_train_and_evaluate() {
        let params = HyperparameterSet {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };
        let outcome = ModelTrainer::new(SplitConfig::default()).train(&table(), &params).unwrap();

        assert_eq!(outcome.train_size + outcome.test_size, 90);
        // 3 of 10 positives and 26 of 80 negatives held out
        assert_eq!(outcome.test_size, 29);
        // 54 negatives and 7 positives left: round(54 / 7) = 8
        assert_eq!(outcome.params.scale_pos_weight, 8.0);
        for m in [outcome.metrics.roc_auc, outcome.metrics.recall, outcome.metrics.f1_score] {
            assert!((0.0..=1.0).contains(&m));
        }
        assert!(outcome.metrics.roc_auc > 0.9);
        assert!(outcome.pipeline.is_fitted());
        assert!(outcome.top_features.len() <= REPORTED_IMPORTANCES);
    }
}
