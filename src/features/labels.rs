//! Provider labels and the processed training table

use super::aggregate::ProviderAggregate;
use super::schema::{ProviderFeatures, FEATURE_COUNT, FEATURE_NAMES};
use crate::config::UnmatchedPolicy;
use crate::data::schema::{POTENTIAL_FRAUD, PROVIDER};
use crate::data::ProviderLabel;
use crate::error::{FraudError, Result};
use crate::utils::columns::{f64_values, string_values};
use crate::utils::{DataLoader, DataSaver};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

const SAMPLE_SIZE: usize = 5;

/// Map a raw label to {0, 1}
pub fn encode_label(raw: &str) -> Option<u8> {
    match raw.trim() {
        "Yes" | "1" | "1.0" => Some(1),
        "No" | "0" | "0.0" => Some(0),
        _ => None,
    }
}

/// Providers with a binary label and their feature vectors, in provider id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledFeatureTable {
    pub providers: Vec<String>,
    pub labels: Vec<u8>,
    pub features: Vec<ProviderFeatures>,
}

impl LabeledFeatureTable {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn push(&mut self, provider: impl Into<String>, label: u8, features: ProviderFeatures) {
        self.providers.push(provider.into());
        self.labels.push(label);
        self.features.push(features);
    }

    /// Number of rows labelled 1
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Feature matrix, one row per provider
    pub fn x(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.len(), FEATURE_COUNT));
        for (mut row, features) in x.rows_mut().into_iter().zip(&self.features) {
            row.assign(&Array1::from(features.to_array().to_vec()));
        }
        x
    }

    pub fn y(&self) -> Array1<f64> {
        self.labels.iter().map(|&l| f64::from(l)).collect()
    }

    /// `Provider`, `PotentialFraud`, then the features in model order
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(FEATURE_COUNT + 2);
        columns.push(Column::new(PROVIDER.into(), self.providers.clone()));
        columns.push(Column::new(
            POTENTIAL_FRAUD.into(),
            self.labels.iter().map(|&l| i32::from(l)).collect::<Vec<i32>>(),
        ));
        for (idx, name) in FEATURE_NAMES.iter().enumerate() {
            let values: Vec<f64> = self.features.iter().map(|f| f.to_array()[idx]).collect();
            columns.push(Column::new((*name).into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Read a table written by [`to_dataframe`](Self::to_dataframe)
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let providers = string_values(df, PROVIDER)?;
        let labels = string_values(df, POTENTIAL_FRAUD)?;
        let columns = FEATURE_NAMES
            .iter()
            .map(|name| f64_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut table = LabeledFeatureTable::default();
        let mut failures = Vec::new();
        for row in 0..df.height() {
            let provider = providers[row].clone().unwrap_or_default();
            let label = labels[row].as_deref().and_then(encode_label);
            let mut values = [0.0; FEATURE_COUNT];
            for (idx, column) in columns.iter().enumerate() {
                match column[row] {
                    Some(v) => values[idx] = v,
                    None => failures.push(format!(
                        "row {row} ({provider}): missing {}",
                        FEATURE_NAMES[idx]
                    )),
                }
            }
            match label {
                Some(label) => table.push(provider, label, ProviderFeatures::from_array(values)),
                None => failures.push(format!("row {row} ({provider}): invalid label")),
            }
        }

        if !failures.is_empty() {
            return Err(FraudError::DataQualityError {
                table: "training_data".to_string(),
                failures,
            });
        }
        Ok(table)
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe()?;
        DataSaver::save_csv(&mut df, path)
    }

    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let df = DataLoader::new().load_csv(path)?;
        Self::from_dataframe(&df)
    }
}

/// Joins provider labels onto the aggregated features
#[derive(Debug, Clone, Default)]
pub struct LabelMerger {
    policy: UnmatchedPolicy,
}

impl LabelMerger {
    pub fn new(policy: UnmatchedPolicy) -> Self {
        Self { policy }
    }

    pub fn merge(
        &self,
        aggregates: Vec<ProviderAggregate>,
        labels: &[ProviderLabel],
    ) -> Result<LabeledFeatureTable> {
        let mut encoded: BTreeMap<&str, u8> = BTreeMap::new();
        let mut failures = Vec::new();
        for (row, label) in labels.iter().enumerate() {
            match label.potential_fraud.as_deref().and_then(encode_label) {
                Some(value) => {
                    encoded.insert(label.provider.as_str(), value);
                }
                None => failures.push(format!(
                    "row {row} ({}): label {:?} is not Yes/No",
                    label.provider,
                    label.potential_fraud.as_deref().unwrap_or("")
                )),
            }
        }
        if !failures.is_empty() {
            return Err(FraudError::DataQualityError {
                table: "labels".to_string(),
                failures,
            });
        }

        let mut by_provider: HashMap<String, ProviderFeatures> = aggregates
            .into_iter()
            .map(|a| (a.provider, a.features))
            .collect();

        let label_only: Vec<&str> = encoded
            .keys()
            .copied()
            .filter(|p| !by_provider.contains_key(*p))
            .collect();
        if !label_only.is_empty() {
            if self.policy == UnmatchedPolicy::Drop {
                warn!(providers = label_only.len(), "Labelled providers without claims dropped");
            } else {
                return Err(FraudError::JoinIntegrityError {
                    join: "labels-features".to_string(),
                    unmatched: label_only.len(),
                    sample: label_only.iter().take(SAMPLE_SIZE).map(|p| p.to_string()).collect(),
                });
            }
        }

        let mut table = LabeledFeatureTable::default();
        for (provider, label) in encoded {
            if let Some(mut features) = by_provider.remove(provider) {
                if !features.std_claim_amount.is_finite() {
                    features.std_claim_amount = 0.0;
                }
                table.push(provider, label, features);
            }
        }

        if !by_provider.is_empty() {
            warn!(providers = by_provider.len(), "Providers without a label left out of the training table");
        }

        info!(
            providers = table.len(),
            fraudulent = table.positives(),
            "Labels merged"
        );
        Ok(table)
    }
}
