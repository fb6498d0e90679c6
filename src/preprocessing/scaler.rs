//! Per-column feature scaling

use crate::error::{FraudError, Result};
use crate::features::FEATURE_NAMES;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Monetary and skewed columns, z-scored
pub const STANDARD_SCALED: [&str; 10] = [
    "mean_age",
    "mean_claim_amount",
    "total_claim_amount",
    "std_claim_amount",
    "mean_hospital_stay_days",
    "max_hospital_stay_days",
    "mean_annual_inpatient_reimbursement",
    "mean_annual_inpatient_deductible",
    "mean_annual_outpatient_reimbursement",
    "mean_annual_outpatient_deductible",
];

/// Count-type columns, scaled to [0, 1]
pub const MINMAX_SCALED: [&str; 18] = [
    "count_unique_beneficiary",
    "count_unique_claims",
    "claims_per_bene",
    "count_unique_states",
    "count_unique_counties",
    "total_top_diagnosis_codes",
    "mean_total_diagnosis",
    "mean_total_procedures",
    "mean_number_of_physicians",
    "mean_difference_stay_vs_claim",
    "count_inpatient",
    "count_outpatient",
    "count_of_males",
    "count_of_females",
    "count_of_black_people",
    "count_of_white_people",
    "count_of_hispanic_people",
    "count_of_other_people",
];

/// Type of scaler applied to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// (x - mean) / std, population std
    Standard,
    /// (x - min) / (max - min)
    MinMax,
    /// Left unchanged
    Passthrough,
}

impl ScalerType {
    /// Scaler assigned to a provider feature
    pub fn for_feature(name: &str) -> Self {
        if STANDARD_SCALED.contains(&name) {
            ScalerType::Standard
        } else if MINMAX_SCALED.contains(&name) {
            ScalerType::MinMax
        } else {
            ScalerType::Passthrough
        }
    }
}

/// Fitted parameters of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    center: f64, // mean or min
    scale: f64,  // std or range
}

impl ScalerParams {
    const IDENTITY: ScalerParams = ScalerParams {
        center: 0.0,
        scale: 1.0,
    };

    fn fit(scaler_type: ScalerType, column: ArrayView1<f64>) -> Self {
        if column.is_empty() {
            return Self::IDENTITY;
        }
        match scaler_type {
            ScalerType::Standard => {
                let n = column.len() as f64;
                let mean = column.sum() / n;
                let std = (column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            }
            ScalerType::Passthrough => Self::IDENTITY,
        }
    }

    #[inline]
    fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

/// Column-wise scaler over the provider feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    types: Vec<ScalerType>,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Default for ColumnScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnScaler {
    /// Scaler for the provider features in model input order
    pub fn new() -> Self {
        Self::with_types(FEATURE_NAMES.iter().map(|n| ScalerType::for_feature(n)).collect())
    }

    pub fn with_types(types: Vec<ScalerType>) -> Self {
        Self {
            types,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn scaler_types(&self) -> &[ScalerType] {
        &self.types
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.types.len() {
            return Err(FraudError::ShapeError {
                expected: format!("{} columns", self.types.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.check_width(x)?;
        self.params = self
            .types
            .iter()
            .zip(x.axis_iter(Axis(1)))
            .map(|(&t, column)| ScalerParams::fit(t, column))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(FraudError::ModelNotFitted);
        }
        self.check_width(x)?;

        let mut out = x.clone();
        for (mut column, params) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            column.mapv_inplace(|v| params.apply(v));
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{feature_index, FEATURE_COUNT};
    use ndarray::array;

    #[test]
    fn test_standard_scaler_uses_population_std() {
        let x = array![[1.0, 10.0], [3.0, 10.0]];
        let mut scaler = ColumnScaler::with_types(vec![ScalerType::Standard, ScalerType::Standard]);
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(out[[0, 0]], -1.0);
        assert_eq!(out[[1, 0]], 1.0);
        // constant column: zero std becomes 1
        assert_eq!(out[[0, 1]], 0.0);
    }

    #[test]
    fn test_minmax_and_passthrough() {
        let x = array![[2.0, 7.0], [4.0, -3.0], [6.0, 0.5]];
        let mut scaler = ColumnScaler::with_types(vec![ScalerType::MinMax, ScalerType::Passthrough]);
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(out.column(1).to_vec(), vec![7.0, -3.0, 0.5]);
    }

    #[test]
    fn test_feature_assignment() {
        let scaler = ColumnScaler::new();
        let types = scaler.scaler_types();
        assert_eq!(types.len(), FEATURE_COUNT);
        assert_eq!(types[feature_index("mean_claim_amount").unwrap()], ScalerType::Standard);
        assert_eq!(types[feature_index("claims_per_bene").unwrap()], ScalerType::MinMax);
        assert_eq!(types[feature_index("count_alzheimer").unwrap()], ScalerType::Passthrough);
        assert_eq!(types[feature_index("count_of_unknown_people").unwrap()], ScalerType::Passthrough);
        for name in STANDARD_SCALED.iter().chain(MINMAX_SCALED.iter()) {
            assert!(feature_index(name).is_some(), "{name} is not a feature");
        }
    }

    #[test]
    fn test_transform_requires_fit_and_width() {
        let scaler = ColumnScaler::new();
        assert!(matches!(
            scaler.transform(&Array2::zeros((1, FEATURE_COUNT))),
            Err(FraudError::ModelNotFitted)
        ));
        let mut scaler = ColumnScaler::new();
        assert!(matches!(
            scaler.fit(&Array2::zeros((2, 3))),
            Err(FraudError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_fitted_scalers_compare_by_params() {
        let x = array![[1.0, 2.0], [3.0, 8.0]];
        let types = vec![ScalerType::Standard, ScalerType::MinMax];
        let mut a = ColumnScaler::with_types(types.clone());
        let mut b = ColumnScaler::with_types(types.clone());
        a.fit(&x).unwrap();
        b.fit(&x).unwrap();
        assert_eq!(a, b);

        b.fit(&array![[1.0, 2.0], [5.0, 8.0]]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, ColumnScaler::with_types(types));
    }
}
