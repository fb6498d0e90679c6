//! Binary classification metrics

use crate::error::{FraudError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Hard label for a positive-class probability; the threshold itself is negative
pub fn label_at(probability: f64, threshold: f64) -> u8 {
    u8::from(probability > threshold)
}

/// Confusion counts at a fixed threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1_score(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.tp + self.tn + self.fp + self.fn_)
    }
}

/// Zero denominators score 0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve from scores, ties share their average rank
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_score.len() {
        return Err(FraudError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", y_score.len()),
        });
    }
    if y_score.iter().any(|s| !s.is_finite()) {
        return Err(FraudError::NumericError("scores contain non-finite values".to_string()));
    }

    let n_pos = y_true.iter().filter(|&&t| t >= 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(FraudError::NumericError(
            "ROC AUC needs both classes in y_true".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        // ranks are 1-based: start + 1 ..= end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] >= 0.5).count();
        pos_rank_sum += avg_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Held-out metrics of a trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub roc_auc: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub precision: f64,
    pub accuracy: f64,
}

impl ClassificationMetrics {
    /// Metrics from positive-class probabilities, hard labels at `threshold`
    pub fn compute(y_true: &Array1<f64>, y_prob: &Array1<f64>, threshold: f64) -> Result<Self> {
        let y_pred = y_prob.mapv(|p| f64::from(label_at(p, threshold)));
        let counts = ConfusionCounts::from_predictions(y_true, &y_pred);
        Ok(Self {
            roc_auc: roc_auc(y_true, y_prob)?,
            recall: counts.recall(),
            f1_score: counts.f1_score(),
            precision: counts.precision(),
            accuracy: counts.accuracy(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_roc_auc_perfect_and_inverse() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_eq!(roc_auc(&y, &array![0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_ties() {
        let y = array![0.0, 1.0, 0.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.5, 0.5, 0.5, 0.5]).unwrap(), 0.5);
        // one pair of four is tied, three are ordered correctly
        let auc = roc_auc(&array![0.0, 0.0, 1.0, 1.0], &array![0.1, 0.4, 0.4, 0.9]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let y = array![1.0, 1.0];
        assert!(matches!(roc_auc(&y, &array![0.2, 0.3]), Err(FraudError::NumericError(_))));
    }

    #[test]
    fn test_threshold_metrics() {
        let y = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let prob = array![0.9, 0.4, 0.6, 0.1, 0.7];
        let m = ClassificationMetrics::compute(&y, &prob, 0.5).unwrap();
        // tp 2, fn 1, fp 1, tn 1
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_probability_at_threshold_is_negative() {
        assert_eq!(label_at(0.5, 0.5), 0);
        assert_eq!(label_at(0.500001, 0.5), 1);
        assert_eq!(label_at(0.0, 0.0), 0);

        let y = array![1.0, 0.0];
        let m = ClassificationMetrics::compute(&y, &array![0.5, 0.2], 0.5).unwrap();
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.accuracy, 0.5);
    }

    #[test]
    fn test_no_positive_predictions() {
        let counts = ConfusionCounts::from_predictions(&array![1.0, 0.0], &array![0.0, 0.0]);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.f1_score(), 0.0);
    }
}
