//! Provider-level aggregation
//!
//! Claim rows are grouped by provider and reduced to one [`ProviderFeatures`]
//! vector per provider. Missing values are skipped by sums, means and unique
//! counts. Groups are reduced in parallel and returned in provider id order.

use super::merge::MergedClaim;
use super::schema::ProviderFeatures;
use crate::error::{FraudError, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Features of one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAggregate {
    pub provider: String,
    pub features: ProviderFeatures,
}

/// Mean of the defined values, `None` when there are none
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (n - 1). Fewer than two values give 0.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

fn required_mean(
    provider: &str,
    field: &str,
    values: impl IntoIterator<Item = Option<f64>>,
) -> Result<f64> {
    mean(values).ok_or_else(|| {
        FraudError::NumericError(format!("{field} for provider {provider} has no defined values"))
    })
}

fn count_true(values: impl IntoIterator<Item = bool>) -> f64 {
    values.into_iter().filter(|&v| v).count() as f64
}

fn count_unique<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> f64 {
    values.into_iter().flatten().collect::<HashSet<_>>().len() as f64
}

/// Groups claim rows by provider and computes the provider feature vector
#[derive(Debug, Clone, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, claims: &[MergedClaim]) -> Result<Vec<ProviderAggregate>> {
        let mut groups: BTreeMap<&str, Vec<&MergedClaim>> = BTreeMap::new();
        for claim in claims {
            groups.entry(claim.claim.provider.as_str()).or_default().push(claim);
        }
        let groups: Vec<(&str, Vec<&MergedClaim>)> = groups.into_iter().collect();

        let aggregates = groups
            .par_iter()
            .map(|(provider, rows)| {
                Ok(ProviderAggregate {
                    provider: provider.to_string(),
                    features: Self::aggregate_provider(provider, rows)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(providers = aggregates.len(), claims = claims.len(), "Provider features aggregated");
        Ok(aggregates)
    }

    /// Reduce the claims of one provider
    pub fn aggregate_provider(provider: &str, rows: &[&MergedClaim]) -> Result<ProviderFeatures> {
        if rows.is_empty() {
            return Err(FraudError::NumericError(format!(
                "provider {provider} has no claims"
            )));
        }

        let n_claims = rows.len() as f64;
        let benes = || rows.iter().filter_map(|r| r.beneficiary.as_deref());

        let stay = |r: &&MergedClaim| r.features.hospital_stay_days.unwrap_or(0) as f64;
        let amounts: Vec<f64> = rows.iter().filter_map(|r| r.claim.amount_reimbursed).collect();

        let unique_benes = count_unique(rows.iter().map(|r| Some(r.claim.bene_id.as_str())));
        if unique_benes == 0.0 {
            return Err(FraudError::NumericError(format!(
                "claims_per_bene for provider {provider} has a zero denominator"
            )));
        }

        let gender_sum = |i: usize| benes().map(|b| f64::from(b.gender[i])).sum::<f64>();
        let race_sum = |i: usize| benes().map(|b| f64::from(b.race[i])).sum::<f64>();
        let chronic_sum = |i: usize| {
            benes()
                .filter_map(|b| b.chronic_conditions[i])
                .map(|v| v as f64)
                .sum::<f64>()
        };

        let features = ProviderFeatures {
            count_unique_beneficiary: unique_benes,
            count_unique_claims: n_claims,
            count_dead_beneficiary: count_true(rows.iter().map(|r| r.is_dead == Some(true))),
            count_unique_states: count_unique(benes().map(|b| b.state.as_deref())),
            count_unique_counties: count_unique(benes().map(|b| b.county.as_deref())),
            mean_hospital_stay_days: rows.iter().map(stay).sum::<f64>() / n_claims,
            max_hospital_stay_days: rows.iter().map(stay).fold(f64::NEG_INFINITY, f64::max),
            total_top_diagnosis_codes: count_true(rows.iter().map(|r| r.features.top_diagnosis_code)),
            mean_total_diagnosis: rows.iter().map(|r| r.features.num_diagnoses as f64).sum::<f64>()
                / n_claims,
            mean_total_procedures: rows.iter().map(|r| r.features.num_procedures as f64).sum::<f64>()
                / n_claims,
            mean_number_of_physicians: rows
                .iter()
                .map(|r| r.features.num_of_physicians as f64)
                .sum::<f64>()
                / n_claims,
            mean_difference_stay_vs_claim: rows
                .iter()
                .map(|r| r.features.stay_vs_claim_diff.unwrap_or(0) as f64)
                .sum::<f64>()
                / n_claims,
            patients_under_top_attending_physician: count_true(
                rows.iter().map(|r| r.features.is_top20_attending),
            ),
            patients_under_top_operating_physician: count_true(
                rows.iter().map(|r| r.features.is_top20_operating),
            ),
            mean_claim_amount: required_mean(
                provider,
                "mean_claim_amount",
                amounts.iter().copied().map(Some),
            )?,
            total_claim_amount: amounts.iter().sum(),
            std_claim_amount: sample_std(&amounts),
            mean_age: required_mean(provider, "mean_age", rows.iter().map(|r| r.age.map(|a| a as f64)))?,
            count_of_males: gender_sum(0),
            count_of_females: gender_sum(1),
            count_of_white_people: race_sum(0),
            count_of_black_people: race_sum(1),
            count_of_other_people: race_sum(2),
            count_of_unknown_people: race_sum(3),
            count_of_hispanic_people: race_sum(4),
            count_alzheimer: chronic_sum(0),
            count_heartfailure: chronic_sum(1),
            count_kidneydisease: chronic_sum(2),
            count_cancer: chronic_sum(3),
            count_obstrpulmonary: chronic_sum(4),
            count_depression: chronic_sum(5),
            count_diabetes: chronic_sum(6),
            count_ischemicheart: chronic_sum(7),
            count_osteoporasis: chronic_sum(8),
            count_rheumatoidarthritis: chronic_sum(9),
            count_stroke: chronic_sum(10),
            count_renal_disease: benes().filter_map(|b| b.renal_disease).map(f64::from).sum(),
            mean_annual_inpatient_reimbursement: required_mean(
                provider,
                "mean_annual_inpatient_reimbursement",
                benes().map(|b| b.ip_annual_reimbursement),
            )?,
            mean_annual_inpatient_deductible: required_mean(
                provider,
                "mean_annual_inpatient_deductible",
                benes().map(|b| b.ip_annual_deductible),
            )?,
            mean_annual_outpatient_reimbursement: required_mean(
                provider,
                "mean_annual_outpatient_reimbursement",
                benes().map(|b| b.op_annual_reimbursement),
            )?,
            mean_annual_outpatient_deductible: required_mean(
                provider,
                "mean_annual_outpatient_deductible",
                benes().map(|b| b.op_annual_deductible),
            )?,
            count_inpatient: count_true(rows.iter().map(|r| r.claim.is_inpatient)),
            count_outpatient: count_true(rows.iter().map(|r| r.claim.is_outpatient)),
            claims_per_bene: n_claims / unique_benes,
        };

        debug!(provider, claims = rows.len(), "Provider aggregated");
        Ok(features)
    }
}
