//! Claim to beneficiary join

use super::claim_features::{ClaimFeatures, FeaturedClaim};
use crate::config::UnmatchedPolicy;
use crate::error::{FraudError, Result};
use crate::processing::{Beneficiary, Claim};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Unmatched ids quoted in a join error
const SAMPLE_SIZE: usize = 5;

/// A claim joined to its beneficiary
#[derive(Debug, Clone)]
pub struct MergedClaim {
    pub claim: Claim,
    pub features: ClaimFeatures,
    /// Shared between all claims of the same beneficiary
    pub beneficiary: Option<Arc<Beneficiary>>,
    /// Whole years between birth and claim start
    pub age: Option<i64>,
    pub is_dead: Option<bool>,
}

/// Age in whole years, days / 365.25 rounded down
pub fn age_at(claim_start: Option<NaiveDate>, dob: Option<NaiveDate>) -> Option<i64> {
    let days = (claim_start? - dob?).num_days();
    Some((days as f64 / 365.25).floor() as i64)
}

/// Left join of claims onto beneficiaries by `BeneID`
#[derive(Debug, Clone, Default)]
pub struct Merger {
    policy: UnmatchedPolicy,
}

impl Merger {
    pub fn new(policy: UnmatchedPolicy) -> Self {
        Self { policy }
    }

    pub fn merge(
        &self,
        claims: Vec<FeaturedClaim>,
        beneficiaries: Vec<Beneficiary>,
    ) -> Result<Vec<MergedClaim>> {
        let index: HashMap<String, Arc<Beneficiary>> = beneficiaries
            .into_iter()
            .map(|b| (b.bene_id.clone(), Arc::new(b)))
            .collect();

        let unmatched: Vec<&str> = claims
            .iter()
            .filter(|c| !index.contains_key(&c.claim.bene_id))
            .map(|c| c.claim.claim_id.as_str())
            .collect();

        if !unmatched.is_empty() {
            match self.policy {
                UnmatchedPolicy::Fail => {
                    return Err(FraudError::JoinIntegrityError {
                        join: "claims-beneficiary".to_string(),
                        unmatched: unmatched.len(),
                        sample: unmatched
                            .iter()
                            .take(SAMPLE_SIZE)
                            .map(|id| id.to_string())
                            .collect(),
                    });
                }
                UnmatchedPolicy::KeepMissing => {
                    warn!(unmatched = unmatched.len(), "Claims kept without a beneficiary record");
                }
                UnmatchedPolicy::Drop => {
                    warn!(unmatched = unmatched.len(), "Claims without a beneficiary record dropped");
                }
            }
        }

        let drop_unmatched = self.policy == UnmatchedPolicy::Drop;
        let merged: Vec<MergedClaim> = claims
            .into_iter()
            .filter_map(|FeaturedClaim { claim, features }| {
                let beneficiary = index.get(&claim.bene_id).cloned();
                if beneficiary.is_none() && drop_unmatched {
                    return None;
                }
                let age = beneficiary
                    .as_ref()
                    .and_then(|b| age_at(claim.claim_start, b.dob));
                let is_dead = beneficiary.as_ref().map(|b| b.is_dead());
                Some(MergedClaim {
                    claim,
                    features,
                    beneficiary,
                    age,
                    is_dead,
                })
            })
            .collect();

        info!(claims = merged.len(), beneficiaries = index.len(), "Claims merged with beneficiaries");
        Ok(merged)
    }
}
