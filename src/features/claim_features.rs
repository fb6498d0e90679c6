//! Per-claim derived fields

use super::top_codes::{TopCodeLookup, TopCodeSet};
use crate::processing::Claim;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields derived from one claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimFeatures {
    /// Claim starts before the admission date
    pub billing_before_admission: bool,
    /// Claim ends after the discharge date
    pub billing_after_discharge: bool,
    /// Discharge minus admission plus one; inpatient only
    pub hospital_stay_days: Option<i64>,
    pub top_diagnosis_code: bool,
    pub num_diagnoses: usize,
    pub num_procedures: usize,
    pub num_of_physicians: usize,
    pub is_top20_attending: bool,
    pub is_top20_operating: bool,
    /// Claim end minus claim start plus one
    pub claim_duration_days: Option<i64>,
    pub stay_vs_claim_diff: Option<i64>,
}

/// A claim together with its derived fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedClaim {
    pub claim: Claim,
    pub features: ClaimFeatures,
}

/// Signed day difference, `None` if either date is missing
fn days_between(later: Option<NaiveDate>, earlier: Option<NaiveDate>) -> Option<i64> {
    Some((later? - earlier?).num_days())
}

/// Derives per-claim fields against a fixed set of top codes
#[derive(Debug, Clone)]
pub struct ClaimFeatureBuilder {
    lookup: TopCodeLookup,
}

impl ClaimFeatureBuilder {
    pub fn new(top_codes: &TopCodeSet) -> Self {
        Self {
            lookup: TopCodeLookup::new(top_codes),
        }
    }

    pub fn compute(&self, claim: &Claim) -> ClaimFeatures {
        let hospital_stay_days = days_between(claim.discharge, claim.admission).map(|d| d + 1);
        let claim_duration_days = days_between(claim.claim_end, claim.claim_start).map(|d| d + 1);

        ClaimFeatures {
            billing_before_admission: days_between(claim.claim_start, claim.admission)
                .map_or(false, |d| d < 0),
            billing_after_discharge: days_between(claim.claim_end, claim.discharge)
                .map_or(false, |d| d > 0),
            hospital_stay_days,
            top_diagnosis_code: self
                .lookup
                .is_top_diagnosis(claim.admit_diagnosis_code.as_deref()),
            num_diagnoses: claim.diagnosis_codes.count_present(),
            num_procedures: claim.procedure_codes.count_present(),
            num_of_physicians: claim.physicians().iter().filter(|p| p.is_some()).count(),
            is_top20_attending: self
                .lookup
                .is_top_attending(claim.attending_physician.as_deref()),
            is_top20_operating: self
                .lookup
                .is_top_operating(claim.operating_physician.as_deref()),
            claim_duration_days,
            stay_vs_claim_diff: hospital_stay_days
                .zip(claim_duration_days)
                .map(|(stay, duration)| stay - duration),
        }
    }

    pub fn build(&self, claims: Vec<Claim>) -> Vec<FeaturedClaim> {
        let featured: Vec<FeaturedClaim> = claims
            .into_iter()
            .map(|claim| {
                let features = self.compute(&claim);
                FeaturedClaim { claim, features }
            })
            .collect();

        let flagged = featured
            .iter()
            .filter(|c| c.features.billing_before_admission || c.features.billing_after_discharge)
            .count();
        info!(claims = featured.len(), flagged_billing_dates = flagged, "Claim features built");
        featured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClaimRecord, ClaimSource, DiagnosisCodes, ProcedureCodes};

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn inpatient_claim() -> Claim {
        let mut claim = Claim::from_record(ClaimRecord::new("CLM1", "BENE1", "PRV1"), ClaimSource::Inpatient);
        claim.claim_start = date(2009, 4, 10);
        claim.claim_end = date(2009, 4, 20);
        claim.admission = date(2009, 4, 12);
        claim.discharge = date(2009, 4, 18);
        claim.attending_physician = Some("PHY1".to_string());
        claim.other_physician = Some("PHY9".to_string());
        claim.admit_diagnosis_code = Some("4019".to_string());
        claim.diagnosis_codes = DiagnosisCodes::from_codes(&["4019", "2724", "V5869"]);
        claim.procedure_codes = ProcedureCodes::from_codes(&["9904"]);
        claim
    }

    fn builder() -> ClaimFeatureBuilder {
        ClaimFeatureBuilder::new(&TopCodeSet {
            diagnosis_codes: vec!["4019".to_string()],
            attending_physicians: vec!["PHY1".to_string()],
            operating_physicians: vec!["PHY2".to_string()],
        })
    }

    #[test]
    fn test_inpatient_features() {
        let f = builder().compute(&inpatient_claim());
        assert!(f.billing_before_admission);
        assert!(f.billing_after_discharge);
        assert_eq!(f.hospital_stay_days, Some(7));
        assert_eq!(f.claim_duration_days, Some(11));
        assert_eq!(f.stay_vs_claim_diff, Some(-4));
        assert!(f.top_diagnosis_code);
        assert_eq!(f.num_diagnoses, 3);
        assert_eq!(f.num_procedures, 1);
        assert_eq!(f.num_of_physicians, 2);
        assert!(f.is_top20_attending);
        assert!(!f.is_top20_operating);
    }

    #[test]
    fn test_missing_dates_are_false_and_undefined() {
        let mut claim = inpatient_claim();
        claim.admission = None;
        let f = builder().compute(&claim);
        assert!(!f.billing_before_admission);
        assert_eq!(f.hospital_stay_days, None);
        assert_eq!(f.stay_vs_claim_diff, None);
        assert_eq!(f.claim_duration_days, Some(11));
    }

    #[test]
    fn test_outpatient_claim() {
        let mut claim = Claim::from_record(ClaimRecord::new("CLM2", "BENE1", "PRV1"), ClaimSource::Outpatient);
        claim.claim_start = date(2009, 6, 1);
        claim.claim_end = date(2009, 6, 1);
        let f = builder().compute(&claim);
        assert!(!f.billing_before_admission);
        assert!(!f.billing_after_discharge);
        assert_eq!(f.hospital_stay_days, None);
        assert_eq!(f.claim_duration_days, Some(1));
        assert_eq!(f.num_of_physicians, 0);
        assert!(!f.top_diagnosis_code);
    }

    #[test]
    fn test_admission_same_day_is_not_early_billing() {
        let mut claim = inpatient_claim();
        claim.claim_start = claim.admission;
        assert!(!builder().compute(&claim).billing_before_admission);
    }
}
