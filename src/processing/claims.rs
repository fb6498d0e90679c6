//! Claim union and date parsing

use crate::data::{ClaimRecord, ClaimSource, DiagnosisCodes, ProcedureCodes};
use crate::utils::columns::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A claim from either table with parsed dates and source flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    pub bene_id: String,
    pub provider: String,
    pub claim_start: Option<NaiveDate>,
    pub claim_end: Option<NaiveDate>,
    pub admission: Option<NaiveDate>,
    pub discharge: Option<NaiveDate>,
    pub amount_reimbursed: Option<f64>,
    pub deductible_paid: Option<f64>,
    pub attending_physician: Option<String>,
    pub operating_physician: Option<String>,
    pub other_physician: Option<String>,
    pub admit_diagnosis_code: Option<String>,
    pub diagnosis_group_code: Option<String>,
    pub diagnosis_codes: DiagnosisCodes,
    pub procedure_codes: ProcedureCodes,
    pub is_inpatient: bool,
    pub is_outpatient: bool,
}

impl Claim {
    /// Physician identifiers in attending, operating, other order
    pub fn physicians(&self) -> [Option<&str>; 3] {
        [
            self.attending_physician.as_deref(),
            self.operating_physician.as_deref(),
            self.other_physician.as_deref(),
        ]
    }

    pub fn from_record(record: ClaimRecord, source: ClaimSource) -> Self {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(parse_date);
        Self {
            claim_start: parse(&record.claim_start),
            claim_end: parse(&record.claim_end),
            admission: parse(&record.admission),
            discharge: parse(&record.discharge),
            claim_id: record.claim_id,
            bene_id: record.bene_id,
            provider: record.provider,
            amount_reimbursed: record.amount_reimbursed,
            deductible_paid: record.deductible_paid,
            attending_physician: record.attending_physician,
            operating_physician: record.operating_physician,
            other_physician: record.other_physician,
            admit_diagnosis_code: record.admit_diagnosis_code,
            diagnosis_group_code: record.diagnosis_group_code,
            diagnosis_codes: record.diagnosis_codes,
            procedure_codes: record.procedure_codes,
            is_inpatient: source == ClaimSource::Inpatient,
            is_outpatient: source == ClaimSource::Outpatient,
        }
    }
}

/// Concatenates the inpatient and outpatient tables
#[derive(Debug, Clone, Default)]
pub struct ClaimsProcessor;

impl ClaimsProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Inpatient rows first, then outpatient rows
    pub fn process(&self, inpatient: Vec<ClaimRecord>, outpatient: Vec<ClaimRecord>) -> Vec<Claim> {
        let n_inpatient = inpatient.len();
        let n_outpatient = outpatient.len();

        let claims: Vec<Claim> = inpatient
            .into_iter()
            .map(|r| Claim::from_record(r, ClaimSource::Inpatient))
            .chain(
                outpatient
                    .into_iter()
                    .map(|r| Claim::from_record(r, ClaimSource::Outpatient)),
            )
            .collect();

        let undated = claims
            .iter()
            .filter(|c| c.claim_start.is_none() || c.claim_end.is_none())
            .count();
        if undated > 0 {
            debug!(undated, "Claims with a missing or unparsable claim date");
        }

        info!(
            inpatient = n_inpatient,
            outpatient = n_outpatient,
            total = claims.len(),
            "Claims merged"
        );
        claims
    }
}
