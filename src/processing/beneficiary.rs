//! Beneficiary recoding
//!
//! Chronic-condition flags move from the source {1 = yes, 2 = no} coding to
//! {1, 0}, the renal indicator from {"0", "Y"} to {0, 1}, and gender and race
//! expand into one-hot indicators over fixed category lists.

use crate::data::schema::CHRONIC_CONDITIONS;
use crate::data::BeneficiaryRecord;
use crate::utils::columns::{format_date, parse_date};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Gender categories in one-hot column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Gender::Male),
            2 => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Race categories in one-hot column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    White,
    Black,
    Other,
    Unknown,
    Hispanic,
}

impl Race {
    pub const ALL: [Race; 5] = [
        Race::White,
        Race::Black,
        Race::Other,
        Race::Unknown,
        Race::Hispanic,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Race::White),
            2 => Some(Race::Black),
            3 => Some(Race::Other),
            4 => Some(Race::Unknown),
            5 => Some(Race::Hispanic),
            _ => None,
        }
    }
}

/// Indicator row over a fixed category list; unknown values give all zeros
pub fn one_hot<T: PartialEq + Copy, const N: usize>(value: Option<T>, categories: [T; N]) -> [u8; N] {
    categories.map(|c| u8::from(value == Some(c)))
}

/// Source coding 1 = present, 2 = absent. Already-recoded 0 stays 0.
pub fn recode_chronic(code: Option<i64>) -> Option<i64> {
    code.map(|c| match c {
        2 => 0,
        other => other,
    })
}

/// "Y" (or an already-recoded "1") is 1, "0" is 0, anything else is missing
pub fn recode_renal(raw: Option<&str>) -> Option<u8> {
    match raw.map(str::trim) {
        Some("Y") | Some("1") => Some(1),
        Some("0") => Some(0),
        _ => None,
    }
}

/// A beneficiary after recoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub bene_id: String,
    pub dob: Option<NaiveDate>,
    pub dod: Option<NaiveDate>,
    pub gender_code: Option<i64>,
    pub race_code: Option<i64>,
    /// Indicators in [`Gender::ALL`] order
    pub gender: [u8; 2],
    /// Indicators in [`Race::ALL`] order
    pub race: [u8; 5],
    pub renal_disease: Option<u8>,
    pub state: Option<String>,
    pub county: Option<String>,
    /// Recoded flags in [`CHRONIC_CONDITIONS`] order
    pub chronic_conditions: [Option<i64>; 11],
    pub ip_annual_reimbursement: Option<f64>,
    pub ip_annual_deductible: Option<f64>,
    pub op_annual_reimbursement: Option<f64>,
    pub op_annual_deductible: Option<f64>,
}

impl Beneficiary {
    pub fn is_dead(&self) -> bool {
        self.dod.is_some()
    }

    /// Back to the raw row layout, keeping the recoded values
    pub fn to_record(&self) -> BeneficiaryRecord {
        BeneficiaryRecord {
            bene_id: self.bene_id.clone(),
            dob: self.dob.map(format_date),
            dod: self.dod.map(format_date),
            gender: self.gender_code,
            race: self.race_code,
            renal_indicator: self.renal_disease.map(|r| r.to_string()),
            state: self.state.clone(),
            county: self.county.clone(),
            chronic_conditions: self.chronic_conditions,
            ip_annual_reimbursement: self.ip_annual_reimbursement,
            ip_annual_deductible: self.ip_annual_deductible,
            op_annual_reimbursement: self.op_annual_reimbursement,
            op_annual_deductible: self.op_annual_deductible,
        }
    }
}

/// Recodes beneficiary rows
#[derive(Debug, Clone, Default)]
pub struct BeneficiaryProcessor;

impl BeneficiaryProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process_record(&self, record: &BeneficiaryRecord) -> Beneficiary {
        let gender = record.gender.and_then(Gender::from_code);
        let race = record.race.and_then(Race::from_code);

        Beneficiary {
            bene_id: record.bene_id.clone(),
            dob: record.dob.as_deref().and_then(parse_date),
            dod: record.dod.as_deref().and_then(parse_date),
            gender_code: record.gender,
            race_code: record.race,
            gender: one_hot(gender, Gender::ALL),
            race: one_hot(race, Race::ALL),
            renal_disease: recode_renal(record.renal_indicator.as_deref()),
            state: record.state.clone(),
            county: record.county.clone(),
            chronic_conditions: record.chronic_conditions.map(recode_chronic),
            ip_annual_reimbursement: record.ip_annual_reimbursement,
            ip_annual_deductible: record.ip_annual_deductible,
            op_annual_reimbursement: record.op_annual_reimbursement,
            op_annual_deductible: record.op_annual_deductible,
        }
    }

    pub fn process(&self, records: &[BeneficiaryRecord]) -> Vec<Beneficiary> {
        let processed: Vec<Beneficiary> = records.iter().map(|r| self.process_record(r)).collect();

        let uncategorised = processed
            .iter()
            .filter(|b| b.gender.iter().all(|&g| g == 0) || b.race.iter().all(|&r| r == 0))
            .count();
        info!(
            beneficiaries = processed.len(),
            chronic_conditions = CHRONIC_CONDITIONS.len(),
            uncategorised,
            "Beneficiaries processed"
        );
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> BeneficiaryRecord {
        let mut r = BeneficiaryRecord::new("BENE1");
        r.dob = Some("1943-01-01".to_string());
        r.gender = Some(2);
        r.race = Some(5);
        r.renal_indicator = Some("Y".to_string());
        r.chronic_conditions = [Some(1), Some(2), Some(2), Some(1), None, Some(1), Some(2), Some(1), Some(2), Some(2), Some(1)];
        r
    }

    #[test]
    fn test_chronic_recoding() {
        assert_eq!(recode_chronic(Some(2)), Some(0));
        assert_eq!(recode_chronic(Some(1)), Some(1));
        assert_eq!(recode_chronic(Some(0)), Some(0));
        assert_eq!(recode_chronic(None), None);
    }

    #[test]
    fn test_renal_recoding() {
        assert_eq!(recode_renal(Some("Y")), Some(1));
        assert_eq!(recode_renal(Some("0")), Some(0));
        assert_eq!(recode_renal(Some("1")), Some(1));
        assert_eq!(recode_renal(Some("N")), None);
        assert_eq!(recode_renal(None), None);
    }

    #[test]
    fn test_one_hot_fixed_categories() {
        assert_eq!(one_hot(Gender::from_code(1), Gender::ALL), [1, 0]);
        assert_eq!(one_hot(Race::from_code(5), Race::ALL), [0, 0, 0, 0, 1]);
        assert_eq!(one_hot(Race::from_code(9), Race::ALL), [0, 0, 0, 0, 0]);
        assert_eq!(one_hot(None, Gender::ALL), [0, 0]);
    }

    #[test]
    fn test_process_record() {
        let b = BeneficiaryProcessor::new().process_record(&record());
        assert_eq!(b.gender, [0, 1]);
        assert_eq!(b.race, [0, 0, 0, 0, 1]);
        assert_eq!(b.renal_disease, Some(1));
        assert_eq!(b.chronic_conditions[0], Some(1));
        assert_eq!(b.chronic_conditions[1], Some(0));
        assert_eq!(b.chronic_conditions[4], None);
        assert_eq!(b.dob, NaiveDate::from_ymd_opt(1943, 1, 1));
        assert!(!b.is_dead());
    }

    #[test]
    fn test_processing_is_idempotent() {
        let processor = BeneficiaryProcessor::new();
        let once = processor.process_record(&record());
        let twice = processor.process_record(&once.to_record());
        assert_eq!(once.chronic_conditions, twice.chronic_conditions);
        assert_eq!(once.renal_disease, twice.renal_disease);
        assert_eq!(once, twice);
    }
}
