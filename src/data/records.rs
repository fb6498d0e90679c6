//! Typed rows of the raw input tables

use super::schema::*;
use crate::error::Result;
use crate::utils::columns::{optional_string_values, parse_code, parse_f64, required, string_values};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Fixed, ordered slots of optional codes (diagnosis or procedure columns)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSlots<const N: usize> {
    #[serde(with = "slots_serde")]
    slots: [Option<String>; N],
}

impl<const N: usize> CodeSlots<N> {
    pub fn new(slots: [Option<String>; N]) -> Self {
        Self { slots }
    }

    pub fn empty() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Build from a prefix of codes; remaining slots stay empty
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        Self {
            slots: std::array::from_fn(|i| codes.get(i).map(|c| c.as_ref().to_string())),
        }
    }

    /// Number of slots holding a code
    pub fn count_present(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.slots.get(idx).and_then(|s| s.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.slots.iter().map(|s| s.as_deref())
    }

    pub const fn capacity() -> usize {
        N
    }
}

impl<const N: usize> Default for CodeSlots<N> {
    fn default() -> Self {
        Self::empty()
    }
}

mod slots_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        slots: &[Option<String>; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        slots.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[Option<String>; N], D::Error> {
        let values = Vec::<Option<String>>::deserialize(deserializer)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected {} slots, got {}", N, len)))
    }
}

pub type DiagnosisCodes = CodeSlots<10>;
pub type ProcedureCodes = CodeSlots<6>;

/// Which claims table a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimSource {
    Inpatient,
    Outpatient,
}

impl ClaimSource {
    pub fn table_name(&self) -> &'static str {
        match self {
            ClaimSource::Inpatient => "inpatient",
            ClaimSource::Outpatient => "outpatient",
        }
    }
}

/// One raw claim row; dates are still unparsed text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub bene_id: String,
    pub provider: String,
    pub claim_start: Option<String>,
    pub claim_end: Option<String>,
    /// Inpatient only
    pub admission: Option<String>,
    /// Inpatient only
    pub discharge: Option<String>,
    pub amount_reimbursed: Option<f64>,
    pub deductible_paid: Option<f64>,
    pub attending_physician: Option<String>,
    pub operating_physician: Option<String>,
    pub other_physician: Option<String>,
    pub admit_diagnosis_code: Option<String>,
    pub diagnosis_group_code: Option<String>,
    pub diagnosis_codes: DiagnosisCodes,
    pub procedure_codes: ProcedureCodes,
}

impl ClaimRecord {
    /// Minimal claim used by builders and tests
    pub fn new(
        claim_id: impl Into<String>,
        bene_id: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            claim_id: claim_id.into(),
            bene_id: bene_id.into(),
            provider: provider.into(),
            claim_start: None,
            claim_end: None,
            admission: None,
            discharge: None,
            amount_reimbursed: None,
            deductible_paid: None,
            attending_physician: None,
            operating_physician: None,
            other_physician: None,
            admit_diagnosis_code: None,
            diagnosis_group_code: None,
            diagnosis_codes: DiagnosisCodes::empty(),
            procedure_codes: ProcedureCodes::empty(),
        }
    }

    /// Read every row of a claims table; key columns must be present
    pub fn from_dataframe(df: &DataFrame, source: ClaimSource) -> Result<Vec<Self>> {
        let table = source.table_name();
        let mut claim_ids = string_values(df, CLAIM_ID)?;
        let mut bene_ids = string_values(df, BENE_ID)?;
        let mut providers = string_values(df, PROVIDER)?;
        let mut starts = optional_string_values(df, CLAIM_START)?;
        let mut ends = optional_string_values(df, CLAIM_END)?;
        let mut admissions = optional_string_values(df, ADMISSION)?;
        let mut discharges = optional_string_values(df, DISCHARGE)?;
        let amounts = optional_string_values(df, AMOUNT_REIMBURSED)?;
        let deductibles = optional_string_values(df, DEDUCTIBLE_PAID)?;
        let mut attending = optional_string_values(df, ATTENDING_PHYSICIAN)?;
        let mut operating = optional_string_values(df, OPERATING_PHYSICIAN)?;
        let mut other = optional_string_values(df, OTHER_PHYSICIAN)?;
        let mut admit_codes = optional_string_values(df, ADMIT_DIAGNOSIS)?;
        let mut group_codes = optional_string_values(df, DIAGNOSIS_GROUP)?;
        let mut diagnosis = DIAGNOSIS_SLOTS
            .iter()
            .map(|c| optional_string_values(df, c))
            .collect::<Result<Vec<_>>>()?;
        let mut procedures = PROCEDURE_SLOTS
            .iter()
            .map(|c| optional_string_values(df, c))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            records.push(ClaimRecord {
                claim_id: required(claim_ids[row].take(), CLAIM_ID, row, table)?,
                bene_id: required(bene_ids[row].take(), BENE_ID, row, table)?,
                provider: required(providers[row].take(), PROVIDER, row, table)?,
                claim_start: starts[row].take(),
                claim_end: ends[row].take(),
                admission: admissions[row].take(),
                discharge: discharges[row].take(),
                amount_reimbursed: amounts[row].as_deref().and_then(parse_f64),
                deductible_paid: deductibles[row].as_deref().and_then(parse_f64),
                attending_physician: attending[row].take(),
                operating_physician: operating[row].take(),
                other_physician: other[row].take(),
                admit_diagnosis_code: admit_codes[row].take(),
                diagnosis_group_code: group_codes[row].take(),
                diagnosis_codes: CodeSlots::new(std::array::from_fn(|i| diagnosis[i][row].take())),
                procedure_codes: CodeSlots::new(std::array::from_fn(|i| procedures[i][row].take())),
            });
        }
        Ok(records)
    }
}

/// One raw beneficiary row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeneficiaryRecord {
    pub bene_id: String,
    pub dob: Option<String>,
    pub dod: Option<String>,
    pub gender: Option<i64>,
    pub race: Option<i64>,
    pub renal_indicator: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    /// Codes in [`CHRONIC_CONDITIONS`] order
    pub chronic_conditions: [Option<i64>; 11],
    pub ip_annual_reimbursement: Option<f64>,
    pub ip_annual_deductible: Option<f64>,
    pub op_annual_reimbursement: Option<f64>,
    pub op_annual_deductible: Option<f64>,
}

impl BeneficiaryRecord {
    pub fn new(bene_id: impl Into<String>) -> Self {
        Self {
            bene_id: bene_id.into(),
            dob: None,
            dod: None,
            gender: None,
            race: None,
            renal_indicator: None,
            state: None,
            county: None,
            chronic_conditions: [None; 11],
            ip_annual_reimbursement: None,
            ip_annual_deductible: None,
            op_annual_reimbursement: None,
            op_annual_deductible: None,
        }
    }

    /// Read every row of the beneficiary table
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<Self>> {
        let table = "beneficiary";
        let mut bene_ids = string_values(df, BENE_ID)?;
        let mut dobs = optional_string_values(df, DOB)?;
        let mut dods = optional_string_values(df, DOD)?;
        let genders = optional_string_values(df, GENDER)?;
        let races = optional_string_values(df, RACE)?;
        let mut renal = optional_string_values(df, RENAL_INDICATOR)?;
        let mut states = optional_string_values(df, STATE)?;
        let mut counties = optional_string_values(df, COUNTY)?;
        let chronic = CHRONIC_CONDITIONS
            .iter()
            .map(|c| optional_string_values(df, c))
            .collect::<Result<Vec<_>>>()?;
        let annual = [
            IP_ANNUAL_REIMBURSEMENT,
            IP_ANNUAL_DEDUCTIBLE,
            OP_ANNUAL_REIMBURSEMENT,
            OP_ANNUAL_DEDUCTIBLE,
        ]
        .iter()
        .map(|c| optional_string_values(df, c))
        .collect::<Result<Vec<_>>>()?;

        let amount = |col: usize, row: usize| annual[col][row].as_deref().and_then(parse_f64);

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            records.push(BeneficiaryRecord {
                bene_id: required(bene_ids[row].take(), BENE_ID, row, table)?,
                dob: dobs[row].take(),
                dod: dods[row].take(),
                gender: genders[row].as_deref().and_then(parse_code),
                race: races[row].as_deref().and_then(parse_code),
                renal_indicator: renal[row].take(),
                state: states[row].take(),
                county: counties[row].take(),
                chronic_conditions: std::array::from_fn(|i| {
                    chronic[i][row].as_deref().and_then(parse_code)
                }),
                ip_annual_reimbursement: amount(0, row),
                ip_annual_deductible: amount(1, row),
                op_annual_reimbursement: amount(2, row),
                op_annual_deductible: amount(3, row),
            });
        }
        Ok(records)
    }
}

/// One row of the provider label table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLabel {
    pub provider: String,
    /// Raw label text, "Yes"/"No" in the source data
    pub potential_fraud: Option<String>,
}

impl ProviderLabel {
    pub fn new(provider: impl Into<String>, potential_fraud: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            potential_fraud: Some(potential_fraud.into()),
        }
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<Self>> {
        let mut providers = string_values(df, PROVIDER)?;
        let mut labels = optional_string_values(df, POTENTIAL_FRAUD)?;

        (0..df.height())
            .map(|row| {
                Ok(ProviderLabel {
                    provider: required(providers[row].take(), PROVIDER, row, "labels")?,
                    potential_fraud: labels[row].take(),
                })
            })
            .collect()
    }
}
