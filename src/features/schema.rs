//! Provider-level feature vector
//!
//! [`ProviderFeatures`] is the contract between feature engineering and
//! modelling. Field order follows [`FEATURE_NAMES`], which is also the
//! column order of the processed training table and of the model input.

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of features per provider
pub const FEATURE_COUNT: usize = 44;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "count_unique_beneficiary",
    "count_unique_claims",
    "count_dead_beneficiary",
    "count_unique_states",
    "count_unique_counties",
    "mean_hospital_stay_days",
    "max_hospital_stay_days",
    "total_top_diagnosis_codes",
    "mean_total_diagnosis",
    "mean_total_procedures",
    "mean_number_of_physicians",
    "mean_difference_stay_vs_claim",
    "patients_under_top_attending_physician",
    "patients_under_top_operating_physician",
    "mean_claim_amount",
    "total_claim_amount",
    "std_claim_amount",
    "mean_age",
    "count_of_males",
    "count_of_females",
    "count_of_black_people",
    "count_of_white_people",
    "count_of_hispanic_people",
    "count_of_other_people",
    "count_of_unknown_people",
    "count_alzheimer",
    "count_heartfailure",
    "count_kidneydisease",
    "count_cancer",
    "count_obstrpulmonary",
    "count_depression",
    "count_diabetes",
    "count_ischemicheart",
    "count_osteoporasis",
    "count_rheumatoidarthritis",
    "count_stroke",
    "count_renal_disease",
    "mean_annual_inpatient_reimbursement",
    "mean_annual_inpatient_deductible",
    "mean_annual_outpatient_reimbursement",
    "mean_annual_outpatient_deductible",
    "count_inpatient",
    "count_outpatient",
    "claims_per_bene",
];

/// Aggregated features of one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderFeatures {
    pub count_unique_beneficiary: f64,
    pub count_unique_claims: f64,
    pub count_dead_beneficiary: f64,
    pub count_unique_states: f64,
    pub count_unique_counties: f64,
    pub mean_hospital_stay_days: f64,
    pub max_hospital_stay_days: f64,
    pub total_top_diagnosis_codes: f64,
    pub mean_total_diagnosis: f64,
    pub mean_total_procedures: f64,
    pub mean_number_of_physicians: f64,
    pub mean_difference_stay_vs_claim: f64,
    pub patients_under_top_attending_physician: f64,
    pub patients_under_top_operating_physician: f64,
    pub mean_claim_amount: f64,
    pub total_claim_amount: f64,
    pub std_claim_amount: f64,
    pub mean_age: f64,
    pub count_of_males: f64,
    pub count_of_females: f64,
    pub count_of_black_people: f64,
    pub count_of_white_people: f64,
    pub count_of_hispanic_people: f64,
    pub count_of_other_people: f64,
    pub count_of_unknown_people: f64,
    pub count_alzheimer: f64,
    pub count_heartfailure: f64,
    pub count_kidneydisease: f64,
    pub count_cancer: f64,
    pub count_obstrpulmonary: f64,
    pub count_depression: f64,
    pub count_diabetes: f64,
    pub count_ischemicheart: f64,
    pub count_osteoporasis: f64,
    pub count_rheumatoidarthritis: f64,
    pub count_stroke: f64,
    pub count_renal_disease: f64,
    pub mean_annual_inpatient_reimbursement: f64,
    pub mean_annual_inpatient_deductible: f64,
    pub mean_annual_outpatient_reimbursement: f64,
    pub mean_annual_outpatient_deductible: f64,
    pub count_inpatient: f64,
    pub count_outpatient: f64,
    pub claims_per_bene: f64,
}

impl ProviderFeatures {
    /// Values in [`FEATURE_NAMES`] order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.count_unique_beneficiary,
            self.count_unique_claims,
            self.count_dead_beneficiary,
            self.count_unique_states,
            self.count_unique_counties,
            self.mean_hospital_stay_days,
            self.max_hospital_stay_days,
            self.total_top_diagnosis_codes,
            self.mean_total_diagnosis,
            self.mean_total_procedures,
            self.mean_number_of_physicians,
            self.mean_difference_stay_vs_claim,
            self.patients_under_top_attending_physician,
            self.patients_under_top_operating_physician,
            self.mean_claim_amount,
            self.total_claim_amount,
            self.std_claim_amount,
            self.mean_age,
            self.count_of_males,
            self.count_of_females,
            self.count_of_black_people,
            self.count_of_white_people,
            self.count_of_hispanic_people,
            self.count_of_other_people,
            self.count_of_unknown_people,
            self.count_alzheimer,
            self.count_heartfailure,
            self.count_kidneydisease,
            self.count_cancer,
            self.count_obstrpulmonary,
            self.count_depression,
            self.count_diabetes,
            self.count_ischemicheart,
            self.count_osteoporasis,
            self.count_rheumatoidarthritis,
            self.count_stroke,
            self.count_renal_disease,
            self.mean_annual_inpatient_reimbursement,
            self.mean_annual_inpatient_deductible,
            self.mean_annual_outpatient_reimbursement,
            self.mean_annual_outpatient_deductible,
            self.count_inpatient,
            self.count_outpatient,
            self.claims_per_bene,
        ]
    }

    /// Inverse of [`to_array`](Self::to_array)
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [
            count_unique_beneficiary,
            count_unique_claims,
            count_dead_beneficiary,
            count_unique_states,
            count_unique_counties,
            mean_hospital_stay_days,
            max_hospital_stay_days,
            total_top_diagnosis_codes,
            mean_total_diagnosis,
            mean_total_procedures,
            mean_number_of_physicians,
            mean_difference_stay_vs_claim,
            patients_under_top_attending_physician,
            patients_under_top_operating_physician,
            mean_claim_amount,
            total_claim_amount,
            std_claim_amount,
            mean_age,
            count_of_males,
            count_of_females,
            count_of_black_people,
            count_of_white_people,
            count_of_hispanic_people,
            count_of_other_people,
            count_of_unknown_people,
            count_alzheimer,
            count_heartfailure,
            count_kidneydisease,
            count_cancer,
            count_obstrpulmonary,
            count_depression,
            count_diabetes,
            count_ischemicheart,
            count_osteoporasis,
            count_rheumatoidarthritis,
            count_stroke,
            count_renal_disease,
            mean_annual_inpatient_reimbursement,
            mean_annual_inpatient_deductible,
            mean_annual_outpatient_reimbursement,
            mean_annual_outpatient_deductible,
            count_inpatient,
            count_outpatient,
            claims_per_bene,
        ] = values;
        Self {
            count_unique_beneficiary,
            count_unique_claims,
            count_dead_beneficiary,
            count_unique_states,
            count_unique_counties,
            mean_hospital_stay_days,
            max_hospital_stay_days,
            total_top_diagnosis_codes,
            mean_total_diagnosis,
            mean_total_procedures,
            mean_number_of_physicians,
            mean_difference_stay_vs_claim,
            patients_under_top_attending_physician,
            patients_under_top_operating_physician,
            mean_claim_amount,
            total_claim_amount,
            std_claim_amount,
            mean_age,
            count_of_males,
            count_of_females,
            count_of_black_people,
            count_of_white_people,
            count_of_hispanic_people,
            count_of_other_people,
            count_of_unknown_people,
            count_alzheimer,
            count_heartfailure,
            count_kidneydisease,
            count_cancer,
            count_obstrpulmonary,
            count_depression,
            count_diabetes,
            count_ischemicheart,
            count_osteoporasis,
            count_rheumatoidarthritis,
            count_stroke,
            count_renal_disease,
            mean_annual_inpatient_reimbursement,
            mean_annual_inpatient_deductible,
            mean_annual_outpatient_reimbursement,
            mean_annual_outpatient_deductible,
            count_inpatient,
            count_outpatient,
            claims_per_bene,
        }
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| FraudError::ShapeError {
            expected: format!("{} features", FEATURE_COUNT),
            actual: format!("{} features", values.len()),
        })?;
        Ok(Self::from_array(array))
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|idx| self.to_array()[idx])
    }

    /// Build from a name -> value mapping holding exactly the named features
    ///
    /// Missing names, unknown names and non-finite values are all rejected.
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self> {
        if let Some(unknown) = map.keys().find(|k| feature_index(k).is_none()) {
            return Err(FraudError::invalid_parameter(
                unknown.as_str(),
                map[unknown],
                "not a provider feature",
            ));
        }

        let mut values = [0.0; FEATURE_COUNT];
        for (idx, name) in FEATURE_NAMES.iter().enumerate() {
            let value = *map
                .get(*name)
                .ok_or_else(|| FraudError::FeatureNotFound(name.to_string()))?;
            if !value.is_finite() {
                return Err(FraudError::invalid_parameter(*name, value, "must be finite"));
            }
            values[idx] = value;
        }
        Ok(Self::from_array(values))
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        FEATURE_NAMES
            .iter()
            .zip(self.to_array())
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    /// Whether every value is finite
    pub fn is_complete(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Position of a feature in [`FEATURE_NAMES`]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}
