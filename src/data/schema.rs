//! Column names of the raw input tables

pub const BENE_ID: &str = "BeneID";
pub const CLAIM_ID: &str = "ClaimID";
pub const CLAIM_START: &str = "ClaimStartDt";
pub const CLAIM_END: &str = "ClaimEndDt";
pub const PROVIDER: &str = "Provider";
pub const AMOUNT_REIMBURSED: &str = "InscClaimAmtReimbursed";
pub const ATTENDING_PHYSICIAN: &str = "AttendingPhysician";
pub const OPERATING_PHYSICIAN: &str = "OperatingPhysician";
pub const OTHER_PHYSICIAN: &str = "OtherPhysician";
pub const ADMISSION: &str = "AdmissionDt";
pub const ADMIT_DIAGNOSIS: &str = "ClmAdmitDiagnosisCode";
pub const DEDUCTIBLE_PAID: &str = "DeductibleAmtPaid";
pub const DISCHARGE: &str = "DischargeDt";
pub const DIAGNOSIS_GROUP: &str = "DiagnosisGroupCode";

pub const DIAGNOSIS_SLOTS: [&str; 10] = [
    "ClmDiagnosisCode_1",
    "ClmDiagnosisCode_2",
    "ClmDiagnosisCode_3",
    "ClmDiagnosisCode_4",
    "ClmDiagnosisCode_5",
    "ClmDiagnosisCode_6",
    "ClmDiagnosisCode_7",
    "ClmDiagnosisCode_8",
    "ClmDiagnosisCode_9",
    "ClmDiagnosisCode_10",
];

pub const PROCEDURE_SLOTS: [&str; 6] = [
    "ClmProcedureCode_1",
    "ClmProcedureCode_2",
    "ClmProcedureCode_3",
    "ClmProcedureCode_4",
    "ClmProcedureCode_5",
    "ClmProcedureCode_6",
];

pub const PHYSICIAN_SLOTS: [&str; 3] = [ATTENDING_PHYSICIAN, OPERATING_PHYSICIAN, OTHER_PHYSICIAN];

pub const DOB: &str = "DOB";
pub const DOD: &str = "DOD";
pub const GENDER: &str = "Gender";
pub const RACE: &str = "Race";
pub const RENAL_INDICATOR: &str = "RenalDiseaseIndicator";
pub const STATE: &str = "State";
pub const COUNTY: &str = "County";

pub const CHRONIC_CONDITIONS: [&str; 11] = [
    "ChronicCond_Alzheimer",
    "ChronicCond_Heartfailure",
    "ChronicCond_KidneyDisease",
    "ChronicCond_Cancer",
    "ChronicCond_ObstrPulmonary",
    "ChronicCond_Depression",
    "ChronicCond_Diabetes",
    "ChronicCond_IschemicHeart",
    "ChronicCond_Osteoporasis",
    "ChronicCond_rheumatoidarthritis",
    "ChronicCond_stroke",
];

pub const IP_ANNUAL_REIMBURSEMENT: &str = "IPAnnualReimbursementAmt";
pub const IP_ANNUAL_DEDUCTIBLE: &str = "IPAnnualDeductibleAmt";
pub const OP_ANNUAL_REIMBURSEMENT: &str = "OPAnnualReimbursementAmt";
pub const OP_ANNUAL_DEDUCTIBLE: &str = "OPAnnualDeductibleAmt";

pub const POTENTIAL_FRAUD: &str = "PotentialFraud";

/// Required columns of the outpatient claims table
pub fn outpatient_columns() -> Vec<&'static str> {
    let mut cols = vec![
        BENE_ID,
        CLAIM_ID,
        CLAIM_START,
        CLAIM_END,
        PROVIDER,
        AMOUNT_REIMBURSED,
        ATTENDING_PHYSICIAN,
        OPERATING_PHYSICIAN,
        OTHER_PHYSICIAN,
    ];
    cols.extend(DIAGNOSIS_SLOTS);
    cols.extend(PROCEDURE_SLOTS);
    cols.push(DEDUCTIBLE_PAID);
    cols.push(ADMIT_DIAGNOSIS);
    cols
}

/// Required columns of the inpatient claims table
pub fn inpatient_columns() -> Vec<&'static str> {
    let mut cols = outpatient_columns();
    cols.extend([ADMISSION, DISCHARGE, DIAGNOSIS_GROUP]);
    cols
}

/// Required columns of the beneficiary table
pub fn beneficiary_columns() -> Vec<&'static str> {
    let mut cols = vec![BENE_ID, DOB, DOD, GENDER, RACE, RENAL_INDICATOR, STATE, COUNTY];
    cols.extend(CHRONIC_CONDITIONS);
    cols.extend([
        IP_ANNUAL_REIMBURSEMENT,
        IP_ANNUAL_DEDUCTIBLE,
        OP_ANNUAL_REIMBURSEMENT,
        OP_ANNUAL_DEDUCTIBLE,
    ]);
    cols
}

/// Required columns of the provider label table
pub fn label_columns() -> Vec<&'static str> {
    vec![PROVIDER, POTENTIAL_FRAUD]
}
