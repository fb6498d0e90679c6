//! Synthetic raw tables shared by the integration tests
//!
//! Every fourth provider is fraudulent. Fraudulent providers bill more
//! claims, larger amounts and inpatient stays; the others bill small
//! same-day outpatient claims.

#![allow(dead_code)]

use provider_fraud::config::{DataPaths, PipelineConfig};
use provider_fraud::features::LabeledFeatureTable;
use provider_fraud::optimizer::SearchSpace;
use provider_fraud::runner::PipelineRunner;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const OUTPATIENT_HEADER: &str = "BeneID,ClaimID,ClaimStartDt,ClaimEndDt,Provider,InscClaimAmtReimbursed,\
AttendingPhysician,OperatingPhysician,OtherPhysician,\
ClmDiagnosisCode_1,ClmDiagnosisCode_2,ClmDiagnosisCode_3,ClmDiagnosisCode_4,ClmDiagnosisCode_5,\
ClmDiagnosisCode_6,ClmDiagnosisCode_7,ClmDiagnosisCode_8,ClmDiagnosisCode_9,ClmDiagnosisCode_10,\
ClmProcedureCode_1,ClmProcedureCode_2,ClmProcedureCode_3,ClmProcedureCode_4,ClmProcedureCode_5,\
ClmProcedureCode_6,DeductibleAmtPaid,ClmAdmitDiagnosisCode";

const BENEFICIARY_HEADER: &str = "BeneID,DOB,DOD,Gender,Race,RenalDiseaseIndicator,State,County,\
ChronicCond_Alzheimer,ChronicCond_Heartfailure,ChronicCond_KidneyDisease,ChronicCond_Cancer,\
ChronicCond_ObstrPulmonary,ChronicCond_Depression,ChronicCond_Diabetes,ChronicCond_IschemicHeart,\
ChronicCond_Osteoporasis,ChronicCond_rheumatoidarthritis,ChronicCond_stroke,\
IPAnnualReimbursementAmt,IPAnnualDeductibleAmt,OPAnnualReimbursementAmt,OPAnnualDeductibleAmt";

pub const BENES_PER_PROVIDER: usize = 2;

pub fn provider_id(p: usize) -> String {
    format!("PRV5{:04}", p)
}

pub fn is_fraud(p: usize) -> bool {
    p % 4 == 0
}

pub fn claims_for(p: usize) -> usize {
    if is_fraud(p) {
        6
    } else {
        3
    }
}

fn claim_row(p: usize, c: usize, inpatient: bool) -> String {
    let fraud = is_fraud(p);
    let bene = format!("BENE{}_{}", p, c % BENES_PER_PROVIDER);
    let claim = format!("CLM{}_{}", p, c);
    let start = format!("2009-0{}-10", 1 + c % 9);
    let end = if fraud { format!("2009-0{}-15", 1 + c % 9) } else { start.clone() };
    let amount = if fraud { 5000 + 100 * c } else { 100 + 10 * c };
    let attending = format!("PHY{}", p % 7);
    let operating = if inpatient { format!("PHY9{}", p % 3) } else { "NA".to_string() };

    let n_diag = if fraud { 8 } else { 2 };
    let diagnoses: Vec<String> = (0..10)
        .map(|i| if i < n_diag { format!("40{}{}", i, p % 3) } else { "NA".to_string() })
        .collect();
    let procedures: Vec<&str> = (0..6)
        .map(|i| if inpatient && i == 0 { "9904" } else { "NA" })
        .collect();
    let deductible = if inpatient { "1068" } else { "0" };
    let admit = if fraud { "4280" } else { "V7612" };

    let mut row = format!(
        "{bene},{claim},{start},{end},{},{amount},{attending},{operating},NA,{},{},{deductible},{admit}",
        provider_id(p),
        diagnoses.join(","),
        procedures.join(","),
    );
    if inpatient {
        write!(row, ",{start},{end},201").unwrap();
    }
    row
}

fn beneficiary_row(p: usize, b: usize) -> String {
    let dob = format!("19{}-05-01", 30 + (p + b) % 40);
    let dod = if is_fraud(p) && b == 0 { "2009-12-01" } else { "NA" };
    let gender = 1 + (p + b) % 2;
    let race = 1 + (p + b) % 5;
    let renal = if (p + b) % 3 == 0 { "Y" } else { "0" };
    let chronic: Vec<String> = (0..11).map(|i| (1 + (p + b + i) % 2).to_string()).collect();
    format!(
        "BENE{p}_{b},{dob},{dod},{gender},{race},{renal},{},{},{},{},{},{},{}",
        p % 10,
        p % 25,
        chronic.join(","),
        if is_fraud(p) { 36000 } else { 2000 + 10 * p },
        if is_fraud(p) { 1068 } else { 0 },
        300 + 5 * p,
        100,
    )
}

/// Write the four raw tables under their default names in `dir`
pub fn write_dataset(dir: &Path, n_providers: usize) -> DataPaths {
    let paths = DataPaths::in_dir(dir);

    let mut inpatient = format!("{OUTPATIENT_HEADER},AdmissionDt,DischargeDt,DiagnosisGroupCode\n");
    let mut outpatient = format!("{OUTPATIENT_HEADER}\n");
    let mut beneficiary = format!("{BENEFICIARY_HEADER}\n");
    let mut labels = String::from("Provider,PotentialFraud\n");

    for p in 0..n_providers {
        for c in 0..claims_for(p) {
            if is_fraud(p) && c % 2 == 0 {
                writeln!(inpatient, "{}", claim_row(p, c, true)).unwrap();
            } else {
                writeln!(outpatient, "{}", claim_row(p, c, false)).unwrap();
            }
        }
        for b in 0..BENES_PER_PROVIDER {
            writeln!(beneficiary, "{}", beneficiary_row(p, b)).unwrap();
        }
        writeln!(labels, "{},{}", provider_id(p), if is_fraud(p) { "Yes" } else { "No" }).unwrap();
    }

    fs::write(&paths.inpatient, inpatient).unwrap();
    fs::write(&paths.outpatient, outpatient).unwrap();
    fs::write(&paths.beneficiary, beneficiary).unwrap();
    fs::write(&paths.labels, labels).unwrap();
    paths
}

/// Configuration writing everything under `dir`, with a short search
pub fn test_config(dir: &Path, data: DataPaths) -> PipelineConfig {
    PipelineConfig::default()
        .with_data(data)
        .with_output_dirs(dir.join("processed"), dir.join("artifacts"))
        .with_tracking_dir(dir.join("runs"))
        .with_n_trials(3)
        .with_cv_folds(3)
        .with_startup_trials(2)
}

/// Small booster space so a tuning run takes well under a second per trial
pub fn small_space() -> SearchSpace {
    SearchSpace::new()
        .int("n_estimators", 5, 15)
        .float("learning_rate", 0.05, 0.3)
        .int("max_depth", 2, 3)
        .float("subsample", 0.7, 0.9)
        .float("colsample_bytree", 0.7, 0.9)
        .int("min_child_weight", 1, 2)
        .float("gamma", 0.0, 0.5)
        .float("reg_alpha", 0.0, 1.0)
        .float("reg_lambda", 0.5, 2.0)
}

/// Provider feature table built from a fresh synthetic dataset
pub fn feature_table(dir: &Path, n_providers: usize) -> LabeledFeatureTable {
    let data = write_dataset(dir, n_providers);
    PipelineRunner::new(test_config(dir, data))
        .unwrap()
        .run_features()
        .unwrap()
        .table
}
