//! Table validation
//!
//! Each input table is checked for required columns, key uniqueness, null
//! keys, negative amounts, category domains and a non-empty row count. The
//! validator never touches the table; it only reports.

mod report;

pub use report::{CheckKind, CheckResult, ValidationReport};

use crate::data::schema::*;
use crate::error::Result;
use crate::features::schema::FEATURE_NAMES;
use crate::utils::columns::{has_column, parse_code, parse_f64, string_values};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Minimum number of feature columns in a processed feature table
pub const MIN_FEATURE_COUNT: usize = 40;

/// Which table is being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Inpatient,
    Outpatient,
    Beneficiary,
    Labels,
    FeatureVector,
}

impl TableRole {
    pub fn name(&self) -> &'static str {
        match self {
            TableRole::Inpatient => "inpatient",
            TableRole::Outpatient => "outpatient",
            TableRole::Beneficiary => "beneficiary",
            TableRole::Labels => "labels",
            TableRole::FeatureVector => "feature_vector",
        }
    }

    /// Columns that must be present
    pub fn required_columns(&self) -> Vec<&'static str> {
        match self {
            TableRole::Inpatient => inpatient_columns(),
            TableRole::Outpatient => outpatient_columns(),
            TableRole::Beneficiary => beneficiary_columns(),
            TableRole::Labels => label_columns(),
            TableRole::FeatureVector => FEATURE_NAMES.to_vec(),
        }
    }

    fn primary_key(&self) -> Option<&'static str> {
        match self {
            TableRole::Inpatient | TableRole::Outpatient => Some(CLAIM_ID),
            TableRole::Beneficiary => Some(BENE_ID),
            TableRole::Labels => Some(PROVIDER),
            TableRole::FeatureVector => None,
        }
    }

    fn not_null_columns(&self) -> &'static [&'static str] {
        match self {
            TableRole::Inpatient => &[
                CLAIM_ID,
                BENE_ID,
                PROVIDER,
                CLAIM_START,
                CLAIM_END,
                ADMISSION,
                DISCHARGE,
            ],
            TableRole::Outpatient => &[CLAIM_ID, BENE_ID, PROVIDER, CLAIM_START, CLAIM_END],
            TableRole::Beneficiary => &[BENE_ID, DOB, GENDER, RACE],
            TableRole::Labels => &[PROVIDER, POTENTIAL_FRAUD],
            TableRole::FeatureVector => &[],
        }
    }

    fn monetary_columns(&self) -> &'static [&'static str] {
        match self {
            TableRole::Inpatient | TableRole::Outpatient => &[AMOUNT_REIMBURSED, DEDUCTIBLE_PAID],
            _ => &[],
        }
    }
}

/// Allowed values of a categorical column
#[derive(Debug, Clone, Copy)]
enum Domain {
    Codes(&'static [i64]),
    Labels(&'static [&'static str]),
}

impl Domain {
    fn contains(&self, raw: &str) -> bool {
        match self {
            Domain::Codes(codes) => parse_code(raw).map_or(false, |c| codes.contains(&c)),
            Domain::Labels(labels) => {
                labels.contains(&raw) || parse_code(raw).map_or(false, |c| c == 0 || c == 1)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Domain::Codes(codes) => format!("{:?}", codes),
            Domain::Labels(labels) => format!("{:?}", labels),
        }
    }
}

fn domains(role: TableRole) -> Vec<(&'static str, Domain)> {
    match role {
        TableRole::Beneficiary => vec![
            (GENDER, Domain::Codes(&[1, 2])),
            (RACE, Domain::Codes(&[1, 2, 3, 4, 5])),
            (RENAL_INDICATOR, Domain::Labels(&["0", "Y"])),
        ],
        TableRole::Labels => vec![(POTENTIAL_FRAUD, Domain::Labels(&["Yes", "No"]))],
        _ => Vec::new(),
    }
}

/// Table validator
#[derive(Debug, Clone, Default)]
pub struct Validator {
    fail_fast: bool,
}

impl Validator {
    /// Validator that returns reports without raising
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a single aggregated error when any check fails
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run every check for `role` against `df`
    pub fn validate(&self, df: &DataFrame, role: TableRole) -> Result<ValidationReport> {
        let mut checks = Vec::new();

        for col in role.required_columns() {
            let present = has_column(df, col);
            let message = if present {
                format!("Column '{}' exists", col)
            } else {
                format!("Missing column: {}", col)
            };
            checks.push(CheckResult::new(CheckKind::ColumnExists, Some(col), present, message));
        }

        if let Some(key) = role.primary_key() {
            if has_column(df, key) {
                let values = string_values(df, key)?;
                let unique: HashSet<&str> = values.iter().flatten().map(String::as_str).collect();
                checks.push(CheckResult::new(
                    CheckKind::UniqueValues,
                    Some(key),
                    unique.len() == values.len(),
                    format!("{} unique: {}/{}", key, unique.len(), values.len()),
                ));
            }
        }

        for (col, domain) in domains(role) {
            if has_column(df, col) {
                let values = string_values(df, col)?;
                let invalid = values
                    .iter()
                    .filter(|v| !v.as_deref().map_or(false, |raw| domain.contains(raw)))
                    .count();
                checks.push(CheckResult::new(
                    CheckKind::ValidValues,
                    Some(col),
                    invalid == 0,
                    format!("{} values outside {}: {}", col, domain.describe(), invalid),
                ));
            }
        }

        for &col in role.not_null_columns() {
            if has_column(df, col) {
                let nulls = string_values(df, col)?.iter().filter(|v| v.is_none()).count();
                checks.push(CheckResult::new(
                    CheckKind::NotNull,
                    Some(col),
                    nulls == 0,
                    format!("'{}' nulls: {}", col, nulls),
                ));
            }
        }

        for &col in role.monetary_columns() {
            if has_column(df, col) {
                let negative = string_values(df, col)?
                    .iter()
                    .filter_map(|v| v.as_deref().and_then(parse_f64))
                    .filter(|v| *v < 0.0)
                    .count();
                checks.push(CheckResult::new(
                    CheckKind::NonNegative,
                    Some(col),
                    negative == 0,
                    format!("Negative amounts: {}", negative),
                ));
            }
        }

        if role == TableRole::FeatureVector {
            checks.extend(self.feature_checks(df)?);
        }

        checks.push(CheckResult::new(
            CheckKind::RowCount,
            None,
            df.height() > 0,
            format!("Row count: {}", df.height()),
        ));

        let report = ValidationReport::from_checks(role.name(), checks, df.height(), df.width());

        if report.success {
            debug!(
                table = role.name(),
                checks = report.total_checks,
                rows = report.row_count,
                "Validation passed"
            );
        } else {
            warn!(
                table = role.name(),
                failed = report.failed,
                total = report.total_checks,
                "Validation failed"
            );
        }

        if self.fail_fast {
            report.into_result()
        } else {
            Ok(report)
        }
    }

    fn feature_checks(&self, df: &DataFrame) -> Result<Vec<CheckResult>> {
        let mut nulls = 0;
        for col in FEATURE_NAMES.iter().filter(|c| has_column(df, c)) {
            nulls += string_values(df, col)?
                .iter()
                .filter(|v| v.as_deref().and_then(parse_f64).is_none())
                .count();
        }

        let feature_count = df
            .get_column_names()
            .iter()
            .filter(|c| c.as_str() != PROVIDER && c.as_str() != POTENTIAL_FRAUD)
            .count();

        Ok(vec![
            CheckResult::new(
                CheckKind::NoNulls,
                Some("features"),
                nulls == 0,
                format!("Total nulls in features: {}", nulls),
            ),
            CheckResult::new(
                CheckKind::FeatureCount,
                None,
                feature_count >= MIN_FEATURE_COUNT,
                format!(
                    "Feature count: {} (expected >= {})",
                    feature_count, MIN_FEATURE_COUNT
                ),
            ),
        ])
    }
}
