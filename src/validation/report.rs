//! Validation report types

use crate::error::FraudError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of check run against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    ColumnExists,
    UniqueValues,
    NotNull,
    NonNegative,
    ValidValues,
    RowCount,
    NoNulls,
    FeatureCount,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckKind::ColumnExists => "column_exists",
            CheckKind::UniqueValues => "unique_values",
            CheckKind::NotNull => "not_null",
            CheckKind::NonNegative => "non_negative",
            CheckKind::ValidValues => "valid_values",
            CheckKind::RowCount => "row_count",
            CheckKind::NoNulls => "no_nulls",
            CheckKind::FeatureCount => "feature_count",
        };
        f.write_str(name)
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    /// Column the check ran on; `None` for table-level checks
    pub column: Option<String>,
    pub success: bool,
    pub message: String,
}

impl CheckResult {
    pub fn new(
        kind: CheckKind,
        column: Option<&str>,
        success: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            column: column.map(str::to_string),
            success,
            message: message.into(),
        }
    }

    /// "kind on column: message"
    pub fn describe(&self) -> String {
        format!(
            "{} on {}: {}",
            self.kind,
            self.column.as_deref().unwrap_or("table"),
            self.message
        )
    }
}

/// Summary of every check run against one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub dataset: String,
    pub success: bool,
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub failed_checks: Vec<CheckResult>,
    pub row_count: usize,
    pub column_count: usize,
}

impl ValidationReport {
    /// Build a report from individual check outcomes
    pub fn from_checks(
        dataset: impl Into<String>,
        checks: Vec<CheckResult>,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let total_checks = checks.len();
        let failed_checks: Vec<CheckResult> = checks.into_iter().filter(|c| !c.success).collect();
        let failed = failed_checks.len();
        Self {
            dataset: dataset.into(),
            success: failed == 0,
            total_checks,
            passed: total_checks - failed,
            failed,
            failed_checks,
            row_count,
            column_count,
        }
    }

    /// Human-readable description of every failed check
    pub fn failure_messages(&self) -> Vec<String> {
        self.failed_checks.iter().map(CheckResult::describe).collect()
    }

    /// Whether any required column is missing
    pub fn has_schema_failure(&self) -> bool {
        self.failed_checks
            .iter()
            .any(|c| c.kind == CheckKind::ColumnExists)
    }

    /// Aggregated error for a failing report, `None` when every check passed
    pub fn to_error(&self) -> Option<FraudError> {
        if self.success {
            return None;
        }
        let table = self.dataset.clone();
        let failures = self.failure_messages();
        Some(if self.has_schema_failure() {
            FraudError::SchemaError { table, failures }
        } else {
            FraudError::DataQualityError { table, failures }
        })
    }

    /// Turn a failing report into its aggregated error
    pub fn into_result(self) -> crate::error::Result<Self> {
        match self.to_error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let checks = vec![
            CheckResult::new(CheckKind::ColumnExists, Some("ClaimID"), true, "Column 'ClaimID' exists"),
            CheckResult::new(CheckKind::NotNull, Some("BeneID"), false, "'BeneID' nulls: 2"),
            CheckResult::new(CheckKind::RowCount, None, true, "Row count: 4"),
        ];
        let report = ValidationReport::from_checks("inpatient", checks, 4, 30);
        assert!(!report.success);
        assert_eq!(report.total_checks, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failure_messages(), vec!["not_null on BeneID: 'BeneID' nulls: 2"]);
        assert!(matches!(report.to_error(), Some(FraudError::DataQualityError { .. })));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let checks = vec![
            CheckResult::new(CheckKind::ColumnExists, Some("Provider"), false, "Missing column: Provider"),
            CheckResult::new(CheckKind::UniqueValues, Some("ClaimID"), false, "ClaimID unique: 1/2"),
        ];
        let report = ValidationReport::from_checks("outpatient", checks, 2, 26);
        match report.into_result() {
            Err(FraudError::SchemaError { table, failures }) => {
                assert_eq!(table, "outpatient");
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
