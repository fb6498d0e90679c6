//! Column extraction and cell parsing
//!
//! Raw tables arrive with every column as a string. These helpers pull a
//! column out of a [`DataFrame`] and turn cells into typed values, mapping
//! the usual missing-value spellings to `None`.

use crate::error::{FraudError, Result};
use chrono::NaiveDate;
use polars::prelude::*;

/// Cell spellings treated as missing
pub const MISSING_MARKERS: [&str; 6] = ["", "NA", "NaN", "nan", "null", "None"];

/// Accepted date layouts, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Normalise a raw cell, returning `None` for missing markers
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether the frame has a column with this name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Column names in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|c| c.to_string())
        .collect()
}

/// Read a column as optional strings
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| FraudError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|cell| cell.and_then(normalize_cell))
        .collect();
    Ok(values)
}

/// Read a column as optional strings, or all-missing when the column is absent
pub fn optional_string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if has_column(df, name) {
        string_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Read a column as optional floats; unparsable cells become `None`
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(string_values(df, name)?
        .into_iter()
        .map(|cell| cell.as_deref().and_then(parse_f64))
        .collect())
}

/// Parse a numeric cell
pub fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integral category code, accepting "2" and "2.0"
pub fn parse_code(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    parse_f64(trimmed)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

/// Parse a calendar date; a trailing time component is ignored
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Format a date the way [`parse_date`] reads it first
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMATS[0]).to_string()
}

/// Take a required string cell, reporting the row on failure
pub fn required(value: Option<String>, column: &str, row: usize, table: &str) -> Result<String> {
    value.ok_or_else(|| FraudError::DataQualityError {
        table: table.to_string(),
        failures: vec![format!("'{}' is missing at row {}", column, row)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell("NA"), None);
        assert_eq!(normalize_cell("  "), None);
        assert_eq!(normalize_cell(" PHY1 "), Some("PHY1".to_string()));
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("2"), Some(2));
        assert_eq!(parse_code("2.0"), Some(2));
        assert_eq!(parse_code("2.5"), None);
        assert_eq!(parse_code("Y"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2009, 4, 12);
        assert_eq!(parse_date("2009-04-12"), expected);
        assert_eq!(parse_date("2009-04-12 00:00:00"), expected);
        assert_eq!(parse_date("04/12/2009"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2009-02-30"), None);
    }

    #[test]
    fn test_string_and_float_columns() {
        let df = df!(
            "Provider" => &["PRV1", "NA", "PRV3"],
            "Amount" => &["100", "abc", ""]
        )
        .unwrap();

        let providers = string_values(&df, "Provider").unwrap();
        assert_eq!(providers, vec![Some("PRV1".to_string()), None, Some("PRV3".to_string())]);

        let amounts = f64_values(&df, "Amount").unwrap();
        assert_eq!(amounts, vec![Some(100.0), None, None]);

        let absent = optional_string_values(&df, "AdmissionDt").unwrap();
        assert_eq!(absent, vec![None, None, None]);

        assert!(matches!(
            string_values(&df, "Missing"),
            Err(FraudError::FeatureNotFound(_))
        ));
    }
}
