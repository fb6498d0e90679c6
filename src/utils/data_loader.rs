//! Table loading and saving

use crate::error::{FraudError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Data loader for CSV and Parquet tables
///
/// Every column is read as a string; parsing and validation happen in the crate.
pub struct DataLoader;

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a Parquet file, casting every column to string
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;

        let columns = df
            .get_columns()
            .iter()
            .map(|c| c.cast(&DataType::String))
            .collect::<PolarsResult<Vec<Column>>>()?;
        Ok(DataFrame::new(columns)?)
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "parquet" | "pq" => self.load_parquet(path),
            _ => self.load_csv(path),
        }
    }
}

/// Save tables to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating parent directories as needed
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Save to Parquet
    pub fn save_parquet(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;

        ParquetWriter::new(file)
            .finish(df)
            .map_err(|e| FraudError::DataError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Provider,InscClaimAmtReimbursed,DOD").unwrap();
        writeln!(file, "PRV1,100,NA").unwrap();
        writeln!(file, "PRV2,300,2009-12-01").unwrap();
        writeln!(file, "PRV3,50,").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_csv_columns_read_as_strings() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        let amounts = df.column("InscClaimAmtReimbursed").unwrap();
        assert_eq!(amounts.dtype(), &DataType::String);
    }

    #[test]
    fn test_parquet_columns_cast_to_strings() {
        let mut df = DataFrame::new(vec![
            Column::new("Provider".into(), &["PRV1", "PRV2"]),
            Column::new("InscClaimAmtReimbursed".into(), &[100i64, 300]),
        ])
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.parquet");
        DataSaver::save_parquet(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load_auto(&path).unwrap();
        let amounts = loaded.column("InscClaimAmtReimbursed").unwrap();
        assert_eq!(amounts.dtype(), &DataType::String);
        assert_eq!(amounts.str().unwrap().get(1), Some("300"));
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let err = DataLoader::new().load_csv("/nonexistent/table.csv").unwrap_err();
        assert!(matches!(err, FraudError::DataError(_)));
    }

    #[test]
    fn test_save_csv_round_trip() {
        let mut df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            Column::new("b".into(), &["x", "y", "z"]),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        DataSaver::save_csv(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load_auto(&path).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}
