//! Cleaned-table output in delimited-text form.
//!
//! Output is written to a sibling temporary file and renamed into place, so
//! a failed write never leaves a partial file at the destination.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};
use crate::utils::{log_operation_complete, log_operation_start};

/// Write a cleaned table as CSV at the destination path
///
/// Missing parent directories are created first; an existing file at the
/// destination is overwritten. The header row uses the table's column names
/// and no index column is emitted.
///
/// # Errors
/// Returns [`Error::Write`] if the destination cannot be created or the
/// table cannot be serialized.
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    log_operation_start("Writing", path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| write_error(path, e))?;
        }
    }

    let tmp_path = temp_path(path);
    if let Err(e) = serialize_to(batch, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_error(path, e));
    }

    log_operation_complete("wrote", path, batch.num_rows(), None);
    Ok(())
}

/// Sibling temporary path for the atomic write
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("output"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

fn serialize_to(batch: &RecordBatch, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| write_error(path, io::Error::other(e)))?;

    let header: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|field| field.name().as_str())
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| write_error(path, io::Error::other(e)))?;

    for row in 0..batch.num_rows() {
        let mut record = Vec::with_capacity(batch.num_columns());
        for column in batch.columns() {
            record.push(format_value(column, row).map_err(|m| {
                write_error(path, io::Error::other(m))
            })?);
        }
        writer
            .write_record(&record)
            .map_err(|e| write_error(path, io::Error::other(e)))?;
    }

    writer.flush().map_err(|e| write_error(path, e))
}

/// Render one cell; nulls become empty fields
fn format_value(column: &ArrayRef, row: usize) -> std::result::Result<String, String> {
    if column.is_null(row) {
        return Ok(String::new());
    }

    match column.data_type() {
        DataType::Utf8 => column
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string())
            .ok_or_else(|| "expected a string array".to_string()),
        DataType::Int64 => column
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row).to_string())
            .ok_or_else(|| "expected an integer array".to_string()),
        DataType::Float64 => column
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row).to_string())
            .ok_or_else(|| "expected a float array".to_string()),
        other => Err(format!("unsupported output column type {other}")),
    }
}

fn write_error(path: &Path, source: io::Error) -> Error {
    Error::Write {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("patient_id", DataType::Utf8, true),
            Field::new("age", DataType::Int64, true),
            Field::new("heart_rate_bpm", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("P001"), Some("P002")])) as ArrayRef,
                Arc::new(Int64Array::from(vec![34, 71])) as ArrayRef,
                Arc::new(Float64Array::from(vec![Some(72.5), None])) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_csv_creates_parents_and_omits_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean").join("out.csv");

        write_csv(&sample_batch(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "patient_id,age,heart_rate_bpm\nP001,34,72.5\nP002,71,\n"
        );
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        write_csv(&sample_batch(), &path).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.file_name()))
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
