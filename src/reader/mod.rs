//! Source file extraction into Arrow record batches.
//!
//! Extraction is deliberately dumb: every column comes out as a nullable
//! string array with the header names preserved verbatim, and empty fields
//! become nulls. Standardization and type coercion happen downstream.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calamine::{Data, Reader as _, Xlsx, open_workbook};

use crate::error::{Error, Result};
use crate::registry::SourceFormat;
use crate::utils::{log_operation_complete, log_operation_start};

/// Read a source file into a raw table, dispatching on its declared format
///
/// # Errors
/// Returns [`Error::SourceNotFound`] if the path does not exist and
/// [`Error::Parse`] on malformed content. Either is fatal; no partial table
/// is returned.
pub fn read_table(path: &Path, format: SourceFormat) -> Result<RecordBatch> {
    if !path.exists() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }

    log_operation_start("Extracting", path);
    let batch = match format {
        SourceFormat::Csv => read_csv(path),
        SourceFormat::Xlsx => read_xlsx(path),
    }?;
    log_operation_complete("extracted", path, batch.num_rows(), None);

    Ok(batch)
}

/// Read a delimited-text file into a record batch of nullable string columns
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).map_err(|e| parse_error(path, format!("failed to open: {e}")))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(parse_error(path, "missing header row"));
    }

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e.to_string()))?;
        for (idx, column) in columns.iter_mut().enumerate() {
            let value = record.get(idx).map(str::trim).filter(|v| !v.is_empty());
            column.push(value.map(str::to_string));
        }
    }

    build_string_batch(&headers, columns)
}

/// Read the first worksheet of an Excel workbook into a record batch of
/// nullable string columns
///
/// The first row is taken as the header; cell values are stringified the
/// same way the CSV path sees them, so the transform stage treats both
/// formats identically.
pub fn read_xlsx(path: &Path) -> Result<RecordBatch> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| parse_error(path, e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error(path, "workbook has no worksheets"))?
        .map_err(|e| parse_error(path, e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| parse_error(path, "missing header row"))?
        .iter()
        .map(|cell| cell_value(cell).unwrap_or_default())
        .collect();
    if headers.is_empty() {
        return Err(parse_error(path, "missing header row"));
    }

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(idx).and_then(cell_value));
        }
    }

    build_string_batch(&headers, columns)
}

/// Stringify one spreadsheet cell; empty and error cells become nulls
fn cell_value(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        other => Some(other.to_string()),
    }
}

fn build_string_batch(headers: &[String], columns: Vec<Vec<Option<String>>>) -> Result<RecordBatch> {
    let fields: Vec<Field> = headers
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|values| Arc::new(StringArray::from(values)) as ArrayRef)
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn parse_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Parse {
        path: PathBuf::from(path),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use std::io::Write as _;

    #[test]
    fn test_read_csv_preserves_headers_and_nulls_empty_fields() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "Patient ID,AGE,Blood Pressure (Systolic)").unwrap();
        writeln!(file, "P001,34,120").unwrap();
        writeln!(file, "P002,,135").unwrap();
        file.flush().unwrap();

        let batch = read_csv(file.path()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "Patient ID");
        assert_eq!(batch.schema().field(2).name(), "Blood Pressure (Systolic)");

        let ages = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ages.value(0), "34");
        assert!(ages.is_null(1));
    }

    #[test]
    fn test_missing_source_file() {
        let path = Path::new("no/such/file.csv");
        match read_table(path, SourceFormat::Csv) {
            Err(Error::SourceNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_ragged_row_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2,3").unwrap();
        file.flush().unwrap();

        assert!(matches!(read_csv(file.path()), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), None);
        assert_eq!(cell_value(&Data::String("  ".to_string())), None);
        assert_eq!(cell_value(&Data::Float(42.0)), Some("42".to_string()));
        assert_eq!(cell_value(&Data::Int(7)), Some("7".to_string()));
        assert_eq!(
            cell_value(&Data::String(" ok ".to_string())),
            Some("ok".to_string())
        );
    }
}
