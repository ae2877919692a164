//! Type coercion and feature enrichment for standardized tables.
//!
//! The transform stage walks the dataset schema in order, funnels each
//! numeric column through a parse-to-f64 pass (unparseable values become
//! nulls), fills integer-column nulls with the column median, and casts to
//! the declared Arrow type. Columns outside the schema pass through
//! untouched. Enrichment derives the categorical `age_group` column for the
//! clinical dataset.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, ColumnType};

/// Age bins for the derived `age_group` column, half-open on the right
const AGE_BINS: [(f64, f64, &str); 4] = [
    (0.0, 18.0, "Pediatric"),
    (18.0, 40.0, "Adult"),
    (40.0, 65.0, "Middle-Aged"),
    (65.0, 100.0, "Senior"),
];

/// Name of the derived age-bucket column
pub const AGE_GROUP_COLUMN: &str = "age_group";

/// Coerce every schema column of a standardized table to its declared type
///
/// Columns are processed in schema order and rebuilt in place, so the
/// table's column order is preserved. A schema column absent from the table
/// is skipped; the validation gate runs before this in a pipeline, so that
/// only happens when calling the transform standalone.
///
/// # Errors
/// Any per-column failure aborts the whole transform with
/// [`Error::Coercion`] naming the offending column and declared type.
pub fn apply_schema(batch: &RecordBatch, columns: &[ColumnSpec]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = schema.fields().to_vec();
    let mut arrays = batch.columns().to_vec();

    for spec in columns {
        let Ok(idx) = schema.index_of(&spec.name) else {
            continue;
        };
        let coerced = coerce_column(&arrays[idx], spec)?;
        fields[idx] = Arc::new(Field::new(&spec.name, coerced.data_type().clone(), true));
        arrays[idx] = coerced;
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Append the derived `age_group` column to a clinical table
///
/// Each age maps to exactly one of four half-open buckets; ages outside
/// `[0, 100)` get a null bucket. A table without an `age` column is
/// returned unchanged.
pub fn derive_age_groups(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let Ok(age_idx) = schema.index_of("age") else {
        return Ok(batch.clone());
    };

    let ages = numeric_values(&batch.columns()[age_idx]).map_err(|message| Error::Coercion {
        column: "age".to_string(),
        ty: ColumnType::Integer,
        message,
    })?;
    let labels: Vec<Option<&str>> = ages
        .iter()
        .map(|age| age.and_then(age_group_label))
        .collect();
    let label_array: ArrayRef = Arc::new(StringArray::from(labels));

    let mut fields = schema.fields().to_vec();
    let mut arrays = batch.columns().to_vec();
    let group_field = Arc::new(Field::new(AGE_GROUP_COLUMN, DataType::Utf8, true));

    // Replace an existing bucket column rather than duplicating it
    if let Ok(idx) = schema.index_of(AGE_GROUP_COLUMN) {
        fields[idx] = group_field;
        arrays[idx] = label_array;
    } else {
        fields.push(group_field);
        arrays.push(label_array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Bucket label for one age, or `None` outside the binned range
fn age_group_label(age: f64) -> Option<&'static str> {
    AGE_BINS
        .iter()
        .find(|(lo, hi, _)| age >= *lo && age < *hi)
        .map(|(_, _, label)| *label)
}

fn coerce_column(array: &ArrayRef, spec: &ColumnSpec) -> Result<ArrayRef> {
    match spec.column_type {
        // String columns are exempt from the numeric funnel; coercing them
        // through it would null out every value
        ColumnType::String => Ok(array.clone()),
        ColumnType::Integer => {
            let values = numeric_values(array).map_err(|m| coercion_error(spec, m))?;
            integer_array(&values, spec)
        }
        ColumnType::Float => {
            let values = numeric_values(array).map_err(|m| coercion_error(spec, m))?;
            Ok(Arc::new(Float64Array::from(values)))
        }
    }
}

/// Parse a column's values as f64, turning unparseable values into nulls
///
/// Accepts string columns (the usual case straight out of extraction) as
/// well as already-numeric columns, so re-transforming a cleaned table is a
/// no-op.
fn numeric_values(array: &ArrayRef) -> std::result::Result<Vec<Option<f64>>, String> {
    match array.data_type() {
        DataType::Utf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| "expected a string array".to_string())?;
            Ok((0..strings.len())
                .map(|i| {
                    if strings.is_null(i) {
                        None
                    } else {
                        strings
                            .value(i)
                            .trim()
                            .parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite())
                    }
                })
                .collect())
        }
        DataType::Int64 => {
            let ints = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| "expected an integer array".to_string())?;
            Ok((0..ints.len())
                .map(|i| (!ints.is_null(i)).then(|| ints.value(i) as f64))
                .collect())
        }
        DataType::Float64 => {
            let floats = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| "expected a float array".to_string())?;
            Ok((0..floats.len())
                .map(|i| (!floats.is_null(i)).then(|| floats.value(i)))
                .collect())
        }
        other => Err(format!("cannot coerce values of type {other}")),
    }
}

/// Build the integer column, filling nulls with the column median
fn integer_array(values: &[Option<f64>], spec: &ColumnSpec) -> Result<ArrayRef> {
    let fill = median(values);

    let mut out: Vec<i64> = Vec::with_capacity(values.len());
    for value in values {
        let Some(v) = value.or(fill) else {
            return Err(coercion_error(
                spec,
                "no numeric values to compute a fill median",
            ));
        };
        if v < i64::MIN as f64 || v > i64::MAX as f64 {
            return Err(coercion_error(spec, format!("value {v} out of integer range")));
        }
        // truncating cast, matching the behavior of the integer astype
        out.push(v as i64);
    }

    Ok(Arc::new(Int64Array::from(out)))
}

/// Median over the present values, `None` if every value is null
fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);

    let mid = present.len() / 2;
    if present.len() % 2 == 1 {
        Some(present[mid])
    } else {
        Some((present[mid - 1] + present[mid]) / 2.0)
    }
}

fn coercion_error(spec: &ColumnSpec, message: impl Into<String>) -> Error {
    Error::Coercion {
        column: spec.name.clone(),
        ty: spec.column_type,
        message: message.into(),
    }
}
