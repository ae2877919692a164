//! Target schemas and column-name standardization.
//!
//! Source files arrive with arbitrary human-entered headers ("Patient ID",
//! "Blood Pressure (Systolic)"). This module normalizes those names to a
//! canonical snake_case form and checks standardized tables against the
//! declared dataset schemas.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Represents the semantic type of a target column
///
/// This enum standardizes the types across datasets, independent of the
/// Arrow representation used in cleaned tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Text value
    String,
    /// Integer value
    Integer,
    /// Decimal value
    Float,
}

impl ColumnType {
    /// Convert to the Arrow `DataType` used in cleaned tables
    #[must_use]
    pub fn to_arrow_type(self) -> DataType {
        match self {
            ColumnType::String => DataType::Utf8,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "String"),
            ColumnType::Integer => write!(f, "Integer"),
            ColumnType::Float => write!(f, "Float"),
        }
    }
}

/// A single target column in a dataset schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Standardized column name
    pub name: String,
    /// Semantic type the transform stage coerces the column to
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a new column spec
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Convert to an Arrow field for the cleaned table
    #[must_use]
    pub fn to_arrow_field(&self) -> Field {
        Field::new(&self.name, self.column_type.to_arrow_type(), true)
    }
}

/// Normalize a single column name to canonical snake_case form
///
/// Surrounding whitespace is trimmed, letters lower-cased, internal spaces
/// become underscores, and parenthesis/bracket characters are stripped. Any
/// remaining character outside `[a-z0-9_]` maps to an underscore; runs of
/// underscores are collapsed and trimmed from the ends, so the result always
/// matches `^[a-z0-9_]*$`.
#[must_use]
pub fn standardize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_underscore = false;
    for ch in name.trim().chars() {
        let ch = ch.to_ascii_lowercase();
        match ch {
            '(' | ')' | '[' | ']' => {}
            'a'..='z' | '0'..='9' => {
                if pending_underscore && !out.is_empty() {
                    out.push('_');
                }
                pending_underscore = false;
                out.push(ch);
            }
            _ => pending_underscore = true,
        }
    }
    out
}

/// Rename every column of a table to its standardized form
///
/// The row content is untouched; only the schema changes. Two source
/// columns that standardize to the same name are a configuration defect and
/// fail with [`Error::DuplicateColumn`].
pub fn standardize_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut seen = HashSet::with_capacity(schema.fields().len());
    let mut fields = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let name = standardize_name(field.name());
        if !seen.insert(name.clone()) {
            return Err(Error::DuplicateColumn(name));
        }
        fields.push(Arc::new(Field::new(
            &name,
            field.data_type().clone(),
            field.is_nullable(),
        )));
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        batch.columns().to_vec(),
    )?)
}

/// Outcome of checking a standardized table against a dataset schema
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Schema columns absent from the table
    pub missing: Vec<String>,
}

impl ValidationReport {
    /// Whether every schema column is present in the table
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check that every schema column exists among the table's columns
///
/// Value-level type checks are deferred to the transform stage, which
/// performs the actual coercion.
#[must_use]
pub fn validate_columns(batch: &RecordBatch, columns: &[ColumnSpec]) -> ValidationReport {
    let schema = batch.schema();
    let missing = columns
        .iter()
        .filter(|spec| schema.index_of(&spec.name).is_err())
        .map(|spec| spec.name.clone())
        .collect();

    ValidationReport { missing }
}
