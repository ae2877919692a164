//! The four-stage ETL pipeline.
//!
//! Extraction, column standardization, validation, transformation, and
//! loading run strictly in order for one dataset at a time. Every stage is
//! a precondition for the next; the first failure aborts the run and no
//! partial output is ever written. Re-running with unchanged source data
//! and configuration produces a byte-for-byte identical output file.

use std::collections::BTreeMap;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use log::info;

use crate::error::{Error, Result};
use crate::registry::SchemaRegistry;
use crate::schema::{ValidationReport, standardize_columns, validate_columns};
use crate::{reader, transform, writer};

/// An encapsulated ETL pipeline over a fixed schema registry
///
/// The pipeline owns nothing but a reference to the read-only registry;
/// each run materializes its own transient tables and drops them when done,
/// so sequential runs share no state.
pub struct EtlPipeline<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> EtlPipeline<'a> {
    /// Create a pipeline over a schema registry
    #[must_use]
    pub const fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Stage 1: read the dataset's source file into a raw table
    ///
    /// Column names are preserved verbatim and row order is preserved as
    /// read.
    pub fn extract(&self, key: &str) -> Result<RecordBatch> {
        let descriptor = self.registry.descriptor(key)?;
        reader::read_table(&descriptor.source_path, descriptor.format)
    }

    /// Stage 2: check a standardized table against the dataset schema
    ///
    /// Returns the report rather than failing, so callers can inspect the
    /// missing columns; [`EtlPipeline::run`] converts a failed report into
    /// [`Error::Validation`].
    pub fn validate(&self, batch: &RecordBatch, key: &str) -> Result<ValidationReport> {
        let descriptor = self.registry.descriptor(key)?;
        Ok(validate_columns(batch, &descriptor.columns))
    }

    /// Stage 3: coerce types against the schema and enrich derived features
    pub fn transform(&self, batch: &RecordBatch, key: &str) -> Result<RecordBatch> {
        let descriptor = self.registry.descriptor(key)?;
        let coerced = transform::apply_schema(batch, &descriptor.columns)?;
        if descriptor.derive_age_groups {
            transform::derive_age_groups(&coerced)
        } else {
            Ok(coerced)
        }
    }

    /// Stage 4: write the cleaned table to the configured destination
    pub fn load(&self, batch: &RecordBatch, key: &str) -> Result<()> {
        let descriptor = self.registry.descriptor(key)?;
        writer::write_csv(batch, &descriptor.output_path)
    }

    /// Run the full pipeline for one dataset
    ///
    /// On success the output file reflects exactly the returned cleaned
    /// table; on failure nothing is written.
    pub fn run(&self, key: &str) -> Result<RecordBatch> {
        info!("Starting ETL pipeline for '{key}'");
        let start = Instant::now();

        let raw = self.extract(key)?;
        let standardized = standardize_columns(&raw)?;
        info!(
            "Standardized {} column names for '{key}'",
            standardized.num_columns()
        );

        let report = self.validate(&standardized, key)?;
        if !report.is_valid() {
            return Err(Error::Validation {
                dataset: key.to_string(),
                missing: report.missing,
            });
        }

        let cleaned = self.transform(&standardized, key)?;
        self.load(&cleaned, key)?;

        info!(
            "ETL pipeline for '{key}' completed with {} rows in {:?}",
            cleaned.num_rows(),
            start.elapsed()
        );
        Ok(cleaned)
    }

    /// Run the pipeline for every registered dataset, in key order
    ///
    /// Datasets are processed sequentially; the first failing dataset
    /// aborts the batch.
    pub fn run_all(&self) -> Result<BTreeMap<String, RecordBatch>> {
        let mut cleaned = BTreeMap::new();
        for key in self.registry.keys() {
            cleaned.insert(key.to_string(), self.run(key)?);
        }
        Ok(cleaned)
    }
}
