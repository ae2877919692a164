//! A Rust library for cleaning and analyzing clinical cohort data with
//! schema validation, rule-based risk scoring, and text analysis.
//!
//! The centerpiece is a four-stage ETL pipeline (extract, standardize
//! column names, validate, transform, load) that turns messy delimited-text
//! and spreadsheet exports into schema-conformant Arrow tables and writes
//! them back out as clean CSV files.

pub mod analytics;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod registry;
pub mod schema;
pub mod text;
pub mod transform;
pub mod utils;
pub mod writer;

// Re-export the most common types for easier use
// Core types
pub use error::{Error, Result};
pub use pipeline::EtlPipeline;
pub use registry::{DatasetDescriptor, SchemaRegistry, SourceFormat};
pub use schema::{ColumnSpec, ColumnType, ValidationReport};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;

// Analytics capabilities
pub use analytics::{AnalyticsEngine, RiskLevel, RiskModel};
