//! Dataset descriptors and the schema registry.
//!
//! The registry is pure configuration: an immutable mapping from logical
//! dataset keys (e.g. `clinical_data`) to where the source file lives, what
//! format it is in, where the cleaned output goes, and the target column
//! schema. It is created once at startup and passed around by reference;
//! nothing in the pipeline mutates it.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{ColumnSpec, ColumnType};

/// Format of a dataset's source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Comma-separated text
    Csv,
    /// Excel workbook
    Xlsx,
}

/// Immutable description of one logical dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Path of the source file
    pub source_path: PathBuf,
    /// Format of the source file
    pub format: SourceFormat,
    /// Path the cleaned table is written to
    pub output_path: PathBuf,
    /// Target column schema, in schema order
    pub columns: Vec<ColumnSpec>,
    /// Derive the `age_group` column during transform
    #[serde(default)]
    pub derive_age_groups: bool,
}

/// Read-only mapping from dataset keys to their descriptors
///
/// Keys iterate in sorted order, so multi-dataset runs are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    datasets: BTreeMap<String, DatasetDescriptor>,
}

impl SchemaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset descriptor under a key
    pub fn insert(&mut self, key: impl Into<String>, descriptor: DatasetDescriptor) {
        self.datasets.insert(key.into(), descriptor);
    }

    /// Look up the descriptor for a dataset key
    pub fn descriptor(&self, key: &str) -> Result<&DatasetDescriptor> {
        self.datasets
            .get(key)
            .ok_or_else(|| Error::Configuration(format!("unknown dataset key '{key}'")))
    }

    /// Whether a dataset key is registered
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.datasets.contains_key(key)
    }

    /// Dataset keys, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Number of registered datasets
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the registry has no datasets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Load a registry from a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Configuration(format!(
                "failed to open registry config {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_reader(file).map_err(|e| {
            Error::Configuration(format!(
                "invalid registry config {}: {e}",
                path.display()
            ))
        })
    }

    /// Built-in configuration for the study cohort
    ///
    /// Covers the primary clinical dataset and the drug-interaction
    /// database. Schema column names are already in standardized form.
    #[must_use]
    pub fn cohort() -> Self {
        let mut registry = Self::new();

        registry.insert(
            "clinical_data",
            DatasetDescriptor {
                source_path: PathBuf::from("data/Clinical Data_Discovery_Cohort.csv"),
                format: SourceFormat::Csv,
                output_path: PathBuf::from("data/clean/clean_clinical_data.csv"),
                columns: vec![
                    ColumnSpec::new("patient_id", ColumnType::String),
                    ColumnSpec::new("age", ColumnType::Integer),
                    ColumnSpec::new("gender", ColumnType::String),
                    ColumnSpec::new("blood_pressure_systolic", ColumnType::Integer),
                    ColumnSpec::new("blood_pressure_diastolic", ColumnType::Integer),
                    ColumnSpec::new("heart_rate_bpm", ColumnType::Float),
                    ColumnSpec::new("respiratory_rate_breaths_min", ColumnType::Float),
                    ColumnSpec::new("body_temperature_c", ColumnType::Float),
                    ColumnSpec::new("oxygen_saturation", ColumnType::Float),
                ],
                derive_age_groups: true,
            },
        );

        registry.insert(
            "drug_interactions",
            DatasetDescriptor {
                source_path: PathBuf::from("data/db_drug_interactions.csv"),
                format: SourceFormat::Csv,
                output_path: PathBuf::from("data/clean/clean_drug_interactions.csv"),
                columns: vec![
                    ColumnSpec::new("drug1_name", ColumnType::String),
                    ColumnSpec::new("drug2_name", ColumnType::String),
                    ColumnSpec::new("interaction_description", ColumnType::String),
                ],
                derive_age_groups: false,
            },
        );

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_unknown_key_is_a_configuration_error() {
        let registry = SchemaRegistry::cohort();
        match registry.descriptor("lab_results") {
            Err(Error::Configuration(message)) => assert!(message.contains("lab_results")),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_cohort_registry_contents() {
        let registry = SchemaRegistry::cohort();
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["clinical_data", "drug_interactions"]
        );

        let clinical = registry.descriptor("clinical_data").unwrap();
        assert!(clinical.derive_age_groups);
        assert_eq!(clinical.columns[1].name, "age");
        assert_eq!(clinical.columns[1].column_type, ColumnType::Integer);
    }

    #[test]
    fn test_registry_json_round_trip() {
        let registry = SchemaRegistry::cohort();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string_pretty(&registry).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = SchemaRegistry::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.len(), registry.len());
        let clinical = loaded.descriptor("clinical_data").unwrap();
        assert_eq!(clinical.format, SourceFormat::Csv);
        assert_eq!(clinical.columns.len(), 9);
    }
}
