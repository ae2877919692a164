//! Clinical analytics over cleaned tables.
//!
//! The engine is stateless: it operates solely on the tables it receives,
//! which keeps it predictable and testable independent of data sources.
//! The predictive classifier is an opaque capability injected at
//! construction, so nothing here depends on a concrete trained model.

use std::collections::HashMap;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::filter_record_batch;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::{Error, Result};

/// Feature columns consumed by the outcome model, in training order
pub const MODEL_FEATURES: [&str; 4] = [
    "age",
    "blood_pressure_systolic",
    "blood_pressure_diastolic",
    "heart_rate_bpm",
];

/// Keywords marking a high-severity interaction description
const HIGH_SEVERITY_KEYWORDS: [&str; 5] =
    ["contraindicated", "avoid", "dangerous", "severe", "major"];

/// Keywords marking a moderate-severity interaction description
const MODERATE_SEVERITY_KEYWORDS: [&str; 5] =
    ["increase", "enhance", "potentiate", "monitor", "caution"];

/// Opaque predictive classifier capability
///
/// Implementations receive the fixed feature vector described by
/// [`MODEL_FEATURES`] and report the predicted class plus the probability
/// of the high-risk class.
pub trait RiskModel {
    /// Predicted class for one feature vector (1 = high risk)
    fn predict(&self, features: &[f64]) -> Result<u8>;

    /// Probability of the high-risk class for one feature vector
    fn predict_probability(&self, features: &[f64]) -> Result<f64>;
}

/// Rule-based risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    /// Score 0
    Low,
    /// Score 1-2
    Moderate,
    /// Score 3 and above
    High,
}

/// Severity bucket for a drug-interaction description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// No escalating keywords present
    Minor,
    /// Monitoring or dose-adjustment language
    Moderate,
    /// Contraindication language
    High,
}

/// Outcome of the rule-based risk stratification for one patient
#[derive(Debug, Clone, Copy)]
pub struct RiskAssessment {
    /// Stratified level
    pub level: RiskLevel,
    /// Raw rule score
    pub score: f64,
}

/// Outcome of the model-based prediction for one patient
#[derive(Debug, Clone, Copy)]
pub struct RiskPrediction {
    /// Whether the model predicted the high-risk class
    pub high_risk: bool,
    /// Probability of the high-risk class, rounded to two decimals
    pub probability: f64,
}

/// Descriptive statistics for a cohort
#[derive(Debug, Clone, Default)]
pub struct CohortSummary {
    /// Number of rows in the cohort
    pub total_patients: usize,
    /// Mean age, one decimal
    pub average_age: f64,
    /// Gender value frequencies, normalized to sum to 1
    pub gender_distribution: HashMap<String, f64>,
    /// Mean systolic blood pressure, two decimals
    pub average_systolic_bp: f64,
}

/// Engine for clinical analytics over cleaned cohort tables
#[derive(Default)]
pub struct AnalyticsEngine {
    model: Option<Box<dyn RiskModel>>,
}

impl AnalyticsEngine {
    /// Create an engine without a prediction model
    ///
    /// Rule-based analytics work as usual; [`AnalyticsEngine::predict_outcome`]
    /// fails until a model is attached.
    #[must_use]
    pub fn new() -> Self {
        Self { model: None }
    }

    /// Create an engine backed by a prediction model
    #[must_use]
    pub fn with_model(model: Box<dyn RiskModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Whether a prediction model is loaded
    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Compute key descriptive statistics for a cohort
    pub fn summary_statistics(&self, batch: &RecordBatch) -> Result<CohortSummary> {
        if batch.num_rows() == 0 {
            return Ok(CohortSummary::default());
        }

        let ages = numeric_column(batch, "age")?;
        let systolic = numeric_column(batch, "blood_pressure_systolic")?;
        let genders = string_column(batch, "gender")?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0usize;
        for i in 0..genders.len() {
            if !genders.is_null(i) {
                *counts.entry(genders.value(i).to_string()).or_default() += 1;
                total += 1;
            }
        }
        let gender_distribution = counts
            .into_iter()
            .map(|(gender, count)| (gender, count as f64 / total.max(1) as f64))
            .collect();

        Ok(CohortSummary {
            total_patients: batch.num_rows(),
            average_age: round_to(mean(&ages).unwrap_or_default(), 1),
            gender_distribution,
            average_systolic_bp: round_to(mean(&systolic).unwrap_or_default(), 2),
        })
    }

    /// Stratify one patient's risk with the clinical rule set
    ///
    /// Age over 75 scores 2 (over 60 scores 1); systolic blood pressure
    /// over 160 scores 2 (over 140 scores 1). A total of 3 or more is High,
    /// 1 or more is Moderate, otherwise Low. Missing values contribute
    /// nothing.
    pub fn stratify_risk(&self, batch: &RecordBatch, row: usize) -> Result<RiskAssessment> {
        check_row(batch, row)?;

        let age = numeric_column(batch, "age")?[row];
        let systolic = numeric_column(batch, "blood_pressure_systolic")?[row];

        let mut score = 0.0;
        if let Some(age) = age {
            if age > 75.0 {
                score += 2.0;
            } else if age > 60.0 {
                score += 1.0;
            }
        }
        if let Some(systolic) = systolic {
            if systolic > 160.0 {
                score += 2.0;
            } else if systolic > 140.0 {
                score += 1.0;
            }
        }

        let level = if score >= 3.0 {
            RiskLevel::High
        } else if score >= 1.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };

        Ok(RiskAssessment { level, score })
    }

    /// Predict one patient's outcome with the attached model
    ///
    /// The feature vector follows [`MODEL_FEATURES`] order; a missing value
    /// is imputed with its column mean before prediction.
    pub fn predict_outcome(&self, batch: &RecordBatch, row: usize) -> Result<RiskPrediction> {
        let model = self
            .model
            .as_deref()
            .ok_or_else(|| Error::Model("no prediction model loaded".to_string()))?;
        check_row(batch, row)?;

        let mut features = Vec::with_capacity(MODEL_FEATURES.len());
        for name in MODEL_FEATURES {
            let values = numeric_column(batch, name)?;
            let value = values[row].or_else(|| mean(&values)).ok_or_else(|| {
                Error::Model(format!("feature '{name}' has no values to impute from"))
            })?;
            features.push(value);
        }

        let class = model.predict(&features)?;
        let probability = model.predict_probability(&features)?;

        Ok(RiskPrediction {
            high_risk: class == 1,
            probability: round_to(probability, 2),
        })
    }

    /// Filter the interaction table down to rows involving the given drugs
    ///
    /// A row matches when either drug name equals one of the selected drugs,
    /// case-insensitively.
    pub fn find_interactions(
        &self,
        drugs: &[&str],
        interactions: &RecordBatch,
    ) -> Result<RecordBatch> {
        let selected: Vec<String> = drugs
            .iter()
            .map(|drug| drug.trim().to_lowercase())
            .collect();

        let drug1 = string_column(interactions, "drug1_name")?;
        let drug2 = string_column(interactions, "drug2_name")?;

        let matches = |array: &StringArray, i: usize| {
            !array.is_null(i)
                && selected
                    .iter()
                    .any(|drug| array.value(i).to_lowercase() == *drug)
        };
        let mask: BooleanArray = (0..interactions.num_rows())
            .map(|i| Some(matches(drug1, i) || matches(drug2, i)))
            .collect();

        Ok(filter_record_batch(interactions, &mask)?)
    }
}

/// Classify an interaction description into a severity bucket
#[must_use]
pub fn classify_severity(description: &str) -> Severity {
    let text = description.to_lowercase();
    if HIGH_SEVERITY_KEYWORDS.iter().any(|k| text.contains(k)) {
        Severity::High
    } else if MODERATE_SEVERITY_KEYWORDS.iter().any(|k| text.contains(k)) {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}

fn check_row(batch: &RecordBatch, row: usize) -> Result<()> {
    if row >= batch.num_rows() {
        return Err(Error::Configuration(format!(
            "patient row {row} out of range for a cohort of {} rows",
            batch.num_rows()
        )));
    }
    Ok(())
}

/// Mean over the present values, `None` if every value is null
fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Read a numeric column as f64 values with nulls preserved
fn numeric_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let idx = batch
        .schema_ref()
        .index_of(name)
        .map_err(|_| Error::MissingColumn(name.to_string()))?;
    let column = &batch.columns()[idx];

    match column.data_type() {
        DataType::Int64 => {
            let ints = downcast::<Int64Array>(column, name)?;
            Ok((0..ints.len())
                .map(|i| (!ints.is_null(i)).then(|| ints.value(i) as f64))
                .collect())
        }
        DataType::Float64 => {
            let floats = downcast::<Float64Array>(column, name)?;
            Ok((0..floats.len())
                .map(|i| (!floats.is_null(i)).then(|| floats.value(i)))
                .collect())
        }
        other => Err(Error::Model(format!(
            "column '{name}' has non-numeric type {other}"
        ))),
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let idx = batch
        .schema_ref()
        .index_of(name)
        .map_err(|_| Error::MissingColumn(name.to_string()))?;
    downcast::<StringArray>(&batch.columns()[idx], name)
}

fn downcast<'a, T: 'static>(column: &'a ArrayRef, name: &str) -> Result<&'a T> {
    column
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Model(format!("column '{name}' has an unexpected array type")))
}
