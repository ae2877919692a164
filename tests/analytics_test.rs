use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cohort_etl::analytics::{
    AnalyticsEngine, RiskLevel, RiskModel, Severity, classify_severity,
};
use cohort_etl::{Error, Result};

/// Fixed-answer model; a stub is all the engine contract needs
struct StubModel {
    class: u8,
    probability: f64,
}

impl RiskModel for StubModel {
    fn predict(&self, _features: &[f64]) -> Result<u8> {
        Ok(self.class)
    }

    fn predict_probability(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.probability)
    }
}

fn cohort_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("patient_id", DataType::Utf8, true),
        Field::new("age", DataType::Int64, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("blood_pressure_systolic", DataType::Int64, true),
        Field::new("blood_pressure_diastolic", DataType::Int64, true),
        Field::new("heart_rate_bpm", DataType::Float64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["P001", "P002", "P003"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![80, 65, 30])) as ArrayRef,
            Arc::new(StringArray::from(vec!["F", "M", "F"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![170, 145, 120])) as ArrayRef,
            Arc::new(Int64Array::from(vec![95, 88, 80])) as ArrayRef,
            Arc::new(Float64Array::from(vec![Some(78.0), None, Some(66.0)])) as ArrayRef,
        ],
    )
    .unwrap()
}

#[test]
fn test_rule_based_stratification() {
    let engine = AnalyticsEngine::new();
    let batch = cohort_batch();

    let high = engine.stratify_risk(&batch, 0).unwrap();
    assert_eq!(high.level, RiskLevel::High);
    assert!((high.score - 4.0).abs() < f64::EPSILON);

    let moderate = engine.stratify_risk(&batch, 1).unwrap();
    assert_eq!(moderate.level, RiskLevel::Moderate);
    assert!((moderate.score - 2.0).abs() < f64::EPSILON);

    let low = engine.stratify_risk(&batch, 2).unwrap();
    assert_eq!(low.level, RiskLevel::Low);
    assert!((low.score - 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_prediction_through_a_stub_model() {
    let engine = AnalyticsEngine::with_model(Box::new(StubModel {
        class: 1,
        probability: 0.873,
    }));
    let batch = cohort_batch();

    // Row 1 has a null heart rate; the engine imputes the column mean
    // rather than refusing to predict
    let prediction = engine.predict_outcome(&batch, 1).unwrap();
    assert!(prediction.high_risk);
    assert!((prediction.probability - 0.87).abs() < f64::EPSILON);
}

#[test]
fn test_prediction_without_a_model_fails() {
    let engine = AnalyticsEngine::new();
    let batch = cohort_batch();

    assert!(matches!(
        engine.predict_outcome(&batch, 0),
        Err(Error::Model(_))
    ));
}

#[test]
fn test_summary_statistics() {
    let engine = AnalyticsEngine::new();
    let summary = engine.summary_statistics(&cohort_batch()).unwrap();

    assert_eq!(summary.total_patients, 3);
    assert!((summary.average_age - 58.3).abs() < f64::EPSILON);
    assert!((summary.average_systolic_bp - 145.0).abs() < f64::EPSILON);
    assert!((summary.gender_distribution["F"] - 2.0 / 3.0).abs() < 1e-9);
    assert!((summary.gender_distribution["M"] - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_summary_statistics_on_an_empty_cohort() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("age", DataType::Int64, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("blood_pressure_systolic", DataType::Int64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(Vec::<i64>::new())) as ArrayRef,
            Arc::new(StringArray::from(Vec::<&str>::new())) as ArrayRef,
            Arc::new(Int64Array::from(Vec::<i64>::new())) as ArrayRef,
        ],
    )
    .unwrap();

    let engine = AnalyticsEngine::new();
    let summary = engine.summary_statistics(&batch).unwrap();
    assert_eq!(summary.total_patients, 0);
    assert!(summary.gender_distribution.is_empty());
}

fn interactions_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("drug1_name", DataType::Utf8, true),
        Field::new("drug2_name", DataType::Utf8, true),
        Field::new("interaction_description", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["Aspirin", "Ibuprofen", "Metformin"])) as ArrayRef,
            Arc::new(StringArray::from(vec!["Warfarin", "Naproxen", "Insulin"])) as ArrayRef,
            Arc::new(StringArray::from(vec![
                "Severe bleeding risk, avoid combination",
                "May increase gastrointestinal irritation; monitor",
                "Additive glucose-lowering effect",
            ])) as ArrayRef,
        ],
    )
    .unwrap()
}

#[test]
fn test_interaction_lookup_is_case_insensitive() {
    let engine = AnalyticsEngine::new();
    let interactions = interactions_batch();

    let hits = engine
        .find_interactions(&["aspirin", "INSULIN"], &interactions)
        .unwrap();
    assert_eq!(hits.num_rows(), 2);

    let drug1 = hits
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(drug1.value(0), "Aspirin");
    assert_eq!(drug1.value(1), "Metformin");
}

#[test]
fn test_no_selected_drugs_means_no_hits() {
    let engine = AnalyticsEngine::new();
    let hits = engine.find_interactions(&[], &interactions_batch()).unwrap();
    assert_eq!(hits.num_rows(), 0);
}

#[test]
fn test_severity_classification() {
    assert_eq!(
        classify_severity("Contraindicated: severe bleeding risk"),
        Severity::High
    );
    assert_eq!(
        classify_severity("Monitor renal function closely"),
        Severity::Moderate
    );
    assert_eq!(
        classify_severity("Slight change in absorption"),
        Severity::Minor
    );
}
