//! Free-text cleaning, medical-entity extraction, and sentiment heuristics.
//!
//! These are pattern-matching helpers for transcription and review text;
//! no statistical NLP is involved.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use regex::Regex;

use crate::error::{Error, Result};

/// Keywords counted toward a positive sentiment
const POSITIVE_WORDS: [&str; 10] = [
    "good", "great", "excellent", "effective", "helpful", "better", "improved", "works",
    "amazing", "perfect",
];

/// Keywords counted toward a negative sentiment
const NEGATIVE_WORDS: [&str; 10] = [
    "bad",
    "terrible",
    "awful",
    "ineffective",
    "worse",
    "side effects",
    "problems",
    "disappointed",
    "useless",
    "horrible",
];

/// Entity categories and their match patterns
const ENTITY_PATTERNS: [(&str, &str); 6] = [
    (
        "medications",
        r"\b(mg|mcg|ml|tablet|capsule|injection|dose|medication|drug|pill|aspirin|metformin|lisinopril|atorvastatin|amlodipine|omeprazole|levothyroxine|albuterol|insulin|warfarin|prednisone|ibuprofen|acetaminophen|hydrocodone|sertraline|tramadol)\b",
    ),
    (
        "symptoms",
        r"\b(pain|fever|nausea|headache|fatigue|dizzy|dizziness|anxiety|depression|insomnia|cough|shortness of breath|chest pain|abdominal pain|back pain|joint pain|muscle pain|sore throat|runny nose|congestion|weakness|numbness|tingling|swelling|rash|itching)\b",
    ),
    (
        "procedures",
        r"\b(surgery|operation|procedure|therapy|treatment|examination|test|biopsy|x-ray|ct scan|mri|ultrasound|blood test|lab work|ekg|echocardiogram|colonoscopy|endoscopy|mammogram|vaccination|injection|infusion|dialysis)\b",
    ),
    (
        "body_parts",
        r"\b(heart|lung|liver|kidney|brain|stomach|blood|chest|abdomen|head|neck|throat|arm|leg|hand|foot|back|spine|knee|shoulder|hip|ankle|wrist|elbow|eye|ear|nose|mouth|skin|muscle|bone|joint)\b",
    ),
    (
        "conditions",
        r"\b(diabetes|hypertension|asthma|copd|arthritis|depression|anxiety|cancer|tumor|infection|pneumonia|bronchitis|migraine|seizure|stroke|heart attack|heart disease|kidney disease|liver disease|anemia|obesity)\b",
    ),
    (
        "vital_signs",
        r"\b(blood pressure|bp|heart rate|pulse|temperature|temp|oxygen saturation|weight|height|bmi|respiratory rate)\b",
    ),
];

/// Sentiment bucket for a piece of review text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    /// More positive than negative keywords
    Positive,
    /// More negative than positive keywords
    Negative,
    /// Keyword counts tied (including none at all)
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
            Sentiment::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Clean and normalize a piece of free text
///
/// Lower-cases, drops HTML entities (`&amp;`, `&#39;`), maps punctuation to
/// spaces, and collapses whitespace runs.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();

    // Drop HTML entities entirely so "x&amp;y" collapses to "xy"
    let mut stripped = String::with_capacity(lowered.len());
    let mut rest = lowered.as_str();
    while let Some(pos) = rest.find('&') {
        stripped.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let body_end = tail[1..].find(';').filter(|&end| {
            end >= 1
                && end <= 8
                && tail[1..=end]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '#')
        });
        match body_end {
            Some(end) => rest = &tail[end + 2..],
            None => {
                stripped.push('&');
                rest = &tail[1..];
            }
        }
    }
    stripped.push_str(rest);

    stripped
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .join(" ")
}

/// Classify review text by positive/negative keyword counts
#[must_use]
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| text.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| text.contains(*w)).count();

    match positive.cmp(&negative) {
        Ordering::Greater => Sentiment::Positive,
        Ordering::Less => Sentiment::Negative,
        Ordering::Equal => Sentiment::Neutral,
    }
}

/// Regex-based extractor for medical entities in free text
pub struct EntityExtractor {
    patterns: Vec<(&'static str, Regex)>,
}

impl EntityExtractor {
    /// Compile the category patterns
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(ENTITY_PATTERNS.len());
        for (category, pattern) in ENTITY_PATTERNS {
            let regex = Regex::new(pattern).map_err(|e| {
                Error::Configuration(format!("invalid entity pattern for '{category}': {e}"))
            })?;
            patterns.push((category, regex));
        }
        Ok(Self { patterns })
    }

    /// Extract unique entity matches per category
    ///
    /// Matching is case-insensitive; each category's matches come back
    /// sorted and deduplicated.
    #[must_use]
    pub fn extract(&self, text: &str) -> BTreeMap<&'static str, Vec<String>> {
        let text = text.to_lowercase();
        self.patterns
            .iter()
            .map(|(category, regex)| {
                let matches: Vec<String> = regex
                    .find_iter(&text)
                    .map(|m| m.as_str().to_string())
                    .sorted()
                    .dedup()
                    .collect();
                (*category, matches)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Chest   PAIN!! "), "chest pain");
        assert_eq!(clean_text("x&amp;y"), "xy");
        assert_eq!(clean_text("Tom & Jerry"), "tom jerry");
        assert_eq!(clean_text("BP: 120/80 (stable)"), "bp 120 80 stable");
    }

    #[test]
    fn test_sentiment() {
        assert_eq!(
            analyze_sentiment("Great drug, really helpful and effective"),
            Sentiment::Positive
        );
        assert_eq!(
            analyze_sentiment("terrible side effects, worse than before"),
            Sentiment::Negative
        );
        assert_eq!(analyze_sentiment("took one dose daily"), Sentiment::Neutral);
        assert_eq!(
            analyze_sentiment("works great but awful side effects"),
            Sentiment::Neutral
        );
    }

    #[test]
    fn test_entity_extraction() {
        let extractor = EntityExtractor::new().unwrap();
        let entities =
            extractor.extract("Patient reports chest pain and fever; started Aspirin 81 mg.");

        assert_eq!(entities["symptoms"], vec!["chest pain", "fever"]);
        assert_eq!(entities["medications"], vec!["aspirin", "mg"]);
        assert_eq!(entities["body_parts"], vec!["chest"]);
        assert!(entities["procedures"].is_empty());
    }
}
