//! Core data model types for mathscore.
//!
//! These are the types that flow through the whole pipeline: the feature
//! names the scoring model was trained on, the validated record, the
//! partially-filled form, and the prediction returned by the scorer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Number of features the scoring model consumes.
pub const FEATURE_COUNT: usize = 7;

/// Lowest accepted reading/writing score.
pub const SCORE_MIN: f64 = 0.0;

/// Highest accepted reading/writing score.
pub const SCORE_MAX: f64 = 100.0;

/// A single input feature of the scoring model.
///
/// Variants are declared in the order the model was trained on; [`Feature::ALL`]
/// is the canonical vector layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Gender,
    Lunch,
    TestPreparationCourse,
    ReadingScore,
    WritingScore,
    RaceEthnicityGroupE,
    ParentalEducationHighSchool,
}

impl Feature {
    /// All features in model order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Gender,
        Feature::Lunch,
        Feature::TestPreparationCourse,
        Feature::ReadingScore,
        Feature::WritingScore,
        Feature::RaceEthnicityGroupE,
        Feature::ParentalEducationHighSchool,
    ];

    /// Wire name of the field, as it appears in request bodies.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Gender => "gender",
            Feature::Lunch => "lunch",
            Feature::TestPreparationCourse => "test_preparation_course",
            Feature::ReadingScore => "reading_score",
            Feature::WritingScore => "writing_score",
            Feature::RaceEthnicityGroupE => "race_ethnicity_group_E",
            Feature::ParentalEducationHighSchool => "parental_level_of_education_high_school",
        }
    }

    /// Whether this feature is a 0–100 score rather than a 0/1 flag.
    pub fn is_score(self) -> bool {
        matches!(self, Feature::ReadingScore | Feature::WritingScore)
    }

    /// Position of this feature in the model vector.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown feature: {s}"))
    }
}

/// Field names required by the predict stage, in model order.
pub const PREDICT_REQUIRED: [&str; FEATURE_COUNT] = [
    "gender",
    "lunch",
    "test_preparation_course",
    "reading_score",
    "writing_score",
    "race_ethnicity_group_E",
    "parental_level_of_education_high_school",
];

/// Field names required by the scale stage, in the order they are checked.
pub const SCALE_REQUIRED: [&str; FEATURE_COUNT] = [
    "reading_score",
    "writing_score",
    "lunch",
    "race_ethnicity_group_E",
    "test_preparation_course",
    "gender",
    "parental_level_of_education_high_school",
];

/// One student's inputs, validated and ready for the scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub reading_score: f64,
    pub writing_score: f64,
    pub lunch: u8,
    #[serde(rename = "race_ethnicity_group_E")]
    pub race_ethnicity_group_e: u8,
    pub test_preparation_course: u8,
    pub gender: u8,
    pub parental_level_of_education_high_school: u8,
}

impl FeatureRecord {
    /// Value of a single feature as the model sees it.
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Gender => f64::from(self.gender),
            Feature::Lunch => f64::from(self.lunch),
            Feature::TestPreparationCourse => f64::from(self.test_preparation_course),
            Feature::ReadingScore => self.reading_score,
            Feature::WritingScore => self.writing_score,
            Feature::RaceEthnicityGroupE => f64::from(self.race_ethnicity_group_e),
            Feature::ParentalEducationHighSchool => {
                f64::from(self.parental_level_of_education_high_school)
            }
        }
    }
}

/// Form state that may still be incomplete.
///
/// Each field is `None` until the user fills it in. Converting into a
/// [`FeatureRecord`] runs the same checks the predict stage does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writing_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunch: Option<f64>,
    #[serde(
        default,
        rename = "race_ethnicity_group_E",
        skip_serializing_if = "Option::is_none"
    )]
    pub race_ethnicity_group_e: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_preparation_course: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parental_level_of_education_high_school: Option<f64>,
}

impl FormDraft {
    /// A fresh form as first shown: standard lunch, every other flag off, and
    /// both scores still to be entered.
    pub fn with_form_defaults() -> Self {
        Self {
            reading_score: None,
            writing_score: None,
            lunch: Some(1.0),
            race_ethnicity_group_e: Some(0.0),
            test_preparation_course: Some(0.0),
            gender: Some(0.0),
            parental_level_of_education_high_school: Some(0.0),
        }
    }

    /// Filled-in value of a feature.
    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Gender => self.gender,
            Feature::Lunch => self.lunch,
            Feature::TestPreparationCourse => self.test_preparation_course,
            Feature::ReadingScore => self.reading_score,
            Feature::WritingScore => self.writing_score,
            Feature::RaceEthnicityGroupE => self.race_ethnicity_group_e,
            Feature::ParentalEducationHighSchool => self.parental_level_of_education_high_school,
        }
    }

    /// Reject NaN and infinite values, which JSON cannot carry.
    pub fn check_finite(&self) -> Result<(), ValidationError> {
        for feature in Feature::ALL {
            if let Some(value) = self.get(feature).filter(|v| !v.is_finite()) {
                crate::validation::check_feature(feature, value)?;
            }
        }
        Ok(())
    }

    /// Check the draft is ready to submit: every value finite, none missing.
    pub fn ensure_ready(&self) -> Result<(), ValidationError> {
        self.check_finite()?;
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    /// Serialize the filled-in fields as a JSON object.
    pub fn to_payload(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Names of the fields still missing, in model order.
    pub fn missing_fields(&self) -> Vec<String> {
        crate::validation::missing_fields(&self.to_payload(), &PREDICT_REQUIRED)
    }

    /// Whether every field has been filled in.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validate the draft into a record ready for prediction.
    pub fn into_record(self) -> Result<FeatureRecord, ValidationError> {
        self.check_finite()?;
        FeatureRecord::from_payload(&self.to_payload())
    }
}

/// Output of the external scoring procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted math score.
    pub math_score: f64,
    /// Model confidence, when the scorer reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Free-form model metadata (type, feature count, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<serde_json::Value>,
}

impl PredictionResult {
    pub fn new(math_score: f64) -> Self {
        Self {
            math_score,
            confidence: None,
            model_info: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
