//! Feature transform: validated record to model input vector and back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Feature, FeatureRecord, FEATURE_COUNT};
use crate::validation::{check_binary, check_score, ValidationError};

/// The ordered numeric input of the scoring model.
///
/// Serializes as a plain 7-element JSON array, which is what the external
/// scoring procedure receives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Lay a record out in model order.
    pub fn from_record(record: &FeatureRecord) -> Self {
        Self(Feature::ALL.map(|f| record.get(f)))
    }

    /// Wrap raw values that are already in model order.
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rebuild the record this vector was made from.
    pub fn to_record(&self) -> Result<FeatureRecord, ValidationError> {
        let flag = |f: Feature| check_binary(f.name(), self.get(f));
        let score = |f: Feature| check_score(f.name(), self.get(f));

        Ok(FeatureRecord {
            gender: flag(Feature::Gender)?,
            lunch: flag(Feature::Lunch)?,
            test_preparation_course: flag(Feature::TestPreparationCourse)?,
            reading_score: score(Feature::ReadingScore)?,
            writing_score: score(Feature::WritingScore)?,
            race_ethnicity_group_e: flag(Feature::RaceEthnicityGroupE)?,
            parental_level_of_education_high_school: flag(Feature::ParentalEducationHighSchool)?,
        })
    }

    /// Name each value with its wire field name.
    pub fn to_named(&self) -> Map<String, Value> {
        Feature::ALL
            .into_iter()
            .map(|f| (f.name().to_string(), Value::from(self.get(f))))
            .collect()
    }

    /// The JSON argument passed to the scoring procedure.
    pub fn to_json(&self) -> String {
        // An array of finite f64 always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl From<&FeatureRecord> for FeatureVector {
    fn from(record: &FeatureRecord) -> Self {
        Self::from_record(record)
    }
}
