//! Presence and shape checks for form payloads.
//!
//! The same helpers run at both pipeline stages with different required-field
//! lists. `null` is treated the same as an absent key.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Feature, FeatureRecord, PREDICT_REQUIRED, SCORE_MAX, SCORE_MIN};

/// A request payload rejected before reaching the scoring model.
///
/// The display strings are the messages sent back to clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// First missing field of a stage that stops at the first gap.
    #[error("Variable faltante: {0}")]
    MissingField(String),

    /// Every missing field, in required-list order.
    #[error("Variables faltantes: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// The value is present but not a number.
    #[error("Valor no numérico para {field}")]
    NotNumeric { field: String },

    /// A 0/1 flag carries some other value.
    #[error("Valor inválido para {field}: se esperaba 0 o 1")]
    NotBinary { field: String, value: f64 },

    /// A score outside [0, 100].
    #[error("Valor fuera de rango para {field}: {value} (0-100)")]
    OutOfRange { field: String, value: f64 },

    /// The request body is not a JSON object.
    #[error("Cuerpo de solicitud inválido")]
    MalformedBody,

    /// The scale procedure refused the payload with its own message.
    #[error("{0}")]
    Rejected(String),
}

impl ValidationError {
    /// Field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(f)
            | ValidationError::NotNumeric { field: f }
            | ValidationError::NotBinary { field: f, .. }
            | ValidationError::OutOfRange { field: f, .. } => Some(f),
            ValidationError::MissingFields(fields) => fields.first().map(String::as_str),
            ValidationError::MalformedBody | ValidationError::Rejected(_) => None,
        }
    }
}

fn is_missing(payload: &Map<String, Value>, name: &str) -> bool {
    matches!(payload.get(name), None | Some(Value::Null))
}

/// Check that every required field is present, stopping at the first gap.
pub fn require_fields(payload: &Map<String, Value>, required: &[&str]) -> Result<(), ValidationError> {
    match required.iter().find(|name| is_missing(payload, name)) {
        Some(name) => Err(ValidationError::MissingField((*name).to_string())),
        None => Ok(()),
    }
}

/// List every missing required field, in required-list order.
pub fn missing_fields(payload: &Map<String, Value>, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| is_missing(payload, name))
        .map(|name| (*name).to_string())
        .collect()
}

/// Check that every required field is present, reporting all gaps at once.
pub fn require_all(payload: &Map<String, Value>, required: &[&str]) -> Result<(), ValidationError> {
    let missing = missing_fields(payload, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// Check a reading/writing score. Both bounds are inclusive.
pub fn check_score(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

/// Check a 0/1 flag. Accepts `1.0` as well as `1`.
pub fn check_binary(field: &str, value: f64) -> Result<u8, ValidationError> {
    if value == 0.0 {
        Ok(0)
    } else if value == 1.0 {
        Ok(1)
    } else {
        Err(ValidationError::NotBinary {
            field: field.to_string(),
            value,
        })
    }
}

/// Check a single feature value against its domain.
pub fn check_feature(feature: Feature, value: f64) -> Result<f64, ValidationError> {
    if feature.is_score() {
        check_score(feature.name(), value)
    } else {
        check_binary(feature.name(), value).map(f64::from)
    }
}

fn numeric(payload: &Map<String, Value>, feature: Feature) -> Result<f64, ValidationError> {
    payload
        .get(feature.name())
        .and_then(Value::as_f64)
        .ok_or_else(|| ValidationError::NotNumeric {
            field: feature.name().to_string(),
        })
}

impl FeatureRecord {
    /// Build a record from a predict-stage payload.
    ///
    /// Reports every missing field first, then the first value whose type or
    /// domain is wrong, in model order.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ValidationError> {
        require_all(payload, &PREDICT_REQUIRED)?;

        let score = |f: Feature| numeric(payload, f).and_then(|v| check_score(f.name(), v));
        let flag = |f: Feature| numeric(payload, f).and_then(|v| check_binary(f.name(), v));

        Ok(Self {
            gender: flag(Feature::Gender)?,
            lunch: flag(Feature::Lunch)?,
            test_preparation_course: flag(Feature::TestPreparationCourse)?,
            reading_score: score(Feature::ReadingScore)?,
            writing_score: score(Feature::WritingScore)?,
            race_ethnicity_group_e: flag(Feature::RaceEthnicityGroupE)?,
            parental_level_of_education_high_school: flag(Feature::ParentalEducationHighSchool)?,
        })
    }
}
