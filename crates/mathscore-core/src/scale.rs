//! In-process scale stage.
//!
//! The model was trained on unscaled values, so "scaling" here means coercing
//! each field to a float and checking its domain. The response echoes the
//! input with the fields normalized and two marker keys added.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ScaleError;
use crate::model::{Feature, PREDICT_REQUIRED, SCALE_REQUIRED};
use crate::traits::Scaler;
use crate::validation::{check_feature, require_fields, ValidationError};

/// Key listing the fields that were normalized, in model order.
pub const VALIDATED_FIELDS_KEY: &str = "_variables_validadas";

/// Key flagging that the payload went through the scale stage.
pub const VALIDATED_FLAG_KEY: &str = "_validado";

/// Scale stage implemented without an external process.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinScaler;

/// Coerce a JSON value to a float the way a form field is read: numbers as-is,
/// numeric strings parsed, anything else rejected.
fn coerce(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let not_numeric = || ValidationError::NotNumeric {
        field: field.to_string(),
    };
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(not_numeric),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| not_numeric()),
        _ => Err(not_numeric()),
    }
}

/// Normalize a payload synchronously.
pub fn normalize(mut payload: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
    require_fields(&payload, &SCALE_REQUIRED)?;

    for feature in Feature::ALL {
        let name = feature.name();
        let raw = payload.get(name).ok_or_else(|| ValidationError::MissingField(name.into()))?;
        let value = check_feature(feature, coerce(name, raw)?)?;
        payload.insert(name.to_string(), Value::from(value));
    }

    payload.insert(
        VALIDATED_FIELDS_KEY.to_string(),
        Value::from(PREDICT_REQUIRED.to_vec()),
    );
    payload.insert(VALIDATED_FLAG_KEY.to_string(), Value::Bool(true));
    Ok(payload)
}

#[async_trait]
impl Scaler for BuiltinScaler {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn scale(&self, payload: Map<String, Value>) -> Result<Map<String, Value>, ScaleError> {
        Ok(normalize(payload)?)
    }
}
