//! Request schema, prediction result and health payloads.
//!
//! Validation runs before any model code and reports every violating field,
//! not just the first one. Values are not range-checked: a negative
//! population is passed through to the model as-is.

use serde::Serialize;
use serde_json::Value;

use crate::common::error::{FieldError, ValidationErrors};
use crate::data::domain::{FeatureRow, FeatureVector, FEATURE_NAMES, N_FEATURES};

/// Unit of every predicted price.
pub const CURRENCY_UNIT: &str = "100k USD";

/// Response body of a successful prediction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub currency_unit: &'static str,
}

impl PredictionResult {
    pub fn new(predicted_price: f64) -> Self {
        Self {
            predicted_price,
            currency_unit: CURRENCY_UNIT,
        }
    }
}

/// Response body of a passing health check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            model_loaded: true,
        }
    }
}

/// Coerce one JSON value to a finite f64.
///
/// Numbers pass, numeric strings are parsed; everything else is rejected.
fn coerce_float(field: &str, value: &Value) -> Result<f64, FieldError> {
    let loc = ["body", field];
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FieldError::new(&loc, "Input should be a finite number", "finite_number")),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) => Err(FieldError::new(&loc, "Input should be a finite number", "finite_number")),
            Err(_) => Err(FieldError::new(
                &loc,
                "Input should be a valid number, unable to parse string as a number",
                "float_parsing",
            )),
        },
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(FieldError::new(&loc, "Input should be a valid number", "float_type"))
        }
    }
}

/// Check a raw request body against the [`FeatureVector`] schema.
///
/// Unknown keys are ignored.
pub fn validate_features(raw: &Value) -> Result<FeatureVector, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let Some(obj) = raw.as_object() else {
        errors.push(FieldError::new(
            &["body"],
            "Input should be a valid dictionary or object to extract fields from",
            "model_attributes_type",
        ));
        return Err(errors);
    };

    let mut row: FeatureRow = [0.0; N_FEATURES];
    for (slot, &name) in FEATURE_NAMES.iter().enumerate() {
        match obj.get(name) {
            None => errors.push(FieldError::new(&["body", name], "Field required", "missing")),
            Some(value) => match coerce_float(name, value) {
                Ok(v) => row[slot] = v,
                Err(err) => errors.push(err),
            },
        }
    }

    if errors.is_empty() {
        Ok(FeatureVector::from_row(row))
    } else {
        Err(errors)
    }
}

/// Parse a request body, turning a JSON syntax error into a validation error.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ValidationErrors> {
    serde_json::from_slice(bytes).map_err(|err| {
        ValidationErrors(vec![FieldError::new(
            &["body"],
            format!("JSON decode error: {err}"),
            "json_invalid",
        )])
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid() -> Value {
        json!({
            "MedInc": 3.5, "HouseAge": 30.0, "AveRooms": 5.0, "AveBedrms": 1.1,
            "Population": 1500.0, "AveOccup": 3.0, "Latitude": 34.0, "Longitude": -118.0
        })
    }

    #[test]
    fn accepts_the_documented_example() {
        let v = validate_features(&valid()).unwrap();
        assert_eq!(v, FeatureVector::example());
    }

    #[test]
    fn integers_and_numeric_strings_coerce() {
        let mut body = valid();
        body["HouseAge"] = json!(30);
        body["Population"] = json!("1500");
        let v = validate_features(&body).unwrap();
        assert_eq!(v.house_age, 30.0);
        assert_eq!(v.population, 1500.0);
    }

    #[test]
    fn missing_longitude_is_named() {
        let mut body = valid();
        body.as_object_mut().unwrap().remove("Longitude");
        let errs = validate_features(&body).unwrap_err();
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["Longitude"]);
        assert_eq!(errs.0[0].kind, "missing");
        assert_eq!(errs.0[0].loc, vec!["body", "Longitude"]);
    }

    #[test]
    fn every_violation_is_reported_in_schema_order() {
        let body = json!({
            "MedInc": "lots", "HouseAge": null, "AveRooms": true, "AveBedrms": [1.0],
            "Population": 1500.0, "AveOccup": 3.0, "Latitude": 34.0
        });
        let errs = validate_features(&body).unwrap_err();
        assert_eq!(
            errs.fields().collect::<Vec<_>>(),
            vec!["MedInc", "HouseAge", "AveRooms", "AveBedrms", "Longitude"]
        );
        assert_eq!(errs.0[0].kind, "float_parsing");
        assert_eq!(errs.0[1].kind, "float_type");
    }

    #[test]
    fn out_of_domain_values_pass_through() {
        let mut body = valid();
        body["Population"] = json!(-500.0);
        body["AveOccup"] = json!(-1.0);
        let v = validate_features(&body).unwrap();
        assert_eq!(v.population, -500.0);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        let mut body = valid();
        body["MedInc"] = json!("NaN");
        let errs = validate_features(&body).unwrap_err();
        assert_eq!(errs.0[0].kind, "finite_number");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut body = valid();
        body["OceanProximity"] = json!("NEAR BAY");
        assert!(validate_features(&body).is_ok());
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errs = validate_features(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errs.0.len(), 1);
        assert_eq!(errs.0[0].loc, vec!["body"]);
    }

    #[test]
    fn broken_json_is_a_validation_error() {
        let errs = parse_body(b"{\"MedInc\": ").unwrap_err();
        assert_eq!(errs.0[0].kind, "json_invalid");
    }

    #[test]
    fn prediction_carries_the_unit() {
        let json = serde_json::to_value(PredictionResult::new(2.25)).unwrap();
        assert_eq!(json, json!({"predicted_price": 2.25, "currency_unit": "100k USD"}));
    }
}
