//! OpenAPI document and the interactive documentation page served at `/docs`.

use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

use crate::data::domain::{FeatureVector, FEATURE_NAMES};
use crate::inference::domain::CURRENCY_UNIT;

pub const TITLE: &str = "PropVal AI API";

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>PropVal AI API - Swagger UI</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
</script>
</body>
</html>
"##;

fn detail_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "detail": {} },
        "required": ["detail"]
    })
}

/// OpenAPI 3 description of the public endpoints.
pub fn openapi_document() -> Value {
    let properties: serde_json::Map<String, Value> = FEATURE_NAMES
        .iter()
        .map(|name| (name.to_string(), json!({ "type": "number", "title": name })))
        .collect();

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": TITLE,
            "description": "House price prediction using a random forest regressor",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/health": {
                "get": {
                    "summary": "Health check",
                    "responses": {
                        "200": { "description": "Model loaded" },
                        "503": { "description": "Model not loaded",
                                 "content": { "application/json": { "schema": detail_schema() } } }
                    }
                }
            },
            "/predict": {
                "post": {
                    "summary": "Predict price",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/HousingFeatures" }
                        } }
                    },
                    "responses": {
                        "200": { "description": format!("Predicted price in {CURRENCY_UNIT}"),
                                 "content": { "application/json": {
                                     "schema": { "$ref": "#/components/schemas/Prediction" }
                                 } } },
                        "422": { "description": "Validation error",
                                 "content": { "application/json": { "schema": detail_schema() } } },
                        "500": { "description": "Model unavailable or prediction failed",
                                 "content": { "application/json": { "schema": detail_schema() } } }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "HousingFeatures": {
                    "type": "object",
                    "properties": properties,
                    "required": FEATURE_NAMES,
                    "example": FeatureVector::example(),
                },
                "Prediction": {
                    "type": "object",
                    "properties": {
                        "predicted_price": { "type": "number" },
                        "currency_unit": { "type": "string", "const": CURRENCY_UNIT }
                    },
                    "required": ["predicted_price", "currency_unit"]
                }
            }
        }
    })
}

pub async fn openapi() -> Json<Value> {
    Json(openapi_document())
}

pub async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_every_feature_as_required() {
        let doc = openapi_document();
        let schema = &doc["components"]["schemas"]["HousingFeatures"];
        for name in FEATURE_NAMES {
            assert_eq!(schema["properties"][name]["type"], "number");
        }
        assert_eq!(schema["required"].as_array().unwrap().len(), FEATURE_NAMES.len());
        assert_eq!(schema["example"]["Longitude"], -118.0);
    }

    #[test]
    fn swagger_page_points_at_the_document() {
        assert!(SWAGGER_UI.contains(r#"url: "/openapi.json""#));
        assert!(SWAGGER_UI.contains(r##"dom_id: "#swagger-ui""##));
        assert!(SWAGGER_UI.trim_end().ends_with("</html>"));
    }
}
