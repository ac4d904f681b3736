//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies, query strings, and path ids in handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use netnode_core::{FieldErrors, NodeId, ProductId};

use crate::error::AppError;

/// Request types that turn into a validated domain value.
///
/// Validation consumes the DTO and reports every failing field at once.
pub trait Validate {
    /// The validated value.
    type Valid;

    fn validate(self) -> Result<Self::Valid, FieldErrors>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    let value = extract_json(result)?;
    Ok(value.validate()?)
}

/// Extract a JSON body that must be an object, keeping the raw map so
/// handlers can inspect which keys were sent.
pub fn extract_json_object(
    result: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<serde_json::Map<String, serde_json::Value>, AppError> {
    match extract_json(result)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(
            "expected a JSON object as the request body".into(),
        )),
    }
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a node id from a path segment. Anything that is not a UUID cannot
/// name a node, so it is reported as not found.
pub fn parse_node_id(raw: &str) -> Result<NodeId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("network node {raw} not found")))
}

/// Parse a product id from a path segment.
pub fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("product {raw} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_path_id_is_not_found() {
        assert!(matches!(parse_node_id("42"), Err(AppError::NotFound(_))));
        assert!(matches!(
            parse_product_id("not-a-uuid"),
            Err(AppError::NotFound(_))
        ));
        let id = NodeId::new();
        assert_eq!(parse_node_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn non_object_body_rejected() {
        let result = extract_json_object(Ok(Json(serde_json::json!([1, 2]))));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        let map = extract_json_object(Ok(Json(serde_json::json!({"name": "x"})))).unwrap();
        assert!(map.contains_key("name"));
    }
}
