//! Content validation
//!
//! The store treats content as opaque bytes. Before a create or update is
//! considered at all, the content passes a structural check; failures are
//! reported as `422`.

use serde_json::Value;

use super::errors::{StoreError, StoreOpResult};

/// Structural check applied to content before any write
pub trait ContentValidator: Send + Sync {
    fn validate(&self, content: &[u8]) -> StoreOpResult<()>;
}

/// Accepts content that parses as a JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonObjectValidator;

impl ContentValidator for JsonObjectValidator {
    fn validate(&self, content: &[u8]) -> StoreOpResult<()> {
        match serde_json::from_slice::<Value>(content) {
            Ok(Value::Object(_)) => Ok(()),
            Ok(other) => Err(StoreError::Validation(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(StoreError::Validation(format!("invalid JSON: {}", e))),
        }
    }
}

/// Accepts anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueValidator;

impl ContentValidator for OpaqueValidator {
    fn validate(&self, _content: &[u8]) -> StoreOpResult<()> {
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object_validator() {
        let v = JsonObjectValidator;
        assert!(v.validate(br#"{"a":1}"#).is_ok());
        assert!(v.validate(b"{}").is_ok());

        let err = v.validate(b"[1,2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(matches!(v.validate(b"{oops"), Err(StoreError::Validation(_))));
        assert!(v.validate(b"").is_err());
    }

    #[test]
    fn test_opaque_validator() {
        assert!(OpaqueValidator.validate(b"\x00\xff").is_ok());
    }
}
