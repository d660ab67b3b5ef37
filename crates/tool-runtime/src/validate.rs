//! Argument validation against an `InputSchema`.
//!
//! Pure and synchronous. Explicit `null` is treated the same as an absent
//! argument, so a required parameter set to `null` is reported as missing.

use serde_json::{Map, Value};

use crate::schema::{json_type_name, InputSchema, ParamType};

/// Arguments that passed validation, restricted to declared parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedArguments(Map<String, Value>);

impl ValidatedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required parameter '{0}'")]
    MissingRequiredParameter(String),

    #[error("Parameter '{parameter}' must be of type {expected}, got {found}")]
    TypeMismatch {
        parameter: String,
        expected: ParamType,
        found: &'static str,
    },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Invalid arguments: {0}")]
    Malformed(String),
}

/// Check `arguments` against `schema`.
///
/// Parameters are checked in declaration order and the first violation is
/// returned. Undeclared arguments are dropped unless the schema denies them.
pub fn validate(
    schema: &InputSchema,
    arguments: &Map<String, Value>,
) -> Result<ValidatedArguments, ValidationError> {
    if !schema.allows_unknown() {
        if let Some(unknown) = arguments.keys().find(|k| schema.get(k).is_none()) {
            return Err(ValidationError::UnknownParameter(unknown.clone()));
        }
    }

    let mut validated = Map::new();
    for param in schema.params() {
        match arguments.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ValidationError::MissingRequiredParameter(param.name.clone()));
                }
            }
            Some(value) if !param.ty.matches(value) => {
                return Err(ValidationError::TypeMismatch {
                    parameter: param.name.clone(),
                    expected: param.ty,
                    found: json_type_name(value),
                });
            }
            Some(value) => {
                validated.insert(param.name.clone(), value.clone());
            }
        }
    }

    Ok(ValidatedArguments(validated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;
    use serde_json::json;

    fn schema() -> InputSchema {
        InputSchema::new()
            .param(ParamSpec::new("command", ParamType::String, true))
            .param(ParamSpec::new("verbose", ParamType::Boolean, false))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_arguments() {
        let validated = validate(&schema(), &args(json!({"command": "#devices", "verbose": true}))).unwrap();
        assert_eq!(validated.get("command"), Some(&json!("#devices")));
        assert_eq!(validated.get("verbose"), Some(&json!(true)));
    }

    #[test]
    fn test_missing_required() {
        let err = validate(&schema(), &args(json!({"verbose": false}))).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredParameter("command".to_string()));
        assert_eq!(err.to_string(), "Missing required parameter 'command'");
    }

    #[test]
    fn test_null_required_counts_as_missing() {
        let err = validate(&schema(), &args(json!({"command": null}))).unwrap_err();
        assert!(matches!(err, ValidationError::MissingRequiredParameter(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let err = validate(&schema(), &args(json!({"command": 42}))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                parameter: "command".to_string(),
                expected: ParamType::String,
                found: "integer",
            }
        );
    }

    #[test]
    fn test_unknown_arguments_dropped_by_default() {
        let validated = validate(&schema(), &args(json!({"command": "x", "extra": 1}))).unwrap();
        assert!(validated.get("extra").is_none());
        assert_eq!(validated.into_value(), json!({"command": "x"}));
    }

    #[test]
    fn test_unknown_arguments_rejected_when_denied() {
        let strict = schema().deny_unknown();
        let err = validate(&strict, &args(json!({"command": "x", "extra": 1}))).unwrap_err();
        assert_eq!(err, ValidationError::UnknownParameter("extra".to_string()));
    }

    #[test]
    fn test_optional_absent_is_fine() {
        let validated = validate(&schema(), &args(json!({"command": "x"}))).unwrap();
        assert!(validated.get("verbose").is_none());
    }
}
