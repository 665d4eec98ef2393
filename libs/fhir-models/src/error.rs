//! Error types for FHIR models

use crate::validation::ValidationOutcome;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid FHIR resource: {0}")]
    InvalidResource(String),

    #[error("Expected a JSON object for {type_name}, found {found}")]
    ExpectedObject {
        type_name: String,
        found: &'static str,
    },

    #[error("resourceType mismatch: expected {expected}, got {actual}")]
    ResourceTypeMismatch { expected: String, actual: String },

    #[error("Invalid field value for '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },

    #[error("Choice group '{group}' carries more than one variant: {first} and {second}")]
    ChoiceConflict {
        group: String,
        first: String,
        second: String,
    },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{}", .0.summary())]
    Validation(ValidationOutcome),
}

impl Error {
    /// Wraps a (de)serialization failure of a single property.
    pub fn invalid_field(field: &str, err: impl std::fmt::Display) -> Self {
        Self::InvalidFieldValue {
            field: field.to_string(),
            message: err.to_string(),
        }
    }

    /// The aggregated outcome, when this error came from a failed validation.
    pub fn validation_outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            Self::Validation(outcome) => Some(outcome),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
