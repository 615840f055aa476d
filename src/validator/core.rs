use super::{AnnotationValidator, SchemaValidator};
use crate::error::LogicError;
use crate::logic::Params;
use serde_json::Value;
use std::collections::HashMap;

/// Validation capability shared by both modes.
pub trait ParamValidator: Send + Sync {
    /// Turn flat query/form values into parameters.
    fn parse_params(&self, values: &HashMap<String, String>) -> Params;

    /// Check required parameters and validate/coerce the rest.
    ///
    /// # Errors
    ///
    /// `InvalidValue`, `TypeSystem` or `SchemaValidation` with per-field detail.
    fn validate_request(&self, params: Params) -> Result<Params, LogicError>;

    /// Whether a response schema or return annotation is declared.
    fn has_response_validation(&self) -> bool;

    /// Validate the (unwrapped) response content.
    ///
    /// # Errors
    ///
    /// `TypeSystem` or `SchemaValidation` when the content does not validate.
    fn validate_response(&self, content: &Value) -> Result<(), LogicError>;

    /// Validator-level request to raise response validation failures.
    fn raise_response_validation_errors(&self) -> bool {
        false
    }
}

/// Validation mode of a binding.
#[derive(Debug, Clone)]
pub enum ValidationMode {
    Annotations(AnnotationValidator),
    Schema(SchemaValidator),
}

impl ValidationMode {
    fn inner(&self) -> &dyn ParamValidator {
        match self {
            ValidationMode::Annotations(v) => v,
            ValidationMode::Schema(v) => v,
        }
    }

    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(self, ValidationMode::Schema(_))
    }
}

impl ParamValidator for ValidationMode {
    fn parse_params(&self, values: &HashMap<String, String>) -> Params {
        self.inner().parse_params(values)
    }

    fn validate_request(&self, params: Params) -> Result<Params, LogicError> {
        self.inner().validate_request(params)
    }

    fn has_response_validation(&self) -> bool {
        self.inner().has_response_validation()
    }

    fn validate_response(&self, content: &Value) -> Result<(), LogicError> {
        self.inner().validate_response(content)
    }

    fn raise_response_validation_errors(&self) -> bool {
        self.inner().raise_response_validation_errors()
    }
}

impl From<AnnotationValidator> for ValidationMode {
    fn from(v: AnnotationValidator) -> Self {
        ValidationMode::Annotations(v)
    }
}

impl From<SchemaValidator> for ValidationMode {
    fn from(v: SchemaValidator) -> Self {
        ValidationMode::Schema(v)
    }
}
