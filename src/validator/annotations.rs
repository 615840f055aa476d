use super::ParamValidator;
use crate::error::LogicError;
use crate::introspect::ResolvedSignature;
use crate::logic::Params;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Validates parameters with the type annotations of the logic signature.
#[derive(Debug, Clone)]
pub struct AnnotationValidator {
    resolved: Arc<ResolvedSignature>,
}

impl AnnotationValidator {
    #[must_use]
    pub fn new(resolved: Arc<ResolvedSignature>) -> Self {
        Self { resolved }
    }
}

impl ParamValidator for AnnotationValidator {
    fn parse_params(&self, values: &HashMap<String, String>) -> Params {
        // Annotation types coerce from strings themselves.
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    fn validate_request(&self, mut params: Params) -> Result<Params, LogicError> {
        if let Some(missing) = self
            .resolved
            .params
            .required
            .iter()
            .find(|name| !params.contains_key(name.as_str()))
        {
            let message = format!("{missing} is required.");
            return Err(LogicError::invalid_value(message.clone())
                .with_errors(json!({ missing.as_str(): message })));
        }

        for (name, value) in params.iter_mut() {
            // Router-supplied values outside the signature and untyped
            // parameters pass through unchanged.
            let Some(ty) = self
                .resolved
                .signature
                .get(name)
                .and_then(|spec| spec.annotation.as_ref())
            else {
                continue;
            };
            *value = ty.coerce(value).map_err(|e| {
                LogicError::type_system(e.message.clone())
                    .with_errors(json!({ name.as_str(): e.message }))
            })?;
        }
        Ok(params)
    }

    fn has_response_validation(&self) -> bool {
        self.resolved.signature.return_type().is_some()
    }

    fn validate_response(&self, content: &Value) -> Result<(), LogicError> {
        match self.resolved.signature.return_type() {
            Some(ty) => ty.coerce(content).map(|_| ()).map_err(LogicError::from),
            None => Ok(()),
        }
    }
}
