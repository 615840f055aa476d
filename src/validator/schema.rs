use super::ParamValidator;
use crate::error::LogicError;
use crate::introspect::ResolvedSignature;
use crate::logic::Params;
use crate::request::decode_param_value;
use crate::validator_cache::ValidatorCache;
use anyhow::{bail, Context};
use jsonschema::Validator;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const MAX_REF_DEPTH: usize = 8;

/// A resource's JSON schema document: shared definitions plus the
/// per-resource response validation flag and compiled validator cache.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    name: String,
    definitions: Map<String, Value>,
    raise_response_validation_errors: bool,
    cache: ValidatorCache,
}

impl ResourceSchema {
    /// Load a resource schema document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not an object or its
    /// `definitions` member is not an object.
    pub fn new(name: impl Into<String>, schema: Value) -> anyhow::Result<Self> {
        let name = name.into();
        let Value::Object(mut doc) = schema else {
            bail!("schema for resource {name} must be a JSON object");
        };
        let definitions = match doc.remove("definitions") {
            None => Map::new(),
            Some(Value::Object(defs)) => defs,
            Some(_) => bail!("definitions of resource {name} must be a JSON object"),
        };
        debug!(
            resource = %name,
            definitions = definitions.len(),
            "Resource schema loaded"
        );
        Ok(Self {
            name,
            definitions,
            raise_response_validation_errors: false,
            cache: ValidatorCache::new(true),
        })
    }

    /// Raise response validation failures for every binding of this resource.
    #[must_use]
    pub fn raise_response_validation_errors(mut self, raise: bool) -> Self {
        self.raise_response_validation_errors = raise;
        self
    }

    /// Use a shared validator cache instead of a private one.
    #[must_use]
    pub fn with_cache(mut self, cache: ValidatorCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn raises_response_validation_errors(&self) -> bool {
        self.raise_response_validation_errors
    }

    #[must_use]
    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }

    #[must_use]
    pub fn definitions(&self) -> &Map<String, Value> {
        &self.definitions
    }

    /// Definition of `name`, following local `#/definitions/...` references.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&Value> {
        let mut current = self.definitions.get(name)?;
        for _ in 0..MAX_REF_DEPTH {
            let Some(target) = current
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
            else {
                break;
            };
            match self.definitions.get(target) {
                Some(next) => current = next,
                None => break,
            }
        }
        Some(current)
    }

    /// Request schema over `params`, each a reference into the definitions.
    #[must_use]
    pub fn build_request_schema(&self, params: &[String], required: &[String]) -> Value {
        let properties: Map<String, Value> = params
            .iter()
            .map(|p| (p.clone(), json!({ "$ref": format!("{DEFINITIONS_PREFIX}{p}") })))
            .collect();
        json!({
            "type": "object",
            "additionalProperties": true,
            "definitions": self.definitions,
            "properties": properties,
            "required": required,
        })
    }

    /// Response schema fragment made resolvable against the definitions.
    #[must_use]
    pub fn response_schema(&self, fragment: &Value) -> Value {
        let mut schema = fragment.clone();
        if let Value::Object(obj) = &mut schema {
            if !self.definitions.is_empty() && !obj.contains_key("definitions") {
                obj.insert(
                    "definitions".to_string(),
                    Value::Object(self.definitions.clone()),
                );
            }
        }
        schema
    }
}

/// Validates parameters as one document against the resource's schema.
#[derive(Clone)]
pub struct SchemaValidator {
    resource: Arc<ResourceSchema>,
    binding_key: String,
    request_schema: Value,
    request_validator: Arc<Validator>,
    response_schema: Option<Value>,
    response_validator: Option<Arc<Validator>>,
}

impl SchemaValidator {
    /// Build and compile the request (and response) schema of a binding.
    ///
    /// Properties are the request-visible parameters that have a definition.
    /// Required are the parameter set's required names, so parameters injected
    /// by a wrapping layer without a validating type are never required.
    ///
    /// # Errors
    ///
    /// Returns an error if either schema does not compile.
    pub fn new(
        resource: Arc<ResourceSchema>,
        binding_key: impl Into<String>,
        resolved: &ResolvedSignature,
        response_fragment: Option<&Value>,
    ) -> anyhow::Result<Self> {
        let binding_key = binding_key.into();
        let properties: Vec<String> = resolved
            .params
            .all
            .iter()
            .filter(|p| resource.definitions().contains_key(p.as_str()))
            .cloned()
            .collect();
        let required = &resolved.params.required;

        let request_schema = resource.build_request_schema(&properties, required);
        let request_validator = resource
            .cache()
            .get_or_compile(&binding_key, "request", &request_schema)
            .with_context(|| format!("request schema of {binding_key}"))?;

        let response_schema = response_fragment.map(|f| resource.response_schema(f));
        let response_validator = match &response_schema {
            Some(schema) => Some(
                resource
                    .cache()
                    .get_or_compile(&binding_key, "response", schema)
                    .with_context(|| format!("response schema of {binding_key}"))?,
            ),
            None => None,
        };

        debug!(
            binding = %binding_key,
            properties = ?properties,
            required = ?required,
            response = response_schema.is_some(),
            "Schema validator built"
        );
        Ok(Self {
            resource,
            binding_key,
            request_schema,
            request_validator,
            response_schema,
            response_validator,
        })
    }

    #[must_use]
    pub fn request_schema(&self) -> &Value {
        &self.request_schema
    }

    #[must_use]
    pub fn response_schema(&self) -> Option<&Value> {
        self.response_schema.as_ref()
    }

    fn validate(validator: &Validator, doc: &Value) -> Result<(), LogicError> {
        let errors: Vec<String> = validator.iter_errors(doc).map(|e| e.to_string()).collect();
        match errors.first() {
            None => Ok(()),
            Some(first) => Err(LogicError::schema_validation(first.clone())
                .with_errors(Value::from(errors))),
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("resource", &self.resource.name())
            .field("binding_key", &self.binding_key)
            .field("request_schema", &self.request_schema)
            .field("response_schema", &self.response_schema)
            .finish()
    }
}

impl ParamValidator for SchemaValidator {
    fn parse_params(&self, values: &HashMap<String, String>) -> Params {
        values
            .iter()
            .map(|(k, v)| (k.clone(), decode_param_value(v, self.resource.definition(k))))
            .collect()
    }

    fn validate_request(&self, params: Params) -> Result<Params, LogicError> {
        let doc = Value::Object(params);
        Self::validate(&self.request_validator, &doc)?;
        match doc {
            Value::Object(params) => Ok(params),
            _ => Ok(Params::new()),
        }
    }

    fn has_response_validation(&self) -> bool {
        self.response_validator.is_some()
    }

    fn validate_response(&self, content: &Value) -> Result<(), LogicError> {
        match &self.response_validator {
            Some(validator) => Self::validate(validator, content),
            None => Ok(()),
        }
    }

    fn raise_response_validation_errors(&self) -> bool {
        self.resource.raises_response_validation_errors()
    }
}
