//! # Schema Annotations
//!
//! Every handler method carries a [`SchemaAnnotation`] describing its binding:
//! logic function, HTTP method, title, parameters and the request/response
//! shapes used for validation. The pipeline never consults it; it exists for
//! documentation generators and other introspection tools, so it serializes
//! to JSON.
//!
//! ```rust
//! use brrtlogic::annotation::default_title;
//! use http::Method;
//!
//! assert_eq!(default_title(&Method::POST), Some("Create"));
//! assert_eq!(default_title(&Method::OPTIONS), None);
//! ```

use crate::introspect::{ParameterSet, ResolvedSignature};
use crate::validator::ValidationMode;
use http::Method;
use serde::Serialize;
use serde_json::Value;

/// Title used when a binding declares none.
#[must_use]
pub fn default_title(method: &Method) -> Option<&'static str> {
    match *method {
        Method::GET => Some("Retrieve"),
        Method::POST => Some("Create"),
        Method::PUT | Method::PATCH => Some("Update"),
        Method::DELETE => Some("Delete"),
        _ => None,
    }
}

/// One parameter of an annotation-mode binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedParameter {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the parameter's type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// How a binding validates its request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestShape {
    Parameters { parameters: Vec<AnnotatedParameter> },
    Schema { schema: Value },
}

/// How a binding validates its response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseShape {
    Unvalidated,
    ReturnType { schema: Value },
    Schema { schema: Value },
}

/// Introspection record of a single handler method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaAnnotation {
    pub logic: String,
    pub http_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub params: ParameterSet,
    pub request: RequestShape,
    pub response: ResponseShape,
}

impl SchemaAnnotation {
    /// Describe a binding. A missing `title` falls back to [`default_title`].
    #[must_use]
    pub fn new(
        logic: &str,
        method: &Method,
        title: Option<String>,
        heading: Option<String>,
        resolved: &ResolvedSignature,
        validator: &ValidationMode,
    ) -> Self {
        let (request, response) = match validator {
            ValidationMode::Schema(v) => (
                RequestShape::Schema {
                    schema: v.request_schema().clone(),
                },
                v.response_schema()
                    .map_or(ResponseShape::Unvalidated, |schema| ResponseShape::Schema {
                        schema: schema.clone(),
                    }),
            ),
            ValidationMode::Annotations(_) => {
                let parameters = resolved
                    .signature
                    .all_parameters()
                    .map(|spec| AnnotatedParameter {
                        name: spec.name.clone(),
                        required: spec.is_required(),
                        description: spec
                            .annotation
                            .as_ref()
                            .map(|ty| ty.description().to_string())
                            .filter(|d| !d.is_empty()),
                        schema: spec.annotation.as_ref().map(|ty| ty.json_schema()),
                        default: spec.default.clone(),
                    })
                    .collect();
                let response = resolved
                    .signature
                    .return_type()
                    .map_or(ResponseShape::Unvalidated, |ty| ResponseShape::ReturnType {
                        schema: ty.json_schema(),
                    });
                (RequestShape::Parameters { parameters }, response)
            }
        };

        Self {
            logic: logic.to_string(),
            http_method: method.as_str().to_string(),
            title: title.or_else(|| default_title(method).map(str::to_string)),
            heading,
            params: resolved.params.clone(),
            request,
            response,
        }
    }
}
