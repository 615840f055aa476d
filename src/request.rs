//! # Request Context
//!
//! [`RequestContext`] is the view of an inbound request that the router hands to
//! a handler: method, path, mimetype, headers, the flat query/form value map and
//! the JSON body (when one was sent). The pipeline only ever reads from it.
//!
//! Routers usually build it from their own request type:
//!
//! ```rust
//! use brrtlogic::request::RequestContext;
//! use http::Method;
//!
//! let req = RequestContext::new(Method::POST, "/foo?verbose=1")
//!     .header("Content-Type", "application/json; charset=utf-8")
//!     .body_bytes(br#"{"name": "a"}"#);
//! assert_eq!(req.path, "/foo");
//! assert_eq!(req.mimetype(), "application/json");
//! assert!(req.is_json_request());
//! assert_eq!(req.values.get("verbose").map(String::as_str), Some("1"));
//! ```

use crate::error::LogicError;
use crate::logic::Params;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// JSON media type checked against the request mimetype.
pub const JSON_MIMETYPE: &str = "application/json";

/// Methods whose JSON bodies are used as the parameter source.
pub const HTTP_METHODS_WITH_JSON_BODY: [Method; 3] = [Method::POST, Method::PUT, Method::PATCH];

/// Request body as delivered by the router.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonBody {
    #[default]
    Absent,
    Parsed(Value),
    /// Raw bytes, decoded on first use so header order does not matter.
    Raw(Vec<u8>),
}

/// Inbound request data consumed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// Flat query/form values. Query values win over form values.
    pub values: HashMap<String, String>,
    pub body: JsonBody,
}

impl RequestContext {
    /// Create a context from a method and a request target (path plus optional
    /// query string).
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/").to_string();
        let values = parse_query_params(target);
        debug!(
            method = %method,
            path = %path,
            param_count = values.len(),
            "Request context created"
        );
        Self {
            method,
            path,
            headers: HashMap::new(),
            values,
            body: JsonBody::Absent,
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a form value; an existing query value of the same name is kept.
    #[must_use]
    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.entry(name.into()).or_insert_with(|| value.into());
        self
    }

    /// Attach an already parsed JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = JsonBody::Parsed(body);
        self
    }

    /// Attach a raw body. It is decoded by [`json_params`](Self::json_params)
    /// only when the request turns out to be a JSON request.
    #[must_use]
    pub fn body_bytes(mut self, bytes: &[u8]) -> Self {
        self.body = JsonBody::Raw(bytes.to_vec());
        self
    }

    /// Content type without parameters, lowercased (`application/json`).
    #[must_use]
    pub fn mimetype(&self) -> String {
        self.headers
            .get("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Whether parameters come from the JSON body rather than query/form values.
    #[must_use]
    pub fn is_json_request(&self) -> bool {
        self.mimetype() == JSON_MIMETYPE && HTTP_METHODS_WITH_JSON_BODY.contains(&self.method)
    }

    /// JSON body as a parameter mapping. An absent body is an empty mapping.
    ///
    /// # Errors
    ///
    /// `Parse` if the body is malformed or not a JSON object.
    pub fn json_params(&self) -> Result<Params, LogicError> {
        let decoded;
        let value = match &self.body {
            JsonBody::Absent => return Ok(Params::new()),
            JsonBody::Parsed(value) => value,
            JsonBody::Raw(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                return Ok(Params::new())
            }
            JsonBody::Raw(bytes) => {
                decoded = serde_json::from_slice::<Value>(bytes).map_err(|e| {
                    LogicError::parse(format!("Failed to decode JSON object: {e}"))
                })?;
                &decoded
            }
        };
        match value {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(LogicError::parse("Request body must be a JSON object.")),
        }
    }
}

/// Parse query string parameters from a URL path
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
///
/// # Arguments
///
/// * `path` - The full URL path (e.g., `/users?limit=10&offset=20`)
///
/// # Returns
///
/// A map of query parameter names to values
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

/// Decode a raw query/form value according to a JSON schema fragment
///
/// Converts string values to their JSON types based on the schema `type`
/// (integer, number, boolean, array, object). Arrays use `,` as delimiter.
/// Values that do not decode are kept as strings so that validation reports them.
///
/// # Arguments
///
/// * `value` - The raw parameter value string
/// * `schema` - Optional JSON Schema for type conversion
pub fn decode_param_value(value: &str, schema: Option<&Value>) -> Value {
    fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
        if let Some(ty) = schema.and_then(|s| s.get("type").and_then(|v| v.as_str())) {
            match ty {
                "integer" => val
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                "number" => val
                    .parse::<f64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                "boolean" => val
                    .parse::<bool>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                _ => Value::String(val.to_string()),
            }
        } else {
            Value::String(val.to_string())
        }
    }

    match schema.and_then(|s| s.get("type").and_then(|v| v.as_str())) {
        Some("array") => {
            let items_schema = schema.and_then(|s| s.get("items"));
            let parts = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|p| convert_primitive(p, items_schema))
                .collect::<Vec<_>>();
            Value::Array(parts)
        }
        Some("object") => {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        }
        _ => convert_primitive(value, schema),
    }
}
