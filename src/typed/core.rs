use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Error raised when a value does not validate against a [`ParamType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSystemError {
    /// Human readable reason, e.g. `Must be a valid integer.`
    pub message: String,
}

impl TypeSystemError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TypeSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TypeSystemError {}

/// A validating type used to annotate logic function parameters and return values.
///
/// Implementations must be pure: `coerce` may be called concurrently from many
/// requests and must not depend on shared mutable state.
pub trait ParamType: fmt::Debug + Send + Sync + 'static {
    /// Short description used in documentation and error messages.
    fn description(&self) -> &str;

    /// Validate `value`, converting request strings into the semantic type where
    /// the type allows it.
    ///
    /// # Errors
    ///
    /// Returns a [`TypeSystemError`] if the value cannot be converted or violates
    /// a constraint of the type.
    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError>;

    /// JSON Schema fragment describing this type.
    fn json_schema(&self) -> Value;

    /// Wrap the type in a shared [`TypeRef`].
    fn into_ref(self) -> TypeRef
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// Shared handle to a [`ParamType`].
pub type TypeRef = Arc<dyn ParamType>;

fn with_description(mut schema: Map<String, Value>, description: &str) -> Value {
    if !description.is_empty() {
        schema.insert("description".to_string(), json!(description));
    }
    Value::Object(schema)
}

/// String type with optional length bounds and an optional closed set of values.
#[derive(Debug, Clone, Default)]
pub struct StringType {
    description: String,
    min_length: Option<usize>,
    max_length: Option<usize>,
    allowed: Option<Vec<String>>,
}

/// Create a [`StringType`] with the given description.
pub fn string(description: impl Into<String>) -> StringType {
    StringType {
        description: description.into(),
        ..StringType::default()
    }
}

impl StringType {
    #[must_use]
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Restrict the type to a fixed set of values.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

impl ParamType for StringType {
    fn description(&self) -> &str {
        &self.description
    }

    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError> {
        let s = value
            .as_str()
            .ok_or_else(|| TypeSystemError::new("Must be a valid string."))?;
        let len = s.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(TypeSystemError::new(format!(
                    "Must have at least {min} characters."
                )));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(TypeSystemError::new(format!(
                    "Must have no more than {max} characters."
                )));
            }
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|a| a == s) {
                return Err(TypeSystemError::new(format!(
                    "Must be one of: {}",
                    allowed.join(", ")
                )));
            }
        }
        Ok(Value::String(s.to_string()))
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("string"));
        if let Some(min) = self.min_length {
            schema.insert("minLength".to_string(), json!(min));
        }
        if let Some(max) = self.max_length {
            schema.insert("maxLength".to_string(), json!(max));
        }
        if let Some(allowed) = &self.allowed {
            schema.insert("enum".to_string(), json!(allowed));
        }
        with_description(schema, &self.description)
    }
}

/// Integer type with optional inclusive bounds.
#[derive(Debug, Clone, Default)]
pub struct IntegerType {
    description: String,
    minimum: Option<i64>,
    maximum: Option<i64>,
}

/// Create an [`IntegerType`] with the given description.
pub fn integer(description: impl Into<String>) -> IntegerType {
    IntegerType {
        description: description.into(),
        ..IntegerType::default()
    }
}

impl IntegerType {
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        self.minimum = Some(min);
        self
    }

    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        self.maximum = Some(max);
        self
    }
}

impl ParamType for IntegerType {
    fn description(&self) -> &str {
        &self.description
    }

    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError> {
        let invalid = || TypeSystemError::new("Must be a valid integer.");
        let n = match value {
            Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
            Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        if let Some(min) = self.minimum {
            if n < min {
                return Err(TypeSystemError::new(format!(
                    "{n} is less than the minimum of {min}."
                )));
            }
        }
        if let Some(max) = self.maximum {
            if n > max {
                return Err(TypeSystemError::new(format!(
                    "{n} is greater than the maximum of {max}."
                )));
            }
        }
        Ok(Value::from(n))
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("integer"));
        if let Some(min) = self.minimum {
            schema.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.maximum {
            schema.insert("maximum".to_string(), json!(max));
        }
        with_description(schema, &self.description)
    }
}

/// Floating point type with optional inclusive bounds.
#[derive(Debug, Clone, Default)]
pub struct NumberType {
    description: String,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

/// Create a [`NumberType`] with the given description.
pub fn number(description: impl Into<String>) -> NumberType {
    NumberType {
        description: description.into(),
        ..NumberType::default()
    }
}

impl NumberType {
    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }
}

impl ParamType for NumberType {
    fn description(&self) -> &str {
        &self.description
    }

    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError> {
        let invalid = || TypeSystemError::new("Must be a valid number.");
        let n = match value {
            Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        if !n.is_finite() {
            return Err(invalid());
        }
        if let Some(min) = self.minimum {
            if n < min {
                return Err(TypeSystemError::new(format!(
                    "{n} is less than the minimum of {min}."
                )));
            }
        }
        if let Some(max) = self.maximum {
            if n > max {
                return Err(TypeSystemError::new(format!(
                    "{n} is greater than the maximum of {max}."
                )));
            }
        }
        // Keep integral JSON numbers as they were sent.
        if value.is_number() {
            return Ok(value.clone());
        }
        Ok(Value::from(n))
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("number"));
        if let Some(min) = self.minimum {
            schema.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.maximum {
            schema.insert("maximum".to_string(), json!(max));
        }
        with_description(schema, &self.description)
    }
}

/// Boolean type. Accepts JSON booleans and the usual textual spellings.
#[derive(Debug, Clone, Default)]
pub struct BooleanType {
    description: String,
}

/// Create a [`BooleanType`] with the given description.
pub fn boolean(description: impl Into<String>) -> BooleanType {
    BooleanType {
        description: description.into(),
    }
}

impl ParamType for BooleanType {
    fn description(&self) -> &str {
        &self.description
    }

    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError> {
        match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(TypeSystemError::new("Must be a valid boolean.")),
            },
            _ => Err(TypeSystemError::new("Must be a valid boolean.")),
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("boolean"));
        with_description(schema, &self.description)
    }
}

/// Array type. Query/form strings are split on `,` before item coercion.
#[derive(Debug, Clone)]
pub struct ArrayType {
    description: String,
    items: Option<TypeRef>,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

/// Create an [`ArrayType`] with the given description and untyped items.
pub fn array(description: impl Into<String>) -> ArrayType {
    ArrayType {
        description: description.into(),
        items: None,
        min_items: None,
        max_items: None,
    }
}

impl ArrayType {
    #[must_use]
    pub fn items(mut self, items: TypeRef) -> Self {
        self.items = Some(items);
        self
    }

    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }
}

impl ParamType for ArrayType {
    fn description(&self) -> &str {
        &self.description
    }

    fn coerce(&self, value: &Value) -> Result<Value, TypeSystemError> {
        let raw: Vec<Value> = match value {
            Value::Array(items) => items.clone(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| Value::String(p.to_string()))
                .collect(),
            _ => return Err(TypeSystemError::new("Must be a list.")),
        };
        if let Some(min) = self.min_items {
            if raw.len() < min {
                return Err(TypeSystemError::new(format!(
                    "Must contain at least {min} items."
                )));
            }
        }
        if let Some(max) = self.max_items {
            if raw.len() > max {
                return Err(TypeSystemError::new(format!(
                    "Must contain no more than {max} items."
                )));
            }
        }
        let Some(items) = &self.items else {
            return Ok(Value::Array(raw));
        };
        raw.iter()
            .enumerate()
            .map(|(idx, item)| {
                items
                    .coerce(item)
                    .map_err(|e| TypeSystemError::new(format!("[{idx}]: {}", e.message)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("array"));
        if let Some(items) = &self.items {
            schema.insert("items".to_string(), items.json_schema());
        }
        if let Some(min) = self.min_items {
            schema.insert("minItems".to_string(), json!(min));
        }
        if let Some(max) = self.max_items {
            schema.insert("maxItems".to_string(), json!(max));
        }
        with_description(schema, &self.description)
    }
}
