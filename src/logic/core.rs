use crate::error::LogicError;
use crate::typed::TypeRef;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Keyword parameters, keyed by name.
pub type Params = Map<String, Value>;

/// Maximum number of positional arguments before heap allocation.
pub const MAX_INLINE_ARGS: usize = 4;

/// Positional arguments supplied by the router (e.g. unnamed path captures).
pub type ArgVec = SmallVec<[Value; MAX_INLINE_ARGS]>;

/// One declared parameter of a logic function.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    /// Validating type; `None` for parameters injected by a wrapping layer.
    pub annotation: Option<TypeRef>,
    pub default: Option<Value>,
}

impl ParameterSpec {
    /// Required iff it has a validating type and no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.annotation.is_some() && self.default.is_none()
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Declared parameters and return annotation of a logic function.
///
/// `extra_*` parameters are part of the request surface but are consumed by a
/// wrapping layer, so they never reach the innermost function.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<ParameterSpec>,
    extra: Vec<ParameterSpec>,
    returns: Option<TypeRef>,
}

impl Signature {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, spec: ParameterSpec, extra: bool) -> Self {
        let list = if extra { &mut self.extra } else { &mut self.params };
        match list.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => list.push(spec),
        }
        self
    }

    /// Typed parameter with no default.
    #[must_use]
    pub fn param(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push(
            ParameterSpec {
                name: name.into(),
                annotation: Some(ty),
                default: None,
            },
            false,
        )
    }

    /// Typed parameter with a default value.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, ty: TypeRef, default: Value) -> Self {
        self.push(
            ParameterSpec {
                name: name.into(),
                annotation: Some(ty),
                default: Some(default),
            },
            false,
        )
    }

    /// Parameter without a validating type.
    #[must_use]
    pub fn untyped(self, name: impl Into<String>) -> Self {
        self.push(
            ParameterSpec {
                name: name.into(),
                annotation: None,
                default: None,
            },
            false,
        )
    }

    /// Request parameter consumed by a wrapping layer.
    #[must_use]
    pub fn extra_param(self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.push(
            ParameterSpec {
                name: name.into(),
                annotation: Some(ty),
                default: None,
            },
            true,
        )
    }

    /// Optional request parameter consumed by a wrapping layer.
    #[must_use]
    pub fn extra_optional(self, name: impl Into<String>, ty: TypeRef, default: Value) -> Self {
        self.push(
            ParameterSpec {
                name: name.into(),
                annotation: Some(ty),
                default: Some(default),
            },
            true,
        )
    }

    /// Return annotation used for response validation.
    #[must_use]
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Parameters of the function itself, in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.params
    }

    #[must_use]
    pub fn extra_parameters(&self) -> &[ParameterSpec] {
        &self.extra
    }

    /// Every request-visible parameter: own parameters, then extras.
    pub fn all_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.params.iter().chain(self.extra.iter())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.all_parameters().find(|p| p.name == name)
    }

    #[must_use]
    pub fn return_type(&self) -> Option<&TypeRef> {
        self.returns.as_ref()
    }
}

/// Arguments handed to a logic function.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub args: ArgVec,
    pub params: Params,
}

impl Call {
    #[must_use]
    pub fn new(args: ArgVec, params: Params) -> Self {
        Self { args, params }
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn arg(&self, idx: usize) -> Option<&Value> {
        self.args.get(idx)
    }

    /// Deserialize parameter `name`.
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the parameter is missing or has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, LogicError> {
        let value = self
            .params
            .get(name)
            .ok_or_else(|| LogicError::invalid_value(format!("{name} is required.")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| LogicError::invalid_value(format!("{name}: {e}")))
    }

    /// Like [`Call::get`], but `None` when the parameter is absent or null.
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the parameter is present with the wrong shape.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, LogicError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    /// Remove and return parameter `name`. Used by wrapping layers that consume
    /// request parameters themselves.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.params.remove(name)
    }
}

/// Return value wrapper carrying custom response headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub content: Value,
    pub headers: HashMap<String, String>,
}

impl Response {
    #[must_use]
    pub fn new(content: Value) -> Self {
        Self {
            content,
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// What a logic function returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    Response(Response),
}

impl Reply {
    /// Serialize any value into a [`Reply::Value`].
    ///
    /// # Errors
    ///
    /// `Other` if serialization fails.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, LogicError> {
        serde_json::to_value(value)
            .map(Reply::Value)
            .map_err(LogicError::other)
    }

    /// Content with any envelope removed.
    #[must_use]
    pub fn content(&self) -> &Value {
        match self {
            Reply::Value(v) => v,
            Reply::Response(r) => &r.content,
        }
    }

    /// Split into body and headers.
    #[must_use]
    pub fn into_parts(self) -> (Value, HashMap<String, String>) {
        match self {
            Reply::Value(v) => (v, HashMap::new()),
            Reply::Response(r) => (r.content, r.headers),
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

/// A callable that routes can bind to an HTTP method.
pub trait Logic: Send + Sync + 'static {
    /// Name used for handler naming and logging.
    fn name(&self) -> &str;

    /// Signature declared by this layer, if any.
    fn signature(&self) -> Option<&Signature> {
        None
    }

    /// The callable this layer wraps, if it is a wrapping layer.
    fn wrapped(&self) -> Option<&LogicRef> {
        None
    }

    /// Invoke the logic.
    ///
    /// # Errors
    ///
    /// Any [`LogicError`]; the pipeline maps it to a status code.
    fn call(&self, call: Call) -> Result<Reply, LogicError>;
}

/// Shared handle to a logic function.
pub type LogicRef = Arc<dyn Logic>;

type LogicBody = Box<dyn Fn(Call) -> Result<Reply, LogicError> + Send + Sync>;

/// A logic function built from a closure and a declared [`Signature`].
pub struct LogicFn {
    name: String,
    signature: Signature,
    body: LogicBody,
}

impl LogicFn {
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Call) -> Result<Reply, LogicError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn into_ref(self) -> LogicRef {
        Arc::new(self)
    }
}

impl fmt::Debug for LogicFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicFn")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl Logic for LogicFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Option<&Signature> {
        Some(&self.signature)
    }

    fn call(&self, mut call: Call) -> Result<Reply, LogicError> {
        // Parameters the caller omitted take their declared defaults.
        for spec in self.signature.parameters() {
            if let Some(default) = &spec.default {
                if !call.params.contains_key(&spec.name) {
                    call.params.insert(spec.name.clone(), default.clone());
                }
            }
        }
        (self.body)(call)
    }
}

type LayerBody = Box<dyn Fn(&dyn Logic, Call) -> Result<Reply, LogicError> + Send + Sync>;

/// A wrapping layer around another logic function.
///
/// The layer closure receives the inner callable and the call; it may inject,
/// consume or check parameters before delegating. The layer keeps the inner
/// function's name.
pub struct Decorated {
    inner: LogicRef,
    layer: LayerBody,
}

impl Decorated {
    pub fn new<F>(inner: LogicRef, layer: F) -> Self
    where
        F: Fn(&dyn Logic, Call) -> Result<Reply, LogicError> + Send + Sync + 'static,
    {
        Self {
            inner,
            layer: Box::new(layer),
        }
    }

    #[must_use]
    pub fn into_ref(self) -> LogicRef {
        Arc::new(self)
    }
}

impl fmt::Debug for Decorated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorated")
            .field("inner", &self.inner.name())
            .finish_non_exhaustive()
    }
}

impl Logic for Decorated {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn wrapped(&self) -> Option<&LogicRef> {
        Some(&self.inner)
    }

    fn call(&self, call: Call) -> Result<Reply, LogicError> {
        (self.layer)(self.inner.as_ref(), call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::{boolean, string, ParamType};
    use serde_json::json;

    fn echo() -> LogicFn {
        LogicFn::new(
            "echo",
            Signature::new()
                .param("name", string("name").into_ref())
                .optional("loud", boolean("loud").into_ref(), json!(false)),
            |call| Ok(Reply::Value(Value::Object(call.params))),
        )
    }

    #[test]
    fn test_defaults_applied_on_call() {
        let mut params = Params::new();
        params.insert("name".to_string(), json!("a"));
        let reply = echo().call(Call::new(ArgVec::new(), params)).unwrap();
        assert_eq!(reply.content(), &json!({"name": "a", "loud": false}));
    }

    #[test]
    fn test_redeclaring_param_replaces_it() {
        let sig = Signature::new()
            .untyped("a")
            .param("a", string("a").into_ref());
        assert_eq!(sig.parameters().len(), 1);
        assert!(sig.parameters()[0].is_required());
    }

    #[test]
    fn test_call_get_errors() {
        let mut params = Params::new();
        params.insert("n".to_string(), json!("x"));
        let call = Call::new(ArgVec::new(), params);
        assert_eq!(call.get::<String>("n").unwrap(), "x");
        assert!(call.get::<i64>("n").is_err());
        assert_eq!(
            call.get::<String>("missing").unwrap_err().message(),
            "missing is required."
        );
        assert_eq!(call.get_opt::<String>("missing").unwrap(), None);
    }

    #[test]
    fn test_decorated_delegates() {
        let inner = echo().into_ref();
        let wrapped = Decorated::new(inner, |inner, mut call| {
            call.params.insert("name".to_string(), json!("injected"));
            inner.call(call)
        });
        assert_eq!(wrapped.name(), "echo");
        assert!(wrapped.signature().is_none());
        assert!(wrapped.wrapped().is_some());
        let reply = wrapped.call(Call::default()).unwrap();
        assert_eq!(reply.content()["name"], json!("injected"));
    }

    #[test]
    fn test_reply_into_parts() {
        let reply = Reply::from(Response::new(json!([1])).header("X-Total", "1"));
        assert_eq!(reply.content(), &json!([1]));
        let (body, headers) = reply.into_parts();
        assert_eq!(body, json!([1]));
        assert_eq!(headers.get("X-Total").map(String::as_str), Some("1"));
    }
}
