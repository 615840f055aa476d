use crate::error::{map_error, passes_through, AllowedErrors, DispatchError, LogicError};
use crate::ids::RequestId;
use crate::introspect::ResolvedSignature;
use crate::logic::{ArgVec, Call, Logic, Params};
use crate::request::RequestContext;
use crate::runtime_config::{Settings, DEFAULT_MAX_RESPONSE_LENGTH};
use crate::validator::{ParamValidator, ValidationMode};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// Hard cap on the response text quoted in validation warnings.
pub const MAX_RESPONSE_LENGTH: usize = DEFAULT_MAX_RESPONSE_LENGTH;

/// Reply handed back to the router: body, status and extra headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 201, 204, 400, ...)
    pub status: u16,
    /// Headers from a response envelope; empty otherwise
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Split into `(body, status, headers)`.
    #[must_use]
    pub fn into_parts(self) -> (Value, u16, HashMap<String, String>) {
        (self.body, self.status, self.headers)
    }
}

/// Everything a handler method closes over besides the logic function.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub params: Arc<ResolvedSignature>,
    pub validator: ValidationMode,
    pub allowed_exceptions: AllowedErrors,
    pub settings: Settings,
}

impl PipelineConfig {
    #[must_use]
    pub fn new(params: Arc<ResolvedSignature>, validator: ValidationMode, settings: Settings) -> Self {
        Self {
            params,
            validator,
            allowed_exceptions: AllowedErrors::default(),
            settings,
        }
    }

    #[must_use]
    pub fn allowed_exceptions(mut self, allowed: AllowedErrors) -> Self {
        self.allowed_exceptions = allowed;
        self
    }
}

/// Success status for a verb.
#[must_use]
pub fn status_for_method(method: &Method) -> u16 {
    match *method {
        Method::POST => 201,
        Method::DELETE => 204,
        _ => 200,
    }
}

/// Cut `text` to at most `limit` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_response(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        None => Cow::Borrowed(text),
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
    }
}

/// Whether a response validation failure is raised instead of only logged.
///
/// Raised when debug mode is on, when the environment override is set, or when
/// the validator (a resource schema) asks for it.
#[must_use]
pub fn should_raise_response_validation_errors(
    settings: &Settings,
    validator: &dyn ParamValidator,
) -> bool {
    settings.debug
        || settings.raise_response_validation_errors
        || validator.raise_response_validation_errors()
}

/// Run the request pipeline for one bound logic function.
///
/// `args` are positional values and `kwargs` named values supplied by the
/// router itself (path captures); `kwargs` take precedence over request
/// values of the same name.
///
/// # Errors
///
/// [`DispatchError::Http`] for every mapped failure, or
/// [`DispatchError::Unhandled`] when an uncaught error is passed through
/// (debug mode or an allow-listed type).
pub fn handle_http(
    req: &RequestContext,
    args: ArgVec,
    kwargs: Params,
    logic: &dyn Logic,
    config: &PipelineConfig,
) -> Result<HandlerResponse, DispatchError> {
    let request_id =
        RequestId::from_header_or_new(req.headers.get("x-request-id").map(String::as_str));
    let span = info_span!(
        "dispatch",
        method = %req.method,
        path = %req.path,
        handler = %logic.name(),
        request_id = %request_id
    );
    let _guard = span.enter();

    run_pipeline(req, args, kwargs, logic, config).map_err(|err| {
        translate_error(
            err,
            req,
            logic.name(),
            &config.settings,
            &config.allowed_exceptions,
        )
    })
}

fn run_pipeline(
    req: &RequestContext,
    args: ArgVec,
    kwargs: Params,
    logic: &dyn Logic,
    config: &PipelineConfig,
) -> Result<HandlerResponse, LogicError> {
    let validator = &config.validator;
    let raw = if req.is_json_request() {
        req.json_params()?
    } else {
        validator.parse_params(&req.values)
    };

    let accepted = &config.params.params;
    let mut params: Params = raw
        .into_iter()
        .filter(|(name, _)| accepted.accepts(name))
        .collect();
    params.extend(kwargs);
    debug!(params = ?params.keys().collect::<Vec<_>>(), "Request parameters extracted");

    let params = validator.validate_request(params)?;
    let reply = logic.call(Call::new(args, params))?;

    if validator.has_response_validation() {
        if let Err(err) = validator.validate_response(reply.content()) {
            let text = reply.content().to_string();
            warn!(
                method = %req.method,
                path = %req.path,
                response = %truncate_response(&text, config.settings.max_response_length),
                error = %err,
                "Response does not validate"
            );
            if should_raise_response_validation_errors(&config.settings, validator) {
                return Err(err);
            }
        }
    }

    let status = status_for_method(&req.method);
    let (body, headers) = reply.into_parts();
    Ok(HandlerResponse {
        status,
        headers,
        body,
    })
}

/// Map an error leaving the pipeline (or a handler hook) to its outcome,
/// logging it when it becomes a generic 500.
#[must_use]
pub fn translate_error(
    err: LogicError,
    req: &RequestContext,
    handler: &str,
    settings: &Settings,
    allowed: &AllowedErrors,
) -> DispatchError {
    if err.kind() == crate::error::ErrorKind::Other {
        if passes_through(&err, settings.debug, allowed) {
            debug!(
                handler = %handler,
                error = %err,
                debug = settings.debug,
                "Passing uncaught error through to the router"
            );
        } else {
            error!(
                method = %req.method,
                path = %req.path,
                handler = %handler,
                error = %err,
                "Uncaught error in logic function"
            );
        }
    } else {
        debug!(
            handler = %handler,
            kind = %err.kind(),
            status = err.kind().status(),
            message = %err.message(),
            "Logic error mapped to status"
        );
    }
    map_error(err, settings.debug, allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::resolve_signature;
    use crate::logic::{LogicFn, Reply, Response, Signature};
    use crate::typed::{integer, string, ParamType};
    use crate::validator::AnnotationValidator;
    use serde_json::json;

    fn config(logic: &dyn Logic, settings: Settings) -> PipelineConfig {
        let resolved = Arc::new(resolve_signature(logic));
        let validator = AnnotationValidator::new(Arc::clone(&resolved)).into();
        PipelineConfig::new(resolved, validator, settings)
    }

    fn echo() -> LogicFn {
        LogicFn::new(
            "echo",
            Signature::new()
                .param("name", string("name").min_length(1).into_ref())
                .optional("count", integer("count").into_ref(), json!(1)),
            |call| Ok(Reply::Value(Value::Object(call.params))),
        )
    }

    #[test]
    fn test_status_for_method() {
        assert_eq!(status_for_method(&Method::POST), 201);
        assert_eq!(status_for_method(&Method::DELETE), 204);
        assert_eq!(status_for_method(&Method::GET), 200);
        assert_eq!(status_for_method(&Method::PUT), 200);
        assert_eq!(status_for_method(&Method::PATCH), 200);
    }

    #[test]
    fn test_truncate_response() {
        assert_eq!(truncate_response("abc", 3), "abc");
        assert_eq!(truncate_response("abcd", 3), "abc...");
        assert_eq!(truncate_response("ééé", 2), "éé...");
        let long = "x".repeat(MAX_RESPONSE_LENGTH + 50);
        let cut = truncate_response(&long, MAX_RESPONSE_LENGTH);
        assert_eq!(cut.len(), MAX_RESPONSE_LENGTH + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_query_request_coerced_and_filtered() {
        let logic = echo();
        let req = RequestContext::new(Method::GET, "/echo?name=a&count=3&junk=1");
        let resp = handle_http(&req, ArgVec::new(), Params::new(), &logic, &config(&logic, Settings::default()))
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({"name": "a", "count": 3}));
    }

    #[test]
    fn test_kwargs_win_over_request_values() {
        let logic = echo();
        let req = RequestContext::new(Method::PUT, "/echo")
            .header("content-type", "application/json")
            .json(json!({"name": "body"}));
        let mut kwargs = Params::new();
        kwargs.insert("name".to_string(), json!("path"));
        let resp = handle_http(&req, ArgVec::new(), kwargs, &logic, &config(&logic, Settings::default()))
            .unwrap();
        assert_eq!(resp.body["name"], json!("path"));
    }

    #[test]
    fn test_envelope_headers_attached() {
        let logic = LogicFn::new("listing", Signature::new(), |_| {
            Ok(Response::new(json!([1, 2])).header("X-Total", "2").into())
        });
        let req = RequestContext::new(Method::GET, "/listing");
        let resp = handle_http(&req, ArgVec::new(), Params::new(), &logic, &config(&logic, Settings::default()))
            .unwrap();
        let (body, status, headers) = resp.into_parts();
        assert_eq!(body, json!([1, 2]));
        assert_eq!(status, 200);
        assert_eq!(headers.get("X-Total").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_raise_policy_sources() {
        let logic = echo();
        let cfg = config(&logic, Settings::default());
        assert!(!should_raise_response_validation_errors(&cfg.settings, &cfg.validator));
        let debug = Settings::default().with_debug(true);
        assert!(should_raise_response_validation_errors(&debug, &cfg.validator));
        let env = Settings::default().with_raise_response_validation_errors(true);
        assert!(should_raise_response_validation_errors(&env, &cfg.validator));
    }

    #[test]
    fn test_malformed_json_is_400() {
        let logic = echo();
        let req = RequestContext::new(Method::POST, "/echo")
            .header("content-type", "application/json")
            .body_bytes(b"{\"name\": ");
        let err = handle_http(&req, ArgVec::new(), Params::new(), &logic, &config(&logic, Settings::default()))
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }
}
