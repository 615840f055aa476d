//! # Error Taxonomy
//!
//! Logic functions and the validation steps report failures as a [`LogicError`]
//! tagged with an [`ErrorKind`]. The pipeline translates every error leaving a
//! request through [`map_error`] into one of two outcomes:
//!
//! - [`DispatchError::Http`] - an [`HttpError`] with a fixed status code
//! - [`DispatchError::Unhandled`] - the original error, passed through verbatim
//!   because debug mode is on or the binding allow-lists it
//!
//! | Kind | Status |
//! |---|---|
//! | `InvalidValue`, `Parse`, `SchemaValidation`, `TypeSystem` | 400 |
//! | `Unauthorized` | 401 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `Immutable` | 409 |
//! | `Other` | 500 (`Uncaught error in logic function`) |
//!
//! Only `Other` is ever eligible for pass-through; the named kinds always map.

use crate::dispatcher::HandlerResponse;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Message returned to callers for every unrecognised error.
pub const UNCAUGHT_ERROR_MESSAGE: &str = "Uncaught error in logic function";

/// Closed set of semantic error kinds understood by the status mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A supplied value is invalid or a required value is missing.
    InvalidValue,
    /// The request could not be parsed.
    Parse,
    /// A JSON schema rejected the request or response document.
    SchemaValidation,
    /// A typed annotation rejected a value.
    TypeSystem,
    Unauthorized,
    Forbidden,
    NotFound,
    /// Attempt to mutate a resource that forbids it.
    Immutable,
    /// Anything else. Maps to 500 unless passed through.
    Other,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidValue
            | ErrorKind::Parse
            | ErrorKind::SchemaValidation
            | ErrorKind::TypeSystem => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Immutable => 409,
            ErrorKind::Other => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::Parse => "Parse",
            ErrorKind::SchemaValidation => "SchemaValidation",
            ErrorKind::TypeSystem => "TypeSystem",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Immutable => "Immutable",
            ErrorKind::Other => "Other",
        };
        write!(f, "{s}")
    }
}

/// Error returned by logic functions and by the validation steps of the pipeline.
///
/// Use the kind-specific constructors for expected domain errors; anything
/// converted from an [`anyhow::Error`] becomes [`ErrorKind::Other`].
#[derive(Debug)]
pub struct LogicError {
    kind: ErrorKind,
    message: String,
    errors: Option<Value>,
    source: Option<anyhow::Error>,
}

impl LogicError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: None,
            source: None,
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidValue, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaValidation, message)
    }

    pub fn type_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeSystem, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn immutable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Immutable, message)
    }

    /// Wrap an arbitrary error as [`ErrorKind::Other`].
    pub fn other(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self {
            kind: ErrorKind::Other,
            message: err.to_string(),
            errors: None,
            source: Some(err),
        }
    }

    /// Attach structured per-field detail.
    #[must_use]
    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn errors(&self) -> Option<&Value> {
        self.errors.as_ref()
    }

    /// The wrapped error for [`ErrorKind::Other`].
    #[must_use]
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Whether the wrapped error is of concrete type `E`.
    #[must_use]
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.as_ref().is_some_and(|e| e.is::<E>())
    }

    /// Unwrap into the underlying [`anyhow::Error`], if any.
    pub fn into_source(self) -> Option<anyhow::Error> {
        self.source
    }
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(err) => write!(f, "{err:#}"),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for LogicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| AsRef::<dyn std::error::Error>::as_ref(e))
    }
}

impl From<anyhow::Error> for LogicError {
    fn from(err: anyhow::Error) -> Self {
        LogicError::other(err)
    }
}

impl From<crate::typed::TypeSystemError> for LogicError {
    fn from(err: crate::typed::TypeSystemError) -> Self {
        LogicError::type_system(err.message)
    }
}

type ErrorPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Per-binding list of error types that bypass the 500 fallback.
///
/// ```rust
/// use brrtlogic::error::AllowedErrors;
///
/// let allowed = AllowedErrors::new().allow::<std::io::Error>();
/// assert_eq!(allowed.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct AllowedErrors {
    entries: Vec<(&'static str, ErrorPredicate)>,
}

impl AllowedErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow errors whose concrete type is `E` to propagate unchanged.
    #[must_use]
    pub fn allow<E>(mut self) -> Self
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.entries.push((
            std::any::type_name::<E>(),
            Arc::new(|err: &anyhow::Error| err.is::<E>()),
        ));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Type names of the allowed errors, in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Whether `err` is an [`ErrorKind::Other`] wrapping an allowed type.
    #[must_use]
    pub fn permits(&self, err: &LogicError) -> bool {
        if err.kind() != ErrorKind::Other {
            return false;
        }
        match err.source_error() {
            Some(source) => self.entries.iter().any(|(_, pred)| pred(source)),
            None => false,
        }
    }
}

impl fmt::Debug for AllowedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

/// Error translated into an HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
    /// Structured per-field detail, when the originating error carried it.
    pub errors: Option<Value>,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Option<Value>) -> Self {
        self.errors = errors;
        self
    }

    /// Canonical reason phrase for the status code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    /// JSON payload for the reply body: `{"status": ..., "message": ...}` plus
    /// `errors` when present.
    #[must_use]
    pub fn data(&self) -> Value {
        let mut data = json!({
            "status": self.status,
            "message": self.message,
        });
        if let (Some(errors), Some(obj)) = (&self.errors, data.as_object_mut()) {
            obj.insert("errors".to_string(), errors.clone());
        }
        data
    }

    /// Render as a reply the router can write directly.
    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        HandlerResponse {
            status: self.status,
            headers: HashMap::new(),
            body: self.data(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.status, self.reason(), self.message)
    }
}

impl std::error::Error for HttpError {}

/// Outcome of a failed dispatch.
#[derive(Debug)]
pub enum DispatchError {
    /// Mapped error with a status code.
    Http(HttpError),
    /// Original error, propagated unchanged to the router.
    Unhandled(LogicError),
}

impl DispatchError {
    /// Status code, or `None` for a pass-through error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Http(e) => Some(e.status),
            DispatchError::Unhandled(_) => None,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Http(e) => write!(f, "{e}"),
            DispatchError::Unhandled(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Http(e) => Some(e),
            DispatchError::Unhandled(e) => Some(e),
        }
    }
}

impl From<HttpError> for DispatchError {
    fn from(err: HttpError) -> Self {
        DispatchError::Http(err)
    }
}

/// Whether an error escapes the 500 fallback and propagates unchanged.
#[must_use]
pub fn passes_through(err: &LogicError, debug: bool, allowed: &AllowedErrors) -> bool {
    err.kind() == ErrorKind::Other && (debug || allowed.permits(err))
}

/// Translate a [`LogicError`] into its dispatch outcome.
///
/// The named kinds always map to their status, debug mode or not. Only
/// [`ErrorKind::Other`] consults `debug` and `allowed`.
#[must_use]
pub fn map_error(err: LogicError, debug: bool, allowed: &AllowedErrors) -> DispatchError {
    match err.kind() {
        ErrorKind::Other => {
            if passes_through(&err, debug, allowed) {
                DispatchError::Unhandled(err)
            } else {
                DispatchError::Http(HttpError::new(500, UNCAUGHT_ERROR_MESSAGE))
            }
        }
        kind => {
            let status = kind.status();
            let errors = err.errors;
            DispatchError::Http(HttpError::new(status, err.message).with_errors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_named_kinds_map_even_in_debug() {
        let cases = [
            (LogicError::invalid_value("bad"), 400),
            (LogicError::parse("bad"), 400),
            (LogicError::schema_validation("bad"), 400),
            (LogicError::type_system("bad"), 400),
            (LogicError::unauthorized("who"), 401),
            (LogicError::forbidden("no"), 403),
            (LogicError::not_found("gone"), 404),
            (LogicError::immutable("frozen"), 409),
        ];
        for (err, status) in cases {
            let mapped = map_error(err, true, &AllowedErrors::new());
            assert_eq!(mapped.status(), Some(status));
        }
    }

    #[test]
    fn test_errors_payload_preserved() {
        let err = LogicError::invalid_value("name is required.")
            .with_errors(json!({"name": "name is required."}));
        match map_error(err, false, &AllowedErrors::new()) {
            DispatchError::Http(e) => {
                assert_eq!(e.status, 400);
                assert_eq!(e.message, "name is required.");
                assert_eq!(
                    e.data(),
                    json!({
                        "status": 400,
                        "message": "name is required.",
                        "errors": {"name": "name is required."}
                    })
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_maps_to_generic_500() {
        let err = LogicError::other(anyhow::anyhow!("db password is hunter2"));
        match map_error(err, false, &AllowedErrors::new()) {
            DispatchError::Http(e) => {
                assert_eq!(e.status, 500);
                assert_eq!(e.message, UNCAUGHT_ERROR_MESSAGE);
                assert!(!e.data().to_string().contains("hunter2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_passes_through_in_debug() {
        let err = LogicError::other(Boom);
        assert!(matches!(
            map_error(err, true, &AllowedErrors::new()),
            DispatchError::Unhandled(_)
        ));
    }

    #[test]
    fn test_allow_list_matches_concrete_type() {
        let allowed = AllowedErrors::new().allow::<Boom>();
        assert!(allowed.permits(&LogicError::other(Boom)));
        assert!(!allowed.permits(&LogicError::other(anyhow::anyhow!("boom"))));
        // Named kinds are never pass-through candidates.
        assert!(!allowed.permits(&LogicError::not_found("x")));

        match map_error(LogicError::other(Boom), false, &allowed) {
            DispatchError::Unhandled(e) => assert!(e.is::<Boom>()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_http_error_display() {
        let e = HttpError::new(404, "no foo");
        assert_eq!(e.to_string(), "404: Not Found: no foo");
        assert_eq!(HttpError::new(409, "x").reason(), "Conflict");
    }
}
