//! # brrtlogic
//!
//! **brrtlogic** sits between an HTTP router and plain business-logic functions.
//! Routes are declared as data; each verb is bound to a logic function whose
//! signature declares typed parameters. The synthesized handlers extract the
//! request parameters, validate and coerce them, call the logic function,
//! validate its result and map every error to an HTTP status.
//!
//! ## Architecture
//!
//! - **[`typed`]** - Validating parameter types (`string`, `integer`, ...)
//! - **[`logic`]** - Logic functions, signatures and wrapping layers
//! - **[`introspect`]** - Parameter sets resolved through wrapping layers
//! - **[`validator`]** - Annotation-mode and schema-mode validation
//! - **[`validator_cache`]** - Compiled JSON Schema cache
//! - **[`dispatcher`]** - The per-request pipeline
//! - **[`error`]** - Error kinds and the status mapper
//! - **[`routing`]** - Route declaration and handler synthesis
//! - **[`annotation`]** - Introspection records for documentation tools
//! - **[`request`]** - Inbound request view
//! - **[`runtime_config`]** / **[`logging`]** - Environment-driven settings
//!
//! ## Request Flow
//!
//! ```text
//! router ──► Handler::call ──► HandlerBase::before
//!                          └─► handle_http: extract → filter → merge kwargs
//!                                → validate → call logic → validate response
//!                                → shape (status by verb) ─► HandlerResponse
//!                                          any error ─► translate_error
//! ```
//!
//! ## Example
//!
//! ```rust
//! use brrtlogic::logic::{LogicFn, Reply, Signature};
//! use brrtlogic::request::RequestContext;
//! use brrtlogic::routing::{create_routes, post, Route};
//! use brrtlogic::runtime_config::Settings;
//! use brrtlogic::typed::{string, ParamType};
//! use http::Method;
//! use serde_json::json;
//!
//! let create_foo = LogicFn::new(
//!     "create_foo",
//!     Signature::new().param("name", string("name").min_length(1).into_ref()),
//!     |call| Ok(Reply::from(json!({ "name": call.get::<String>("name")? }))),
//! )
//! .into_ref();
//!
//! let handlers = create_routes(&[Route::new("/foo", [post(create_foo)])], &Settings::default())
//!     .unwrap();
//! let (_, handler) = &handlers[0];
//!
//! let req = RequestContext::new(Method::POST, "/foo")
//!     .header("content-type", "application/json")
//!     .json(json!({"name": "a"}));
//! let resp = handler.call(&req, Default::default(), Default::default()).unwrap();
//! assert_eq!(resp.status, 201);
//! assert_eq!(resp.body, json!({"name": "a"}));
//!
//! let empty = RequestContext::new(Method::POST, "/foo")
//!     .header("content-type", "application/json")
//!     .json(json!({}));
//! let err = handler.call(&empty, Default::default(), Default::default()).unwrap_err();
//! assert_eq!(err.status(), Some(400));
//! ```

pub mod annotation;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod introspect;
pub mod logging;
pub mod logic;
pub mod request;
pub mod routing;
pub mod runtime_config;
pub mod typed;
pub mod validator;
pub mod validator_cache;

pub use dispatcher::{handle_http, HandlerResponse, PipelineConfig};
pub use error::{AllowedErrors, DispatchError, ErrorKind, HttpError, LogicError};
pub use introspect::{resolve, ParameterSet};
pub use logic::{Call, Decorated, Logic, LogicFn, LogicRef, Reply, Response, Signature};
pub use request::RequestContext;
pub use routing::{create_routes, delete, get, patch, post, put, Handler, HttpMethod, Route};
pub use runtime_config::Settings;
