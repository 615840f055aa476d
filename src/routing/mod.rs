//! # Routing Module
//!
//! Declarative route synthesis. A [`Route`] lists [`HttpMethod`] bindings (one
//! logic function per verb); [`create_routes`] turns the list into one
//! [`Handler`] per route, ready to be registered with the HTTP router.
//!
//! ## Declaring Routes
//!
//! ```rust
//! use brrtlogic::logic::{LogicFn, Reply, Signature};
//! use brrtlogic::routing::{create_routes, get, post, Route};
//! use brrtlogic::runtime_config::Settings;
//! use brrtlogic::typed::{string, ParamType};
//! use http::Method;
//! use serde_json::json;
//!
//! let list_foos = LogicFn::new("list_foos", Signature::new(), |_| {
//!     Ok(Reply::from(json!([])))
//! })
//! .into_ref();
//! let create_foo = LogicFn::new(
//!     "create_foo",
//!     Signature::new().param("name", string("name").min_length(1).into_ref()),
//!     |call| Ok(Reply::from(json!({ "name": call.get::<String>("name")? }))),
//! )
//! .into_ref();
//!
//! let routes = vec![Route::new("/foo", [get(list_foos), post(create_foo)]).heading("Foo")];
//! let handlers = create_routes(&routes, &Settings::default()).unwrap();
//!
//! let (path, handler) = &handlers[0];
//! assert_eq!(path, "/foo");
//! assert_eq!(handler.name(), "list_foos");
//! assert_eq!(handler.methods(), &[Method::GET, Method::POST]);
//! ```
//!
//! ## Handlers
//!
//! A [`Handler`] is a plain value: its name, heading, declared-methods list and
//! one [`HandlerMethod`] per verb. Cross-cutting checks that a router would
//! otherwise put in a handler base class go in a [`HandlerBase`], whose
//! [`before`](HandlerBase::before) hook runs ahead of the pipeline.
//!
//! ## Determinism
//!
//! Output order follows the route list, and method attachment order follows
//! each route's binding list. Nothing iterates an unordered container.

mod core;

pub use core::*;
