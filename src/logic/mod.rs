//! # Logic Module
//!
//! Logic functions are the plain business-logic callables that routes ultimately
//! invoke. They know nothing about HTTP: they receive a [`Call`] holding already
//! validated parameters and return a [`Reply`] (a raw JSON value or a
//! [`Response`] envelope carrying extra headers).
//!
//! ## Signatures
//!
//! A logic function declares its parameters through a [`Signature`]. Each
//! [`ParameterSpec`] has a name, an optional [`TypeRef`](crate::typed::TypeRef)
//! annotation and an optional default:
//!
//! - typed, no default: **required** from the request
//! - with a default: **optional**
//! - untyped, no default: neither; typically injected by a wrapping layer
//!
//! ## Delegation Chain
//!
//! Wrapping layers (auth checks, logging, argument injection) are expressed with
//! [`Decorated`]. Each layer exposes the callable it wraps through
//! [`Logic::wrapped`], so [`introspect`](crate::introspect) can walk down to the
//! first layer that declares a signature.
//!
//! ```rust
//! use brrtlogic::logic::{Decorated, Logic, LogicFn, Reply, Signature};
//! use brrtlogic::typed::{string, ParamType};
//! use serde_json::json;
//!
//! let greet = LogicFn::new(
//!     "greet",
//!     Signature::new()
//!         .untyped("greeting")
//!         .param("name", string("name").min_length(1).into_ref()),
//!     |call| {
//!         let greeting: String = call.get("greeting")?;
//!         let name: String = call.get("name")?;
//!         Ok(Reply::from(json!(format!("{greeting}, {name}"))))
//!     },
//! )
//! .into_ref();
//!
//! // Inject the leading argument the caller never supplies.
//! let wrapped = Decorated::new(greet, |inner, mut call| {
//!     call.params.insert("greeting".to_string(), json!("hello"));
//!     inner.call(call)
//! })
//! .into_ref();
//! assert_eq!(wrapped.name(), "greet");
//! ```

mod core;

pub use core::*;
