//! # Validator Module
//!
//! Request and response validation for a single binding. Two modes share the
//! [`ParamValidator`] interface and are selected per binding through
//! [`ValidationMode`]:
//!
//! - **Annotations** ([`AnnotationValidator`]) - every typed parameter of the
//!   logic function's [`Signature`](crate::logic::Signature) coerces its own
//!   value; the return annotation validates the response. Reports the first
//!   missing required parameter.
//! - **Schema** ([`SchemaValidator`]) - the parameters are validated as one
//!   JSON document against a schema assembled from a [`ResourceSchema`]'s
//!   definitions; the response against a per-binding response schema. Reports
//!   every violation at once.
//!
//! ## Request Schema
//!
//! ```json
//! {
//!   "type": "object",
//!   "additionalProperties": true,
//!   "definitions": { "...": "resource definitions" },
//!   "properties": { "name": { "$ref": "#/definitions/name" } },
//!   "required": ["name"]
//! }
//! ```
//!
//! `required` is the binding's required parameter set. Each binding keeps its
//! compiled validators; the resource's
//! [`ValidatorCache`](crate::validator_cache::ValidatorCache) shares them
//! between bindings with identical documents.

mod annotations;
mod core;
mod schema;

pub use annotations::AnnotationValidator;
pub use core::*;
pub use schema::{ResourceSchema, SchemaValidator};
