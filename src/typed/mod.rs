//! # Typed Module
//!
//! The typed module is the annotation model used by logic function signatures.
//! Each parameter (and optionally the return value) of a logic function carries a
//! [`TypeRef`]: a shared handle to something implementing [`ParamType`], which knows
//! how to validate a raw value and coerce it into its semantic form.
//!
//! ## Overview
//!
//! Request values arrive either as JSON documents (typed already) or as flat
//! query/form strings. A [`ParamType`] accepts both:
//!
//! - **Coercion** - `"42"` becomes `42` for an integer, `"true"` becomes `true`
//!   for a boolean, `"a,b"` becomes `["a", "b"]` for an array
//! - **Validation** - bounds such as `min_length` or `maximum` are enforced after
//!   coercion, failing with a [`TypeSystemError`]
//! - **Documentation** - every type renders a JSON Schema fragment via
//!   [`ParamType::json_schema`] for annotation tooling
//!
//! ## Usage
//!
//! ```rust
//! use brrtlogic::typed::{integer, string, ParamType};
//! use serde_json::json;
//!
//! let name = string("name").min_length(1).into_ref();
//! let age = integer("age").minimum(1).maximum(120).into_ref();
//!
//! assert_eq!(name.coerce(&json!("a")).unwrap(), json!("a"));
//! assert_eq!(age.coerce(&json!("42")).unwrap(), json!(42));
//! assert!(age.coerce(&json!("0")).is_err());
//! ```
//!
//! The full type system is intentionally small: string, integer, number, boolean
//! and array. Anything richer can implement [`ParamType`] directly.

mod core;

pub use core::*;
