//! # Dispatcher Module
//!
//! The request pipeline that every synthesized handler method runs. It turns a
//! [`RequestContext`](crate::request::RequestContext) into a call of the bound
//! logic function and the logic function's reply into a [`HandlerResponse`].
//!
//! ## Request Flow
//!
//! 1. **Extraction** - JSON body for `POST`/`PUT`/`PATCH` requests sent as
//!    `application/json`, otherwise the flat query/form values
//! 2. **Filtering** - only names in the logic function's parameter set survive
//! 3. **Keyword merge** - router-supplied values (path captures) win
//! 4. **Validation** - required check plus coercion, per
//!    [`ValidationMode`](crate::validator::ValidationMode)
//! 5. **Invocation** - the logic function receives positional args and the
//!    validated parameters
//! 6. **Response validation** - failures are logged (truncated) and only raised
//!    when [`should_raise_response_validation_errors`] says so
//! 7. **Shaping** - `POST` → 201, `DELETE` → 204, everything else 200; headers
//!    from a [`Response`](crate::logic::Response) envelope are attached
//!
//! Any error leaving these steps goes through [`translate_error`], which applies
//! the status table of [`crate::error`] and logs uncaught errors.
//!
//! ## Logging
//!
//! Each dispatch runs in an `info` span named `dispatch` carrying `method`,
//! `path`, `handler` and a ULID `request_id` (taken from `x-request-id` when
//! it parses).

mod core;

pub use core::{
    handle_http, should_raise_response_validation_errors, status_for_method, translate_error,
    truncate_response, HandlerResponse, PipelineConfig, MAX_RESPONSE_LENGTH,
};
