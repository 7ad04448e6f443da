//! # ModKit - shared HTTP building blocks
//!
//! Pieces every REST-facing module needs at its boundary:
//!
//! - RFC 9457 Problem Details (`Problem`, `ProblemResponse`)
//! - the `see_other` redirect helper

pub mod api;

pub use api::problem::{
    bad_request, internal_error, not_found, FieldError, Problem, ProblemResponse,
};
pub use api::response::see_other;
