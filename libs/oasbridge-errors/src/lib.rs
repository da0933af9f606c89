//! Problem documents and error normalization for HTTP APIs
//!
//! This crate provides the error data model shared by the oasbridge stack,
//! with no dependency on an HTTP framework. It includes:
//! - RFC 9457 Problem Details (`Problem`)
//! - A catalog of the standard HTTP error codes (`ErrDef`)
//! - Structured and plain HTTP error values (`ApiError`, `HttpError`)
//! - Total classification and normalization (`ErrorSource`, `normalize`)
//!
//! Axum response integration is gated behind the `axum` feature.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api_error;
pub mod catalog;
pub mod normalize;
pub mod problem;

// Re-export commonly used types
pub use api_error::{ApiError, HttpError};
pub use catalog::ErrDef;
pub use normalize::{ErrorSource, normalize};
pub use problem::{APPLICATION_PROBLEM_JSON, Problem};
