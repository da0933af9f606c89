//! Specification-driven API mounting for axum
//!
//! An [`Api`] facade turns `OpenAPI` 3.0 documents into axum routers. Each
//! registration loads a document, binds its operations to handlers through a
//! [`Resolver`], mounts them under the document's base path and polices them
//! against the contract:
//! - requests with undeclared query parameters are rejected (strict
//!   validation)
//! - responses with undeclared statuses are replaced (response validation)
//! - operations with security requirements demand an `Authorization` header
//! - every error leaving the router is an RFC 9457 problem document
//!
//! The loaded document itself and a console UI for it are served under the
//! base path.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use oasbridge::{Api, RegisterOptions, RegistryResolver};
//!
//! let resolver = RegistryResolver::new().route("listPets", || async { "[]" });
//! let mut api = Api::new();
//! let registered = api.register(
//!     "petstore.yaml",
//!     RegisterOptions::new().with_resolver(Arc::new(resolver)),
//! )?;
//! if let Some(url) = &registered.swagger_url {
//!     println!("console at {url}");
//! }
//! let router = api.into_router();
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod options;
pub mod resolver;
pub mod spec;

mod docs;
mod error_layer;
mod router;

pub use api::{Api, RegisterError, RegisteredApi, RouteSummary};
pub use options::{DocsOptions, RegisterOptions, ValidationOptions};
pub use resolver::{HandlerService, RegistryResolver, Resolver, ResolverErrorPolicy};
pub use router::OperationContext;
pub use spec::{ApiSpecification, OperationDescriptor, SpecError};

// The error vocabulary, re-exported so handlers need only this crate.
pub use oasbridge_errors::{ApiError, ErrorSource, HttpError, Problem, normalize};
