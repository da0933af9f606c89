//! Operation-to-handler binding
//!
//! A [`Resolver`] turns specification operations into concrete services.
//! [`RegistryResolver`] is the in-memory implementation keyed by operation
//! id; anything implementing the trait can bind by method, path or tags
//! instead.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use axum::extract::Request;
use axum::handler::{Handler, HandlerWithoutStateExt};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use oasbridge_errors::Problem;
use tower::util::BoxCloneSyncService;

use crate::spec::OperationDescriptor;

/// Erased request handler bound to one operation.
pub type HandlerService = BoxCloneSyncService<Request, Response, Infallible>;

/// Maps specification operations to concrete handlers.
pub trait Resolver: Send + Sync {
    /// Returns the handler for `operation`, or `None` when unbound.
    fn resolve(&self, operation: &OperationDescriptor) -> Option<HandlerService>;
}

/// What `register` does with an operation the resolver cannot bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverErrorPolicy {
    /// Fail the whole registration; nothing is mounted.
    #[default]
    Fail,
    /// Mount a stub that answers a 501 problem document.
    RespondNotImplemented,
}

/// In-memory resolver keyed by operation id.
#[derive(Clone, Default)]
pub struct RegistryResolver {
    handlers: HashMap<String, HandlerService>,
}

impl RegistryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `operation_id` to an axum handler.
    #[must_use]
    pub fn route<H, T>(mut self, operation_id: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.handlers.insert(
            operation_id.to_owned(),
            BoxCloneSyncService::new(handler.into_service()),
        );
        self
    }

    /// Operation ids this resolver can bind.
    #[must_use]
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for RegistryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryResolver")
            .field("operations", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl Resolver for RegistryResolver {
    fn resolve(&self, operation: &OperationDescriptor) -> Option<HandlerService> {
        let id = operation.operation_id.as_ref()?;
        self.handlers.get(id).cloned()
    }
}

/// Stub service mounted under [`ResolverErrorPolicy::RespondNotImplemented`].
pub(crate) fn not_implemented_stub(operation: &OperationDescriptor) -> HandlerService {
    let detail = format!("operation {} has no bound handler", operation.name());
    let handler = move || {
        let detail = detail.clone();
        async move {
            Problem::from_status(StatusCode::NOT_IMPLEMENTED)
                .with_detail(detail)
                .into_response()
        }
    };
    BoxCloneSyncService::new(handler.into_service())
}
