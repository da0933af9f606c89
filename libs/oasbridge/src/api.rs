//! The facade
//!
//! An [`Api`] owns one host router. Each [`Api::register`] call loads a
//! specification document, builds its routes and mounts them under a base
//! path; [`Api::into_router`] then produces the axum router with the problem
//! layer applied outermost. A facade with no registrations is already a
//! working service: every unmatched request answers with a problem document.

use std::collections::BTreeSet;
use std::fmt;
use std::mem;
use std::path::Path;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use http::{Method, StatusCode, Uri};
use oasbridge_errors::Problem;
use thiserror::Error;

use crate::docs::docs_routes;
use crate::error_layer::shape_error_responses;
use crate::options::RegisterOptions;
use crate::router::build_blueprint;
use crate::spec::{ApiSpecification, SpecError, normalize_base_path};

/// Errors from [`Api::register`]. A failed registration leaves the facade
/// exactly as it was.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The document could not be loaded or understood.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// The options contradict each other or the document.
    #[error("invalid registration options: {0}")]
    Options(String),

    /// A path template the router cannot mount.
    #[error("invalid path template {path}")]
    InvalidPath { path: String },

    /// Two templates that differ only in capture names.
    #[error("path template {path} collides with already mounted {previous}")]
    DuplicateRoute { path: String, previous: String },

    /// The base path is in use by an earlier registration.
    #[error("base path '{base_path}' is already registered")]
    BasePathTaken { base_path: String },

    /// The resolver could not bind an operation and the policy is
    /// [`Fail`](crate::resolver::ResolverErrorPolicy::Fail).
    #[error("operation {operation} has no bound handler")]
    UnresolvedOperation { operation: String },

    /// The parsed document did not serialize back to JSON.
    #[error("failed to serialize the document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One mounted route.
#[derive(Debug, Clone)]
pub struct RouteSummary {
    pub method: Method,
    /// Full request path, base path included.
    pub path: String,
    pub operation_id: Option<String>,
}

/// Receipt for one successful registration.
#[derive(Debug, Clone)]
pub struct RegisteredApi {
    pub title: String,
    pub version: String,
    /// Mount prefix; empty when mounted at the root.
    pub base_path: String,
    /// Console URL, when this registration serves docs.
    pub swagger_url: Option<String>,
    pub routes: Vec<RouteSummary>,
}

/// Specification-driven API facade over one axum router.
pub struct Api {
    router: Router,
    bases: BTreeSet<String>,
    swagger_url: Option<String>,
    debug: bool,
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("bases", &self.bases)
            .field("swagger_url", &self.swagger_url)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// A facade with no registrations. Unmatched requests already answer
    /// with a 404 problem document.
    #[must_use]
    pub fn new() -> Self {
        let router = Router::new().fallback(|uri: Uri| async move {
            Problem::from_status(StatusCode::NOT_FOUND)
                .with_detail(format!("no route for {}", uri.path()))
                .with_instance(uri.path())
                .into_response()
        });
        Self {
            router,
            bases: BTreeSet::new(),
            swagger_url: None,
            debug: false,
        }
    }

    /// Wraps an existing host application.
    ///
    /// The host's routes keep answering and the problem layer covers them
    /// once [`Api::into_router`] runs. The host's own fallback, if any, is
    /// left in place; [`Api::new`] installs the 404 problem fallback only on
    /// the router it creates itself.
    #[must_use]
    pub fn from_router(host: Router) -> Self {
        Self {
            router: host,
            bases: BTreeSet::new(),
            swagger_url: None,
            debug: false,
        }
    }

    /// Debug mode for the whole facade: 5xx reshaping reveals the original
    /// response body instead of scrubbing it. Any registration with
    /// `debug = true` enables it as well.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Loads the document at `specification_path` and mounts its operations.
    ///
    /// The base path is taken from `options`, falling back to the document's
    /// first server URL, then to the root. All checks run before anything
    /// mounts, so a failed call leaves the facade unchanged.
    ///
    /// # Errors
    /// [`RegisterError::Spec`] when the document cannot be loaded or parsed;
    /// [`RegisterError::Options`] for contradictory options or docs-route
    /// collisions; [`RegisterError::InvalidPath`] and
    /// [`RegisterError::DuplicateRoute`] for unmountable templates;
    /// [`RegisterError::BasePathTaken`] when the base path is already in
    /// use; [`RegisterError::UnresolvedOperation`] when an operation has no
    /// handler and the policy is `Fail`.
    pub fn register(
        &mut self,
        specification_path: impl AsRef<Path>,
        options: RegisterOptions,
    ) -> Result<RegisteredApi, RegisterError> {
        if let Some(conflict) = options.conflict() {
            tracing::error!(
                reason = %conflict,
                "Conflicting options detected; rejecting registration"
            );
            return Err(RegisterError::Options(conflict));
        }

        let specification =
            ApiSpecification::load(specification_path.as_ref(), options.arguments.as_ref())?;

        let base_path = match &options.base_path {
            Some(base) => normalize_base_path(base),
            None => specification.base_path().unwrap_or_default(),
        };
        if base_path.contains(['{', '}']) {
            tracing::error!(
                base_path = %base_path,
                "Base path contains template captures; rejecting registration"
            );
            return Err(RegisterError::Options(format!(
                "base path '{base_path}' must not contain template captures"
            )));
        }
        if self.bases.contains(&base_path) {
            tracing::error!(
                base_path = %base_path,
                "Base path already in use; rejecting registration"
            );
            return Err(RegisterError::BasePathTaken { base_path });
        }

        let blueprint = build_blueprint(&specification, &base_path, &options)?;
        let docs = options.docs;
        let debug = options.debug;

        let mut mounted = blueprint.router;
        let mut swagger_url = None;
        if docs.serve_spec {
            let document = serde_json::to_value(specification.document())?;
            let spec_url = format!("{base_path}/openapi.json");
            if docs.serve_docs {
                swagger_url = Some(format!("{base_path}{}", docs.normalized_ui_path()));
            }
            mounted = mounted.merge(docs_routes(document, &spec_url, &docs));
        }

        // Everything fallible is behind us; the facade changes only now.
        let host = mem::take(&mut self.router);
        self.router = if base_path.is_empty() {
            host.merge(mounted)
        } else {
            host.nest(&base_path, mounted)
        };
        self.bases.insert(base_path.clone());
        self.debug = self.debug || debug;
        if let Some(url) = &swagger_url {
            self.swagger_url = Some(url.clone());
        }

        tracing::debug!(
            title = specification.title(),
            version = specification.version(),
            base_path = %base_path,
            routes = blueprint.routes.len(),
            "registered specification"
        );

        Ok(RegisteredApi {
            title: specification.title().to_owned(),
            version: specification.version().to_owned(),
            base_path,
            swagger_url,
            routes: blueprint.routes,
        })
    }

    /// Console URL of the most recent registration that serves docs.
    #[must_use]
    pub fn swagger_url(&self) -> Option<&str> {
        self.swagger_url.as_deref()
    }

    /// Base paths of all registrations so far, sorted.
    #[must_use]
    pub fn base_paths(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().map(String::as_str)
    }

    /// Finalizes the facade: the problem layer goes outermost, so every
    /// error response leaving the router is a problem document.
    #[must_use]
    pub fn into_router(self) -> Router {
        let debug = self.debug;
        self.router
            .layer(middleware::from_fn(move |request: Request, next: Next| {
                shape_error_responses(debug, request, next)
            }))
    }
}
