//! Registration options
//!
//! `RegisterOptions` is a builder over everything one `Api::register` call
//! can tune: mount prefix, template arguments, the resolver and its failure
//! policy, validation strictness and the docs routes.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::resolver::{Resolver, ResolverErrorPolicy};

/// Docs-serving switches for one registration.
#[derive(Debug, Clone)]
pub struct DocsOptions {
    /// Serve the console UI under the base path.
    pub serve_docs: bool,
    /// Serve the loaded document as JSON under the base path.
    pub serve_spec: bool,
    /// Route for the console UI, relative to the base path.
    pub ui_path: String,
}

impl Default for DocsOptions {
    fn default() -> Self {
        Self {
            serve_docs: true,
            serve_spec: true,
            ui_path: "/ui".to_owned(),
        }
    }
}

impl DocsOptions {
    /// Neither the document nor the console UI is served.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            serve_docs: false,
            serve_spec: false,
            ..Self::default()
        }
    }

    pub(crate) fn normalized_ui_path(&self) -> String {
        let trimmed = self.ui_path.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return "/ui".to_owned();
        }
        if trimmed.starts_with('/') {
            trimmed.to_owned()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Request and response conformance switches.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    /// Replace responses whose status the operation does not declare with a
    /// 500 problem document.
    pub validate_responses: bool,
    /// Reject requests carrying undeclared query parameters with a 400
    /// problem document.
    pub strict_validation: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_responses: true,
            strict_validation: true,
        }
    }
}

/// Options accepted by [`Api::register`](crate::api::Api::register).
///
/// The defaults mount at the document's declared base path, validate
/// strictly, serve docs, and fail registration on unresolved operations.
#[derive(Clone)]
pub struct RegisterOptions {
    pub(crate) base_path: Option<String>,
    pub(crate) arguments: Option<Map<String, Value>>,
    pub(crate) resolver: Option<Arc<dyn Resolver>>,
    pub(crate) resolver_error_policy: ResolverErrorPolicy,
    pub(crate) validation: ValidationOptions,
    pub(crate) docs: DocsOptions,
    pub(crate) auth_all_paths: bool,
    pub(crate) debug: bool,
    pub(crate) snake_case_operation_ids: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            base_path: None,
            arguments: None,
            resolver: None,
            resolver_error_policy: ResolverErrorPolicy::Fail,
            validation: ValidationOptions::default(),
            docs: DocsOptions::default(),
            auth_all_paths: false,
            debug: false,
            snake_case_operation_ids: false,
        }
    }
}

impl fmt::Debug for RegisterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterOptions")
            .field("base_path", &self.base_path)
            .field("arguments", &self.arguments)
            .field("resolver", &self.resolver.as_ref().map(|_| "dyn Resolver"))
            .field("resolver_error_policy", &self.resolver_error_policy)
            .field("validation", &self.validation)
            .field("docs", &self.docs)
            .field("auth_all_paths", &self.auth_all_paths)
            .field("debug", &self.debug)
            .field("snake_case_operation_ids", &self.snake_case_operation_ids)
            .finish()
    }
}

impl RegisterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the mount prefix derived from the document's server URL.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Template arguments substituted into the raw document before parsing.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Binds operations to handlers.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// What to do with operations the resolver cannot bind.
    #[must_use]
    pub fn with_resolver_error_policy(mut self, policy: ResolverErrorPolicy) -> Self {
        self.resolver_error_policy = policy;
        self
    }

    #[must_use]
    pub fn with_validate_responses(mut self, validate_responses: bool) -> Self {
        self.validation.validate_responses = validate_responses;
        self
    }

    #[must_use]
    pub fn with_strict_validation(mut self, strict_validation: bool) -> Self {
        self.validation.strict_validation = strict_validation;
        self
    }

    /// Requires an `Authorization` header on operations without a security
    /// requirement of their own.
    #[must_use]
    pub fn with_auth_all_paths(mut self, auth_all_paths: bool) -> Self {
        self.auth_all_paths = auth_all_paths;
        self
    }

    /// Debug mode: 5xx reshaping reveals the original body as `detail`.
    /// Facade-wide once enabled by any registration.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Resolver lookups use the operation id converted to `snake_case`.
    #[must_use]
    pub fn with_snake_case_operation_ids(mut self, snake_case: bool) -> Self {
        self.snake_case_operation_ids = snake_case;
        self
    }

    #[must_use]
    pub fn with_docs(mut self, docs: DocsOptions) -> Self {
        self.docs = docs;
        self
    }

    /// The defined option conflicts: the console UI loads the document, so it
    /// cannot be enabled while document serving is off, and it cannot sit on
    /// the document route itself.
    pub(crate) fn conflict(&self) -> Option<String> {
        if self.docs.serve_docs && !self.docs.serve_spec {
            return Some(
                "the console UI requires the document route; \
                 enable serve_spec or disable serve_docs"
                    .to_owned(),
            );
        }
        if self.docs.serve_docs && self.docs.normalized_ui_path() == "/openapi.json" {
            return Some(
                "the console UI path collides with the document route; move ui_path".to_owned(),
            );
        }
        None
    }
}
