//! Turning specification operations into an axum router
//!
//! Each operation becomes a method route wrapping its resolved handler in an
//! [`OperationPolicy`]: authorization and strict query checks before the
//! handler runs, declared-status validation after. Paths are validated and
//! checked for template collisions before anything mounts, so a failed build
//! leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use axum::Router;
use axum::extract::{OriginalUri, Request};
use axum::handler::HandlerWithoutStateExt;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, on_service};
use heck::ToSnakeCase;
use http::{Method, StatusCode, header};
use oasbridge_errors::Problem;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

use crate::api::{RegisterError, RouteSummary};
use crate::error_layer::is_problem_response;
use crate::options::RegisterOptions;
use crate::resolver::{HandlerService, ResolverErrorPolicy, not_implemented_stub};
use crate::spec::{ApiSpecification, OperationDescriptor};

/// Identity of the matched operation. Inserted into request extensions so
/// handlers can tell which contract they serve, via
/// `Extension<OperationContext>`.
#[derive(Debug, Clone)]
pub struct OperationContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    method: Method,
    path: String,
    operation_id: Option<String>,
    base_path: String,
}

impl OperationContext {
    fn new(operation: &OperationDescriptor, base_path: &str) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                method: operation.method.clone(),
                path: operation.path.clone(),
                operation_id: operation.operation_id.clone(),
                base_path: base_path.to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Path template from the document, not the resolved request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Mount prefix of the registration, empty for a root mount.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.inner.operation_id.as_deref()
    }

    /// Operation id when present, otherwise `METHOD path`.
    #[must_use]
    pub fn name(&self) -> String {
        match self.operation_id() {
            Some(id) => id.to_owned(),
            None => format!("{} {}", self.method(), self.path()),
        }
    }
}

/// Router assembled from one document, plus a summary of what it mounts.
pub struct Blueprint {
    pub router: Router,
    pub routes: Vec<RouteSummary>,
}

/// Builds the router for one registration. All checks run before the first
/// route mounts; an error here means nothing was built.
pub fn build_blueprint(
    specification: &ApiSpecification,
    base_path: &str,
    options: &RegisterOptions,
) -> Result<Blueprint, RegisterError> {
    let operations = specification.operations();
    check_paths(&operations)?;

    let mut method_routers: BTreeMap<String, MethodRouter> = BTreeMap::new();
    let mut summaries = Vec::with_capacity(operations.len());
    for operation in &operations {
        let Some(filter) = method_filter(&operation.method) else {
            continue;
        };
        let service = policed(
            OperationPolicy::new(operation, base_path, options),
            resolve_operation(operation, options)?,
        );

        let merged = method_routers
            .remove(operation.path.as_str())
            .unwrap_or_default()
            .merge(on_service(filter, service));
        method_routers.insert(operation.path.clone(), merged);

        tracing::debug!(
            method = %operation.method,
            path = %operation.path,
            "mounting operation"
        );
        summaries.push(RouteSummary {
            method: operation.method.clone(),
            path: format!("{base_path}{}", operation.path),
            operation_id: operation.operation_id.clone(),
        });
    }

    check_docs_conflicts(&method_routers, options)?;

    let mut router = Router::new();
    for (path, method_router) in method_routers {
        router = router.route(&path, method_router);
    }
    summaries.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.method.as_str().cmp(b.method.as_str()))
    });
    Ok(Blueprint {
        router,
        routes: summaries,
    })
}

/// Rejects malformed path templates and templates that collide once their
/// parameter names are erased (`/pets/{id}` vs `/pets/{petId}`); the router
/// would otherwise panic when the second one mounts.
fn check_paths(operations: &[OperationDescriptor]) -> Result<(), RegisterError> {
    let mut shapes: HashMap<String, &str> = HashMap::new();
    for operation in operations {
        if !template_is_well_formed(&operation.path) {
            return Err(RegisterError::InvalidPath {
                path: operation.path.clone(),
            });
        }
        let shape = normalize_template(&operation.path);
        match shapes.get(shape.as_str()) {
            Some(previous) if *previous != operation.path => {
                return Err(RegisterError::DuplicateRoute {
                    path: operation.path.clone(),
                    previous: (*previous).to_owned(),
                });
            }
            Some(_) => {}
            None => {
                shapes.insert(shape, &operation.path);
            }
        }
    }
    Ok(())
}

fn check_docs_conflicts(
    method_routers: &BTreeMap<String, MethodRouter>,
    options: &RegisterOptions,
) -> Result<(), RegisterError> {
    if options.docs.serve_spec && method_routers.contains_key("/openapi.json") {
        return Err(RegisterError::Options(
            "specification path /openapi.json collides with the document route; \
             disable serve_spec or rename the path"
                .to_owned(),
        ));
    }
    let ui_path = options.docs.normalized_ui_path();
    if options.docs.serve_docs && method_routers.contains_key(ui_path.as_str()) {
        return Err(RegisterError::Options(format!(
            "specification path {ui_path} collides with the console route; \
             disable serve_docs or move it"
        )));
    }
    Ok(())
}

/// A template is well formed when it starts with `/`, every brace segment is
/// a whole, non-empty capture with a plain name, and no name repeats within
/// the template. Anything looser panics inside the router when it mounts.
fn template_is_well_formed(path: &str) -> bool {
    if !path.starts_with('/') {
        return false;
    }
    let mut seen = HashSet::new();
    for segment in path.split('/') {
        if !segment.contains(['{', '}']) {
            continue;
        }
        if segment.len() <= 2 || !segment.starts_with('{') || !segment.ends_with('}') {
            return false;
        }
        let name = &segment[1..segment.len() - 1];
        if name.contains(['{', '}', '*']) || !seen.insert(name) {
            return false;
        }
    }
    true
}

/// Erases capture names: `/pets/{petId}` and `/pets/{id}` share the shape
/// `/pets/{}`.
fn normalize_template(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::PUT => Some(MethodFilter::PUT),
        Method::POST => Some(MethodFilter::POST),
        Method::DELETE => Some(MethodFilter::DELETE),
        Method::OPTIONS => Some(MethodFilter::OPTIONS),
        Method::HEAD => Some(MethodFilter::HEAD),
        Method::PATCH => Some(MethodFilter::PATCH),
        Method::TRACE => Some(MethodFilter::TRACE),
        _ => None,
    }
}

fn resolve_operation(
    operation: &OperationDescriptor,
    options: &RegisterOptions,
) -> Result<HandlerService, RegisterError> {
    let service = match &options.resolver {
        Some(resolver) if options.snake_case_operation_ids => {
            let mut adjusted = operation.clone();
            if let Some(id) = &mut adjusted.operation_id {
                *id = id.to_snake_case();
            }
            resolver.resolve(&adjusted)
        }
        Some(resolver) => resolver.resolve(operation),
        None => None,
    };
    match (service, options.resolver_error_policy) {
        (Some(service), _) => Ok(service),
        (None, ResolverErrorPolicy::Fail) => Err(RegisterError::UnresolvedOperation {
            operation: operation.name(),
        }),
        (None, ResolverErrorPolicy::RespondNotImplemented) => Ok(not_implemented_stub(operation)),
    }
}

/// Wraps a handler in its operation's policy. The policed service is what
/// actually mounts; the plain 405 fallback for unmatched methods stays
/// outside it.
fn policed(policy: OperationPolicy, inner: HandlerService) -> HandlerService {
    let handler = move |request: Request| {
        let policy = policy.clone();
        let inner = inner.clone();
        async move { policy.run(request, inner).await }
    };
    BoxCloneSyncService::new(handler.into_service())
}

/// Per-operation request and response checks derived from the document.
#[derive(Debug, Clone)]
struct OperationPolicy {
    context: OperationContext,
    /// Declared query parameter names; `None` disables the strict check
    /// (strict validation off, or the operation carries `$ref` parameters).
    allowed_query: Option<HashSet<String>>,
    declared_statuses: Vec<StatusCode>,
    declared_ranges: Vec<u16>,
    require_auth: bool,
    validate_responses: bool,
}

impl OperationPolicy {
    fn new(operation: &OperationDescriptor, base_path: &str, options: &RegisterOptions) -> Self {
        let allowed_query = (options.validation.strict_validation && !operation.has_ref_parameters)
            .then(|| operation.query_parameters.iter().cloned().collect());
        Self {
            context: OperationContext::new(operation, base_path),
            allowed_query,
            declared_statuses: operation.declared_statuses.clone(),
            declared_ranges: operation.declared_ranges.clone(),
            require_auth: operation.has_security || options.auth_all_paths,
            // A default response declares every status.
            validate_responses: options.validation.validate_responses
                && !operation.has_default_response,
        }
    }

    async fn run(&self, mut request: Request, inner: HandlerService) -> Response {
        let instance = request_path(&request);

        if self.require_auth && !request.headers().contains_key(header::AUTHORIZATION) {
            return Problem::unauthorized(format!(
                "operation {} requires authorization",
                self.context.name()
            ))
            .with_header(header::WWW_AUTHENTICATE, "Bearer")
            .with_instance(instance)
            .into_response();
        }

        if let Some(allowed) = &self.allowed_query {
            let unknown = unknown_query_parameters(request.uri().query(), allowed);
            if !unknown.is_empty() {
                return Problem::bad_request(format!(
                    "unknown query parameters: {}",
                    unknown.join(", ")
                ))
                .with_instance(instance)
                .into_response();
            }
        }

        request.extensions_mut().insert(self.context.clone());
        let response = match inner.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let status = response.status();
        if self.validate_responses && !self.declares(status) && !is_problem_response(&response) {
            tracing::error!(
                operation = %self.context.name(),
                status = status.as_u16(),
                "handler produced an undeclared response status"
            );
            return Problem::internal_error()
                .with_detail(format!(
                    "response status {} is not declared for {} {}",
                    status.as_u16(),
                    self.context.method(),
                    self.context.path()
                ))
                .with_instance(instance)
                .into_response();
        }
        response
    }

    fn declares(&self, status: StatusCode) -> bool {
        if self.declared_statuses.contains(&status) {
            return true;
        }
        let code = status.as_u16();
        self.declared_ranges.iter().any(|range| {
            let low = range * 100;
            (low..low + 100).contains(&code)
        })
    }
}

/// The path the client actually requested. Routing under a base path strips
/// the prefix from the request URI; the original is kept in extensions.
fn request_path(request: &Request) -> String {
    match request.extensions().get::<OriginalUri>() {
        Some(original) => original.0.path().to_owned(),
        None => request.uri().path().to_owned(),
    }
}

/// Names in the query string that the operation does not declare, sorted and
/// deduplicated for a stable error message.
fn unknown_query_parameters(query: Option<&str>, allowed: &HashSet<String>) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    let mut unknown = BTreeSet::new();
    for (name, _) in url::form_urlencoded::parse(query.as_bytes()) {
        if !allowed.contains(name.as_ref()) {
            unknown.insert(name.into_owned());
        }
    }
    unknown.into_iter().collect()
}
