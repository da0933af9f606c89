//! `OpenAPI` document loading and inspection
//!
//! Documents are read from disk, template arguments are substituted into the
//! raw text, and the result is parsed into an `openapiv3::OpenAPI`. YAML and
//! JSON sources both go through the YAML parser (JSON is valid YAML).

use std::fs;
use std::path::{Path, PathBuf};

use http::{Method, StatusCode};
use openapiv3::{OpenAPI, Operation, Parameter, PathItem, ReferenceOr};
use serde_json::Value;
use thiserror::Error;

/// Errors from loading or interpreting a specification document.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The document could not be read from disk.
    #[error("failed to read specification {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a parseable `OpenAPI` document.
    #[error("failed to parse specification {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document declares an `OpenAPI` version this crate does not handle.
    #[error("unsupported OpenAPI version: expected 3.0, found {found}")]
    UnsupportedVersion { found: String },
}

/// One (method, path) operation from the document, reduced to what the
/// facade needs to mount and police it.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub method: Method,
    /// Path in `OpenAPI` template syntax (`/pets/{petId}`), which is also the
    /// axum route syntax.
    pub path: String,
    pub operation_id: Option<String>,
    /// Response statuses the operation declares explicitly.
    pub declared_statuses: Vec<StatusCode>,
    /// Declared response ranges: `4` for a `4XX` entry.
    pub declared_ranges: Vec<u16>,
    pub has_default_response: bool,
    /// Names of declared query parameters (path-item and operation level).
    pub query_parameters: Vec<String>,
    /// Whether any parameter is a `$ref`; strict validation skips such
    /// operations because the reference target is not resolved.
    pub has_ref_parameters: bool,
    /// Whether a security requirement applies (operation-level wins over the
    /// document default; an explicit empty list opts out).
    pub has_security: bool,
}

impl OperationDescriptor {
    /// Human-readable name for error messages: the operation id when present,
    /// otherwise `METHOD path`.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

/// A parsed `OpenAPI` document and its origin.
#[derive(Debug, Clone)]
pub struct ApiSpecification {
    document: OpenAPI,
    source: PathBuf,
}

impl ApiSpecification {
    /// Loads a document from disk, substituting template arguments into the
    /// raw text before parsing.
    ///
    /// # Errors
    /// Returns [`SpecError::Read`] when the file cannot be read,
    /// [`SpecError::Parse`] when it is not a valid `OpenAPI` document and
    /// [`SpecError::UnsupportedVersion`] for documents outside 3.0.
    pub fn load(
        path: &Path,
        arguments: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Self, SpecError> {
        let text = fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = match arguments {
            Some(arguments) if !arguments.is_empty() => substitute_arguments(&text, arguments),
            _ => text,
        };
        Self::parse(&text, path)
    }

    /// Parses an in-memory document.
    ///
    /// # Errors
    /// Returns [`SpecError::Parse`] or [`SpecError::UnsupportedVersion`]; the
    /// given `path` is only used for error context.
    pub fn parse(text: &str, path: &Path) -> Result<Self, SpecError> {
        let document: OpenAPI = serde_yaml::from_str(text).map_err(|source| SpecError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !document.openapi.starts_with("3.0") {
            return Err(SpecError::UnsupportedVersion {
                found: document.openapi.clone(),
            });
        }
        Ok(Self {
            document,
            source: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.document.info.title
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.document.info.version
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn document(&self) -> &OpenAPI {
        &self.document
    }

    /// Path component of the first server URL, normalized (no trailing
    /// slash, leading slash unless empty). `None` when the document declares
    /// no servers.
    #[must_use]
    pub fn base_path(&self) -> Option<String> {
        let server = self.document.servers.first()?;
        Some(server_base_path(&server.url))
    }

    /// Flattens the document's paths into one descriptor per (method, path).
    /// `$ref` path items are skipped; the reference target is not resolved.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationDescriptor> {
        let document_security = self
            .document
            .security
            .as_ref()
            .is_some_and(|requirements| !requirements.is_empty());

        let mut out = Vec::new();
        for (path, item) in &self.document.paths.paths {
            let Some(item) = item.as_item() else { continue };
            for (method, operation) in path_item_operations(item) {
                out.push(describe_operation(
                    path,
                    method,
                    operation,
                    item,
                    document_security,
                ));
            }
        }
        out
    }
}

/// Replaces `{{name}}` placeholders (whitespace-tolerant) with the rendered
/// argument value. Strings render unquoted; other values render as JSON.
fn substitute_arguments(text: &str, arguments: &serde_json::Map<String, Value>) -> String {
    let mut out = text.to_owned();
    for (name, value) in arguments {
        let rendered = match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("{{{{{name}}}}}"), &rendered);
        out = out.replace(&format!("{{{{ {name} }}}}"), &rendered);
    }
    out
}

fn server_base_path(url: &str) -> String {
    // Relative server URLs ("/v1") fail absolute parsing and are already paths.
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.to_owned(),
    };
    normalize_base_path(&path)
}

/// Normalizes a mount prefix: empty for root, otherwise a leading slash and
/// no trailing slash.
pub(crate) fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn path_item_operations(item: &PathItem) -> impl Iterator<Item = (Method, &Operation)> {
    [
        (Method::GET, item.get.as_ref()),
        (Method::PUT, item.put.as_ref()),
        (Method::POST, item.post.as_ref()),
        (Method::DELETE, item.delete.as_ref()),
        (Method::OPTIONS, item.options.as_ref()),
        (Method::HEAD, item.head.as_ref()),
        (Method::PATCH, item.patch.as_ref()),
        (Method::TRACE, item.trace.as_ref()),
    ]
    .into_iter()
    .filter_map(|(method, operation)| operation.map(|operation| (method, operation)))
}

fn describe_operation(
    path: &str,
    method: Method,
    operation: &Operation,
    item: &PathItem,
    document_security: bool,
) -> OperationDescriptor {
    let mut declared_statuses = Vec::new();
    let mut declared_ranges = Vec::new();
    for code in operation.responses.responses.keys() {
        match code {
            openapiv3::StatusCode::Code(value) => {
                if let Ok(status) = StatusCode::from_u16(*value) {
                    declared_statuses.push(status);
                }
            }
            openapiv3::StatusCode::Range(range) => declared_ranges.push(*range),
        }
    }

    let mut query_parameters = Vec::new();
    let mut has_ref_parameters = false;
    for param in item.parameters.iter().chain(operation.parameters.iter()) {
        match param {
            ReferenceOr::Reference { .. } => has_ref_parameters = true,
            ReferenceOr::Item(Parameter::Query { parameter_data, .. }) => {
                query_parameters.push(parameter_data.name.clone());
            }
            ReferenceOr::Item(_) => {}
        }
    }

    let has_security = match &operation.security {
        Some(requirements) => !requirements.is_empty(),
        None => document_security,
    };

    OperationDescriptor {
        method,
        path: path.to_owned(),
        operation_id: operation.operation_id.clone(),
        declared_statuses,
        declared_ranges,
        has_default_response: operation.responses.default.is_some(),
        query_parameters,
        has_ref_parameters,
        has_security,
    }
}
