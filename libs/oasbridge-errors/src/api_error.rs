//! Structured and plain HTTP error values
//!
//! `ApiError` gives a handler full control over the problem document it
//! produces; `HttpError` is the bare status-code error whose title and
//! description come from the catalog.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::catalog;
use crate::problem::{self, Problem};

/// A structured error carrying every problem-document member.
///
/// Fields are copied verbatim into the resulting [`Problem`], including
/// extension members and response headers.
#[derive(Debug, Clone, Error)]
#[error("{status}: {title}")]
#[must_use]
pub struct ApiError {
    pub status: StatusCode,
    pub title: String,
    pub detail: Option<String>,
    pub type_url: Option<String>,
    pub instance: Option<String>,
    pub headers: HeaderMap,
    pub ext: serde_json::Map<String, Value>,
}

impl ApiError {
    /// Creates a structured error with an explicit title.
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: None,
            type_url: None,
            instance: None,
            headers: HeaderMap::new(),
            ext: serde_json::Map::new(),
        }
    }

    /// Creates a structured error titled from the catalog (or the reason
    /// phrase for codes the catalog does not know).
    pub fn from_status(status: StatusCode) -> Self {
        let title = match catalog::lookup(status) {
            Some(def) => def.title.to_owned(),
            None => problem::title_for_status(status),
        };
        Self::new(status, title)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    /// Adds an extension member, with the same reserved-name rule as
    /// [`Problem::with_ext`].
    pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !problem::is_reserved_member(&key) {
            self.ext.insert(key, value.into());
        }
        self
    }

    /// Adds a response header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<HeaderName>(),
            value.as_ref().parse::<HeaderValue>(),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::BAD_REQUEST).with_detail(detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::UNAUTHORIZED).with_detail(detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::FORBIDDEN).with_detail(detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::NOT_FOUND).with_detail(detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::CONFLICT).with_detail(detail)
    }

    pub fn unprocessable_entity(detail: impl Into<String>) -> Self {
        Self::from_status(StatusCode::UNPROCESSABLE_ENTITY).with_detail(detail)
    }
}

impl From<ApiError> for Problem {
    fn from(error: ApiError) -> Self {
        Self {
            type_url: error.type_url,
            title: error.title,
            status: error.status,
            detail: error.detail,
            instance: error.instance,
            ext: error.ext,
            headers: error.headers,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        Problem::from(self).into_response()
    }
}

/// A plain HTTP error: a status code, optionally a detail override and
/// response headers. Title and description derive from the catalog.
#[derive(Debug, Clone, Error)]
#[error("{status}")]
#[must_use]
pub struct HttpError {
    pub status: StatusCode,
    pub detail: Option<String>,
    pub headers: HeaderMap,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Adds a response header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<HeaderName>(),
            value.as_ref().parse::<HeaderValue>(),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// The error name for this status.
    #[must_use]
    pub fn title(&self) -> String {
        match catalog::lookup(self.status) {
            Some(def) => def.title.to_owned(),
            None => problem::title_for_status(self.status),
        }
    }

    /// The catalog description for this status, if it is a standard code.
    #[must_use]
    pub fn description(&self) -> Option<&'static str> {
        catalog::lookup(self.status).map(|def| def.description)
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        crate::normalize::normalize(crate::normalize::ErrorSource::Http(self)).into_response()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = ApiError::not_found("Pet 42 is missing");
        assert_eq!(err.to_string(), "404 Not Found: Not Found");
    }

    #[test]
    fn api_error_fields_copy_verbatim_into_problem() {
        let err = ApiError::new(StatusCode::CONFLICT, "Duplicate Pet")
            .with_detail("Pet 42 already exists")
            .with_type("https://errors.example.com/DUPLICATE_PET")
            .with_instance("/pets/42")
            .with_ext("pet_id", 42)
            .with_header("retry-after", "5");

        let problem = Problem::from(err);
        assert_eq!(problem.status, StatusCode::CONFLICT);
        assert_eq!(problem.title, "Duplicate Pet");
        assert_eq!(problem.detail.as_deref(), Some("Pet 42 already exists"));
        assert_eq!(
            problem.type_url.as_deref(),
            Some("https://errors.example.com/DUPLICATE_PET")
        );
        assert_eq!(problem.instance.as_deref(), Some("/pets/42"));
        assert_eq!(problem.ext.get("pet_id"), Some(&serde_json::json!(42)));
        assert_eq!(problem.headers.get("retry-after").unwrap(), "5");
    }

    #[test]
    fn api_error_from_status_titles_from_catalog() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.title, "Too Many Requests");
    }

    #[test]
    fn http_error_titles_and_descriptions() {
        let err = HttpError::new(StatusCode::NOT_FOUND);
        assert_eq!(err.title(), "Not Found");
        assert_eq!(err.description(), Some("The requested resource was not found."));

        let unknown = HttpError::new(StatusCode::from_u16(599).unwrap());
        assert_eq!(unknown.title(), "Error 599");
        assert_eq!(unknown.description(), None);
    }
}
