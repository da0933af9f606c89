//! RFC 9457 Problem Details for HTTP APIs (pure data model, no HTTP framework dependencies)

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::catalog;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// The standard members of a problem document. Extension members with these
/// names are dropped so the flattened map never collides with a real field.
const RESERVED_MEMBERS: &[&str] = &["type", "title", "status", "detail", "instance"];

pub(crate) fn is_reserved_member(key: &str) -> bool {
    RESERVED_MEMBERS.contains(&key)
}

/// Custom serializer for `StatusCode` to u16
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 9457 Problem Details for HTTP APIs.
///
/// `status` and `title` are always present on the wire; `type`, `detail` and
/// `instance` are omitted when unset. Nonstandard members live in `ext` and
/// are flattened into the body. `headers` carries response headers that must
/// accompany the document (`Retry-After`, `WWW-Authenticate`, ...) and is
/// never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    /// Serializes as u16 for RFC 9457 compatibility.
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    /// A human-readable explanation specific to this occurrence of the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// A URI reference that identifies the specific occurrence of the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Extension members, flattened into the document body.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub ext: serde_json::Map<String, Value>,
    /// Response headers to send alongside the document. Not part of the body.
    #[serde(skip, default)]
    pub headers: HeaderMap,
}

impl Problem {
    /// Create a new Problem with the given status and title.
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_url: None,
            title: title.into(),
            status,
            detail: None,
            instance: None,
            ext: serde_json::Map::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Create a Problem for `status` with the catalog title and description.
    ///
    /// Falls back to the canonical reason phrase (or `Error {code}`) with no
    /// detail for codes the catalog does not know.
    pub fn from_status(status: StatusCode) -> Self {
        match catalog::lookup(status) {
            Some(def) => def.as_problem(),
            None => Self::new(status, title_for_status(status)),
        }
    }

    /// The generic internal-error document. Never carries source error text.
    pub fn internal_error() -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    /// Adds an extension member. Reserved member names are ignored.
    pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved_member(&key) {
            self.ext.insert(key, value.into());
        }
        self
    }

    /// Adds a response header. Invalid names or values are ignored; building
    /// a problem document never fails.
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

/// Title for a status outside the catalog.
pub(crate) fn title_for_status(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("Error {}", status.as_u16()), str::to_owned)
}

/// Axum integration: make Problem directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(mut self) -> axum::response::Response {
        use axum::http::header;

        let status = self.status;
        let extra = std::mem::take(&mut self.headers);
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        for (name, value) in &extra {
            // The problem body owns the entity headers.
            if *name == header::CONTENT_TYPE || *name == header::CONTENT_LENGTH {
                continue;
            }
            resp.headers_mut().append(name, value.clone());
        }
        resp
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn problem_builder_pattern() {
        let p = Problem::new(StatusCode::CONFLICT, "Conflict")
            .with_detail("Pet already exists")
            .with_type("https://errors.example.com/CONFLICT")
            .with_instance("/pets/123")
            .with_ext("pet_id", 123);

        assert_eq!(p.status, StatusCode::CONFLICT);
        assert_eq!(p.title, "Conflict");
        assert_eq!(p.detail.as_deref(), Some("Pet already exists"));
        assert_eq!(p.type_url.as_deref(), Some("https://errors.example.com/CONFLICT"));
        assert_eq!(p.instance.as_deref(), Some("/pets/123"));
        assert_eq!(p.ext.get("pet_id"), Some(&serde_json::json!(123)));
    }

    #[test]
    fn problem_serializes_status_as_u16() {
        let p = Problem::new(StatusCode::NOT_FOUND, "Not Found").with_detail("Resource not found");
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"status\":404"));
    }

    #[test]
    fn problem_deserializes_status_from_u16() {
        let json = r#"{"type":"about:blank","title":"Not Found","status":404,"detail":"Resource not found"}"#;
        let p: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(p.status, StatusCode::NOT_FOUND);
        assert_eq!(p.type_url.as_deref(), Some("about:blank"));
        assert!(p.ext.is_empty());
    }

    #[test]
    fn absent_members_are_omitted() {
        let value = serde_json::to_value(Problem::new(StatusCode::BAD_REQUEST, "Bad Request")).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("type"));
        assert!(!object.contains_key("detail"));
        assert!(!object.contains_key("instance"));
        assert!(!object.contains_key("headers"));
    }

    #[test]
    fn ext_members_flatten_into_the_body() {
        let p = Problem::new(StatusCode::CONFLICT, "Conflict").with_ext("retry_allowed", false);
        let value = serde_json::to_value(p).unwrap();
        assert_eq!(value["retry_allowed"], serde_json::json!(false));
    }

    #[test]
    fn reserved_ext_members_are_ignored() {
        let p = Problem::new(StatusCode::CONFLICT, "Conflict").with_ext("title", "shadowed");
        assert!(p.ext.is_empty());
        assert_eq!(p.title, "Conflict");
    }

    #[test]
    fn invalid_headers_are_ignored() {
        let p = Problem::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
            .with_header("retry-after", "30")
            .with_header("bad header name", "x");
        assert_eq!(p.headers.len(), 1);
        assert_eq!(p.headers.get("retry-after").unwrap(), "30");
    }

    #[test]
    fn from_status_uses_the_catalog() {
        let p = Problem::from_status(StatusCode::NOT_FOUND);
        assert_eq!(p.title, "Not Found");
        assert!(p.detail.is_some());
    }

    #[test]
    fn from_status_falls_back_to_reason_phrase() {
        let status = StatusCode::from_u16(599).unwrap();
        let p = Problem::from_status(status);
        assert_eq!(p.title, "Error 599");
        assert!(p.detail.is_none());
    }
}
