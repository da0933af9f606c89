//! Error classification and problem-document normalization
//!
//! [`normalize`] is total and pure: it never fails, performs no I/O and does
//! no logging. Callers that want an unknown error recorded must log it before
//! normalizing.

use crate::api_error::{ApiError, HttpError};
use crate::problem::Problem;

/// The three error families the normalizer understands.
///
/// The match in [`normalize`] is exhaustive; a new variant does not compile
/// until normalization handles it.
#[derive(Debug)]
pub enum ErrorSource {
    /// A structured error with full control over the problem document.
    Structured(ApiError),
    /// A plain HTTP error; name and description derive from the status.
    Http(HttpError),
    /// Anything else. Normalizes to the generic internal-error document.
    Unknown(anyhow::Error),
}

impl ErrorSource {
    /// Classifies a dynamic error by downcasting through the known families.
    #[must_use]
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => Self::Structured(api),
            Err(err) => match err.downcast::<HttpError>() {
                Ok(http) => Self::Http(http),
                Err(err) => Self::Unknown(err),
            },
        }
    }
}

impl From<ApiError> for ErrorSource {
    fn from(error: ApiError) -> Self {
        Self::Structured(error)
    }
}

impl From<HttpError> for ErrorSource {
    fn from(error: HttpError) -> Self {
        Self::Http(error)
    }
}

impl From<anyhow::Error> for ErrorSource {
    fn from(error: anyhow::Error) -> Self {
        Self::classify(error)
    }
}

/// Produces the problem document for any error.
///
/// Structured errors are copied verbatim. Plain HTTP errors map to their
/// catalog title and description, with an explicit detail taking precedence.
/// Unknown errors map to the generic internal-error document; nothing derived
/// from the source error appears in it.
#[must_use]
pub fn normalize(source: ErrorSource) -> Problem {
    match source {
        ErrorSource::Structured(error) => error.into(),
        ErrorSource::Http(error) => {
            let title = error.title();
            let description = error.description();
            let HttpError {
                status,
                detail,
                headers,
            } = error;
            let mut problem = Problem::new(status, title);
            problem.detail = detail.or_else(|| description.map(str::to_owned));
            problem.headers = headers;
            problem
        }
        ErrorSource::Unknown(_) => Problem::internal_error(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::catalog;
    use http::StatusCode;

    #[test]
    fn structured_errors_pass_through_verbatim() {
        let err = ApiError::new(StatusCode::CONFLICT, "Duplicate Pet")
            .with_detail("Pet 42 already exists")
            .with_type("https://errors.example.com/DUPLICATE_PET")
            .with_instance("/pets/42")
            .with_ext("pet_id", 42)
            .with_header("retry-after", "5");

        let problem = normalize(err.into());
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
    fn http_errors_map_to_catalog_name_and_description() {
        let problem = normalize(HttpError::new(StatusCode::NOT_FOUND).into());
        assert_eq!(problem.status, StatusCode::NOT_FOUND);
        assert_eq!(problem.title, "Not Found");
        assert_eq!(
            problem.detail.as_deref(),
            Some("The requested resource was not found.")
        );
    }

    #[test]
    fn http_error_detail_overrides_the_description() {
        let err = HttpError::new(StatusCode::GONE)
            .with_detail("Pet 42 was retired")
            .with_header("sunset", "Sat, 01 Jan 2028 00:00:00 GMT");
        let problem = normalize(err.into());
        assert_eq!(problem.detail.as_deref(), Some("Pet 42 was retired"));
        assert!(problem.headers.contains_key("sunset"));
    }

    #[test]
    fn unknown_errors_never_leak_their_message() {
        let secret = "password for db is hunter2";
        let problem = normalize(anyhow::anyhow!("{secret}").into());

        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem.title, "Internal Server Error");

        let body = serde_json::to_string(&problem).unwrap();
        assert!(!body.contains(secret));
        assert!(!body.contains("hunter2"));
    }

    #[test]
    fn classify_recovers_wrapped_families() {
        let wrapped: anyhow::Error = ApiError::bad_request("nope").into();
        assert!(matches!(
            ErrorSource::classify(wrapped),
            ErrorSource::Structured(_)
        ));

        let wrapped: anyhow::Error = HttpError::new(StatusCode::GONE).into();
        assert!(matches!(ErrorSource::classify(wrapped), ErrorSource::Http(_)));

        let wrapped = anyhow::anyhow!("db on fire");
        assert!(matches!(
            ErrorSource::classify(wrapped),
            ErrorSource::Unknown(_)
        ));
    }

    #[test]
    fn every_catalog_code_normalizes_to_a_well_formed_document() {
        for def in catalog::DEFINITIONS {
            let problem = normalize(HttpError::new(def.status_code()).into());
            assert_eq!(problem.status.as_u16(), def.status);
            assert!(!problem.title.is_empty());

            let value = serde_json::to_value(&problem).unwrap();
            assert!(value["status"].is_u64());
            assert!(value["title"].is_string());
        }
    }
}
