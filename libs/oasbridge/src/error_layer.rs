//! App-wide reshaping of error responses into problem documents
//!
//! Applied once, outermost, when the facade finalizes the router. Success
//! responses and responses that are already problem documents pass through
//! untouched; everything else becomes `application/problem+json`.

use axum::body::to_bytes;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header;
use oasbridge_errors::{APPLICATION_PROBLEM_JSON, Problem};

/// Largest error body the layer reads back for reshaping.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Largest 4xx body carried into `detail` verbatim.
const MAX_DETAIL_BYTES: usize = 512;

/// Check if a response is already a problem document.
pub fn is_problem_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.contains(APPLICATION_PROBLEM_JSON))
}

/// Middleware body for the problem layer.
///
/// In debug mode 5xx reshaping reveals the original body text as `detail`;
/// otherwise 5xx bodies are logged server-side and replaced with the generic
/// catalog description.
pub async fn shape_error_responses(debug: bool, request: Request, next: Next) -> Response {
    let instance = request.uri().path().to_owned();
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_problem_response(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_ERROR_BODY_BYTES).await.unwrap_or_default();
    let body_text = std::str::from_utf8(&bytes)
        .ok()
        .map(str::trim)
        .filter(|text| !text.is_empty());

    let mut problem = Problem::from_status(status).with_instance(instance);
    if status.is_server_error() {
        if let Some(text) = body_text {
            tracing::error!(status = status.as_u16(), body = %text, "reshaped internal error response");
            if debug {
                problem = problem.with_detail(text);
            }
        } else {
            tracing::error!(status = status.as_u16(), "reshaped internal error response");
        }
    } else if let Some(text) = body_text.filter(|text| text.len() <= MAX_DETAIL_BYTES) {
        problem = problem.with_detail(text);
    }

    let mut response = problem.into_response();
    for (name, value) in &parts.headers {
        // The problem body owns the entity headers; everything else survives.
        if *name == header::CONTENT_TYPE || *name == header::CONTENT_LENGTH {
            continue;
        }
        response.headers_mut().append(name, value.clone());
    }
    response
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::StatusCode;

    fn response(status: StatusCode, content_type: Option<&str>) -> Response {
        let mut builder = http::Response::builder().status(status);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn problem_responses_are_recognized_by_content_type() {
        assert!(is_problem_response(&response(
            StatusCode::NOT_FOUND,
            Some("application/problem+json")
        )));
        assert!(is_problem_response(&response(
            StatusCode::NOT_FOUND,
            Some("application/problem+json; charset=utf-8")
        )));
        assert!(!is_problem_response(&response(
            StatusCode::NOT_FOUND,
            Some("application/json")
        )));
        assert!(!is_problem_response(&response(StatusCode::NOT_FOUND, None)));
    }
}
