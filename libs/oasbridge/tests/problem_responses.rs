#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Error shaping through the finalized router
//!
//! Every error response leaving the facade must be an RFC 9457 problem
//! document: structured errors cross verbatim, plain error responses are
//! reshaped, server error bodies are scrubbed unless debug mode is on.

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Path;
use axum::response::IntoResponse;
use http::{Request, StatusCode, header};
use oasbridge::{
    Api, ApiError, ErrorSource, Problem, RegisterOptions, RegistryResolver, normalize,
};
use tempfile::NamedTempFile;
use tower::ServiceExt; // for oneshot

const ERROR_LAB: &str = r#"
openapi: "3.0.0"
info:
  title: Error Lab
  version: "1.0.0"
servers:
  - url: /api
paths:
  /classified:
    get:
      operationId: classified
      responses:
        "200":
          description: ok
        "404":
          description: missing
  /broken:
    get:
      operationId: broken
      responses:
        "500":
          description: boom
  /conflicted:
    get:
      operationId: conflicted
      responses:
        "409":
          description: conflict
  /failing:
    get:
      operationId: failing
      responses:
        "500":
          description: boom
"#;

/// Facade with one registration of the error-lab document.
fn error_lab(debug: bool) -> axum::Router {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(ERROR_LAB.as_bytes()).unwrap();

    let resolver = Arc::new(
        RegistryResolver::new()
            .route("classified", || async {
                (
                    StatusCode::NOT_FOUND,
                    [("x-request-id", "abc123")],
                    "pet 42 went missing",
                )
            })
            .route("broken", || async {
                (StatusCode::INTERNAL_SERVER_ERROR, "password=hunter2")
            })
            .route("conflicted", || async {
                ApiError::new(StatusCode::CONFLICT, "Pet Conflict")
                    .with_detail("pet 42 already exists")
                    .with_type("https://errors.example.com/pet-conflict")
                    .with_instance("/pets/42")
                    .with_ext("pet_id", 42)
                    .with_header("x-conflict-id", "c-1")
            })
            .route("failing", || async {
                let err = anyhow::anyhow!("database exploded: password=hunter2");
                normalize(ErrorSource::from(err)).into_response()
            }),
    );

    let mut api = Api::new();
    api.register(
        file.path(),
        RegisterOptions::new().with_resolver(resolver).with_debug(debug),
    )
    .unwrap();
    api.into_router()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Helper to extract a Problem from a response body.
async fn extract_problem(response: axum::response::Response) -> Problem {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&body).expect("Failed to parse problem JSON")
}

#[tokio::test]
async fn a_bare_facade_answers_problem_documents() {
    let router = Api::new().into_router();

    let response = router.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );

    let problem = extract_problem(response).await;
    assert_eq!(problem.status, StatusCode::NOT_FOUND);
    assert_eq!(problem.title, "Not Found");
    assert_eq!(problem.detail.as_deref(), Some("no route for /nope"));
    assert_eq!(problem.instance.as_deref(), Some("/nope"));
}

const STATUS_RANGE: &str = r#"
openapi: "3.0.0"
info:
  title: Status Range
  version: "1.0.0"
paths:
  /status/{code}:
    get:
      operationId: echoStatus
      parameters:
        - name: code
          in: path
          required: true
          schema:
            type: integer
      responses:
        "4XX":
          description: client error
        "5XX":
          description: server error
"#;

#[tokio::test]
async fn every_standard_error_code_answers_problem_shaped() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(STATUS_RANGE.as_bytes()).unwrap();

    let resolver = Arc::new(RegistryResolver::new().route(
        "echoStatus",
        |Path(code): Path<u16>| async move { StatusCode::from_u16(code).unwrap() },
    ));
    let mut api = Api::new();
    api.register(file.path(), RegisterOptions::new().with_resolver(resolver))
        .unwrap();
    let router = api.into_router();

    for def in oasbridge_errors::catalog::DEFINITIONS {
        let response = router
            .clone()
            .oneshot(get(&format!("/status/{}", def.status)))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), def.status);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );

        let problem = extract_problem(response).await;
        assert_eq!(problem.status.as_u16(), def.status);
        assert!(!problem.title.is_empty());
    }
}

#[tokio::test]
async fn plain_error_responses_are_reshaped() {
    let response = error_lab(false)
        .oneshot(get("/api/classified"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    // headers from the original response survive the reshaping
    assert_eq!(response.headers().get("x-request-id").unwrap(), "abc123");

    let problem = extract_problem(response).await;
    assert_eq!(problem.title, "Not Found");
    assert_eq!(problem.detail.as_deref(), Some("pet 42 went missing"));
    assert_eq!(problem.instance.as_deref(), Some("/api/classified"));
}

#[tokio::test]
async fn server_error_bodies_are_scrubbed() {
    let response = error_lab(false).oneshot(get("/api/broken")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = std::str::from_utf8(&body).unwrap();
    assert!(!text.contains("hunter2"));

    let problem: Problem = serde_json::from_str(text).unwrap();
    assert_eq!(problem.title, "Internal Server Error");
}

#[tokio::test]
async fn debug_mode_reveals_server_error_bodies() {
    let response = error_lab(true).oneshot(get("/api/broken")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let problem = extract_problem(response).await;
    assert_eq!(problem.detail.as_deref(), Some("password=hunter2"));
}

#[tokio::test]
async fn structured_errors_cross_the_stack_verbatim() {
    let response = error_lab(false)
        .oneshot(get("/api/conflicted"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers().get("x-conflict-id").unwrap(), "c-1");

    let problem = extract_problem(response).await;
    assert_eq!(problem.status, StatusCode::CONFLICT);
    assert_eq!(problem.title, "Pet Conflict");
    assert_eq!(problem.detail.as_deref(), Some("pet 42 already exists"));
    assert_eq!(
        problem.type_url.as_deref(),
        Some("https://errors.example.com/pet-conflict")
    );
    assert_eq!(problem.instance.as_deref(), Some("/pets/42"));
    assert_eq!(problem.ext["pet_id"], 42);
}

#[tokio::test]
async fn unknown_failures_never_leak() {
    for debug in [false, true] {
        let response = error_lab(debug).oneshot(get("/api/failing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(!text.contains("database exploded"));

        let problem: Problem = serde_json::from_str(text).unwrap();
        assert_eq!(problem.title, "Internal Server Error");
    }
}

#[tokio::test]
async fn method_not_allowed_is_a_problem() {
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/classified")
        .body(Body::empty())
        .unwrap();
    let response = error_lab(false).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET");

    let problem = extract_problem(response).await;
    assert_eq!(problem.title, "Method Not Allowed");
}
