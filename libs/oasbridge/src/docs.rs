//! Serving the loaded document and its console UI
//!
//! Both routes are relative to the registration's base path: the document at
//! `/openapi.json` (never cached) and the console UI at the configured path.

use std::sync::Arc;

use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use http::header;
use serde_json::Value;

use crate::options::DocsOptions;

/// Builds the docs routes for one registration.
///
/// `document` is the loaded specification serialized to JSON once; it is
/// served as-is on every request. `spec_url` is the absolute path of the
/// document route (base path included), which the UI page loads.
pub fn docs_routes(document: Value, spec_url: &str, options: &DocsOptions) -> Router {
    let mut router = Router::new();

    if options.serve_spec {
        let document = Arc::new(document);
        router = router.route(
            "/openapi.json",
            get(move || async move {
                ([(header::CACHE_CONTROL, "no-store")], Json(document.as_ref())).into_response()
            }),
        );
    }

    if options.serve_docs {
        let page = console_page(spec_url);
        router = router.route(
            &options.normalized_ui_path(),
            get(move || async move { Html(page) }),
        );
    }

    router
}

/// Minimal console shell: swagger-ui from the CDN pointed at the document.
fn console_page(spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>API console</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##
    )
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn console_page_points_at_the_document() {
        let page = console_page("/v1/openapi.json");
        assert!(page.contains(r#"url: "/v1/openapi.json""#));
        assert!(page.contains(r##"dom_id: "#swagger-ui""##));
    }
}
