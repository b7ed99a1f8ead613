//! HTTP surface for the legacy `.doc` decoder.
//!
//! `POST /api/extract-doc` takes a multipart upload in the `file` field and
//! always answers with the `{success, content, error}` envelope. Validation
//! failures are 400, every other failure is 500.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

use docsieve_core::{
    DocsieveConfig, ErrorKind, ExtractError, ExtractionResult, LEGACY_SUFFIXES, Result,
    SourceDocument, ValidationError,
};
use docsieve_legacy::LegacyEndpoint;

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    endpoint: LegacyEndpoint,
    max_upload_bytes: usize,
}

/// Build the application router.
pub fn router(config: &DocsieveConfig) -> Router {
    let state = AppState {
        endpoint: LegacyEndpoint::new(config.limits.clone()),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/extract-doc", post(extract_doc))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "docsieve",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn extract_doc(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<ExtractionResult>) {
    let missing = || ExtractError::from(ValidationError::MissingFile { supported: LEGACY_SUFFIXES });

    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => {
            warn!("Rejected upload: {}", rejection);
            return respond(Err(missing()));
        }
    };

    let outcome = match upload {
        Ok(Some(document)) => {
            debug!("Received {} ({} bytes)", document.file_name(), document.len());
            let endpoint = state.endpoint.clone();
            tokio::task::spawn_blocking(move || endpoint.decode(&document))
                .await
                .unwrap_or_else(|e| Err(ExtractError::Internal(format!("decoder task failed: {}", e))))
        }
        Ok(None) => Err(missing()),
        Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Upload over {} bytes: {}", state.max_upload_bytes, err);
            // The exact size is unknown once the body limit trips.
            Err(ValidationError::TooLarge {
                size: state.max_upload_bytes.saturating_add(1),
                limit: state.max_upload_bytes,
            }
            .into())
        }
        Err(err) => {
            warn!("Failed to read multipart field: {}", err);
            Err(missing())
        }
    };

    respond(outcome)
}

/// The first `file` field as a document. Other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> std::result::Result<Option<SourceDocument>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok(Some(SourceDocument::new(data.to_vec(), name)));
    }
    Ok(None)
}

fn respond(outcome: Result<String>) -> (StatusCode, Json<ExtractionResult>) {
    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(err) if err.kind() == ErrorKind::Validation => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ExtractionResult::from_outcome(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use docsieve_legacy::fixtures::{FLAG_ENCRYPTED, word_document};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsieve-test-boundary";

    fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/extract-doc")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, ExtractionResult) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_extracts_legacy_document() {
        let doc = word_document("Dear committee,\rThank you.\r", 0, true);
        let app = router(&DocsieveConfig::default());

        let (status, result) = send(app, upload(multipart_body("file", "Essay.DOC", &doc))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result, ExtractionResult::success("Dear committee,\nThank you."));
    }

    #[tokio::test]
    async fn test_other_suffix_is_bad_request() {
        let app = router(&DocsieveConfig::default());

        let (status, result) = send(app, upload(multipart_body("file", "essay.docx", b"PK"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Unsupported file type. Please upload a .doc file.")
        );
    }

    #[tokio::test]
    async fn test_missing_file_field_is_bad_request() {
        let app = router(&DocsieveConfig::default());

        let (status, result) = send(app, upload(multipart_body("attachment", "a.doc", b"x"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            result.error.as_deref(),
            Some("No file was provided. Please upload a .doc file.")
        );
    }

    #[tokio::test]
    async fn test_non_multipart_request_is_bad_request() {
        let app = router(&DocsieveConfig::default());
        let request = Request::builder()
            .method("POST")
            .uri("/api/extract-doc")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, result) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_decoder_failures_are_server_errors() {
        let app = router(&DocsieveConfig::default());
        let (status, result) = send(app, upload(multipart_body("file", "a.doc", b"not ole"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.content, "");

        let app = router(&DocsieveConfig::default());
        let locked = word_document("secret\r", FLAG_ENCRYPTED, true);
        let (status, result) = send(app, upload(multipart_body("file", "a.doc", &locked))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(result.error.unwrap().contains("password protected"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_bad_request() {
        let mut config = DocsieveConfig::default();
        config.server.max_upload_bytes = 256;
        let app = router(&config);

        let doc = word_document("too big\r", 0, true);
        let (status, result) = send(app, upload(multipart_body("file", "a.doc", &doc))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            result.error.as_deref(),
            Some("The file is too large. Please upload a file smaller than 256 bytes.")
        );
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(&DocsieveConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
