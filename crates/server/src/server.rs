//! HTTP boundary: file upload and YAML config reading.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use scanline_core::{sha256_hex, ServerConfig};

use crate::error::AppError;

const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

pub struct AppState {
    pub upload_dir: PathBuf,
    pub config_root: PathBuf,
}

impl AppState {
    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self {
            upload_dir: cfg.upload_dir.clone(),
            config_root: cfg.config_root.clone(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub bytes: usize,
    pub sha256: String,
}

#[derive(Debug, Serialize)]
pub struct ReadYamlResponse {
    pub data: serde_json::Value,
    pub filename: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/file/upload", post(upload_handler))
        .route("/read/yaml/{*path}", post(read_yaml_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(cfg: &ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(cfg));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("Server listening on http://{}", addr);
    info!("  POST /file/upload        - store an uploaded file");
    info!("  POST /read/yaml/{{path}}   - parse a YAML file under the config root");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Store the multipart field `file` under the upload directory, keyed by its
/// filename. An existing file with the same name is overwritten.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let request_id = Uuid::new_v4();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("upload has no filename".to_string()))?;
        let filename = sanitize_filename(&raw_name)?;
        let data = field.bytes().await?;

        tokio::fs::create_dir_all(&state.upload_dir).await?;
        let dest = state.upload_dir.join(&filename);
        tokio::fs::write(&dest, &data).await?;

        info!(request_id = %request_id, dest = %dest.display(), bytes = data.len(), "upload stored");
        return Ok(Json(UploadResponse {
            filename,
            bytes: data.len(),
            sha256: sha256_hex(&data),
        }));
    }

    Err(AppError::BadRequest("multipart field `file` is required".to_string()))
}

async fn read_yaml_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(fname): UrlPath<String>,
) -> Result<Json<ReadYamlResponse>, AppError> {
    let path = resolve_under(&state.config_root, &fname)?;
    let data = tokio::task::spawn_blocking(move || scanline_core::config::read_yaml_value(&path))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(ReadYamlResponse { data, filename: fname }))
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_filename(raw: &str) -> Result<String, AppError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(AppError::BadRequest(format!("invalid filename: {raw:?}")));
    }
    Ok(name.to_string())
}

/// Join a relative path onto `root`, refusing anything that could escape it.
fn resolve_under(root: &Path, rel: &str) -> Result<PathBuf, AppError> {
    let rel_path = Path::new(rel);
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(AppError::BadRequest(format!("path must stay under the config root: {rel}"))),
        }
    }
    Ok(root.join(rel_path))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "scanline-test-boundary";

    fn state(root: &Path) -> Arc<AppState> {
        Arc::new(AppState {
            upload_dir: root.join("uploads"),
            config_root: root.to_path_buf(),
        })
    }

    fn multipart_request(field: &str, filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/file/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn upload_stores_file_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(multipart_request("file", "scan.txt", "hello"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["filename"], "scan.txt");
        assert_eq!(body["bytes"], 5);
        assert_eq!(body["sha256"], sha256_hex(b"hello"));
        let stored = std::fs::read_to_string(dir.path().join("uploads").join("scan.txt")).unwrap();
        assert_eq!(stored, "hello");
    }

    #[tokio::test]
    async fn upload_strips_directory_components() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(multipart_request("file", "../../evil.txt", "x"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(dir.path().join("uploads").join("evil.txt").exists());
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(multipart_request("other", "a.txt", "x"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_yaml_returns_parsed_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "tesseract:\n  config_string:\n    psm: 3\n").unwrap();

        let resp = router(state(dir.path()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/read/yaml/config.yaml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["filename"], "config.yaml");
        assert_eq!(body["data"]["tesseract"]["config_string"]["psm"], 3);
    }

    #[tokio::test]
    async fn read_yaml_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/read/yaml/absent.yaml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn read_yaml_refuses_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let resp = router(state(dir.path()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/read/yaml/../secret.yaml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn sanitize_keeps_final_component() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("a/b/c.png").unwrap(), "c.png");
        assert_eq!(sanitize_filename("C:\\scans\\p1.tif").unwrap(), "p1.tif");
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("").is_err());
    }

    #[test]
    fn resolve_rejects_escapes() {
        let root = Path::new("/srv/conf");
        assert_eq!(resolve_under(root, "a/b.yaml").unwrap(), PathBuf::from("/srv/conf/a/b.yaml"));
        assert!(resolve_under(root, "../x.yaml").is_err());
        assert!(resolve_under(root, "/etc/passwd").is_err());
    }
}
