//! HTTP surface.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | index of converted notebooks |
//! | `GET /notebook/{name}/` | one notebook page, 404 page if it has no record |
//! | `POST /api/list-files/` | form `folder_path` → notebooks in that folder |
//! | `POST /api/open-notebook/` | form `file_path` → convert that notebook now |
//! | `GET /static/...` | images and other files under the static root |
//!
//! The two API endpoints always answer HTTP 200 with a JSON body carrying a
//! `success` flag; failures come back as `{"success": false, "error": ...}`.
//! Filesystem work runs on the blocking pool and the request waits for it.
//! Requests whose `Host` is not in `server.allowed_hosts` get a 400.

use crate::catalog::{self, CatalogError};
use crate::config::{SiteConfig, SitePaths};
use crate::convert::{self, ConvertError};
use crate::listing::{self, FolderListing, ListingError};
use crate::render;
use crate::summary::render_markdown;
use axum::{
    Json, Router,
    extract::{Form, Path as UrlPath, Request, State, rejection::FormRejection},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub paths: Arc<SitePaths>,
}

impl AppState {
    /// Relative entries in `config.paths` are resolved against `base`.
    pub fn new(config: SiteConfig, base: &Path) -> Self {
        let paths = config.paths.resolve(base);
        Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
        }
    }
}

#[derive(Error, Debug)]
enum HandlerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

async fn run_blocking<T, E, F>(work: F) -> Result<T, HandlerError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<HandlerError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?.map_err(Into::into)
}

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.paths.static_dir.clone());
    Router::new()
        .route("/", get(index))
        .route("/notebook/{name}", get(notebook_page))
        .route("/notebook/{name}/", get(notebook_page))
        .route("/api/list-files/", post(list_files))
        .route("/api/open-notebook/", post(open_notebook))
        .nest_service("/static", static_files)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), check_host))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `server.bind` and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "serving notebook site");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

fn request_host(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

async fn check_host(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let allowed =
        request_host(&request).is_some_and(|host| state.config.server.host_allowed(host));
    if !allowed {
        warn!(
            host = request_host(&request).unwrap_or_default(),
            "rejected request for disallowed host"
        );
        return (StatusCode::BAD_REQUEST, "Bad Request (invalid host)").into_response();
    }
    next.run(request).await
}

// ============================================================================
// Pages
// ============================================================================

async fn index(State(state): State<AppState>) -> Response {
    let paths = state.paths.clone();
    let prefixes = state.config.site.index_prefixes.clone();
    match run_blocking(move || catalog::list_entries(&paths, &prefixes)).await {
        Ok(entries) => {
            Html(render::render_index(&state.config.site.title, &entries).into_string())
                .into_response()
        }
        Err(e) => server_error(&state, &e),
    }
}

async fn notebook_page(State(state): State<AppState>, UrlPath(name): UrlPath<String>) -> Response {
    let paths = state.paths.clone();
    let lookup = name.clone();
    let page = run_blocking(move || catalog::load_page(&paths, &lookup, Some(render_markdown)));
    match page.await {
        Ok(page) => Html(render::render_notebook(&state.config.site.title, &page).into_string())
            .into_response(),
        Err(HandlerError::Catalog(CatalogError::NotFound(_))) => {
            not_found_page(&state, &format!("Notebook {name}"))
        }
        Err(e) => server_error(&state, &e),
    }
}

async fn not_found(State(state): State<AppState>, request: Request) -> Response {
    not_found_page(&state, &format!("Page {}", request.uri().path()))
}

fn not_found_page(state: &AppState, what: &str) -> Response {
    let body = render::render_not_found(&state.config.site.title, what).into_string();
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

fn server_error(state: &AppState, error: &HandlerError) -> Response {
    warn!(error = %error, "request failed");
    let detail = error.to_string();
    let detail = state.config.server.debug.then_some(detail.as_str());
    let body = render::render_error(&state.config.site.title, detail).into_string();
    (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
}

// ============================================================================
// JSON API
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ListFilesForm {
    #[serde(default)]
    folder_path: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenNotebookForm {
    #[serde(default)]
    file_path: String,
}

#[derive(Serialize)]
struct ApiFailure {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct ListFilesResponse {
    success: bool,
    #[serde(flatten)]
    listing: FolderListing,
}

#[derive(Serialize)]
struct OpenNotebookResponse {
    success: bool,
    slug: String,
    message: String,
}

fn api_failure(error: &HandlerError) -> Response {
    Json(ApiFailure {
        success: false,
        error: error.to_string(),
    })
    .into_response()
}

async fn list_files(form: Result<Form<ListFilesForm>, FormRejection>) -> Response {
    let folder = form.map(|Form(f)| f.folder_path).unwrap_or_default();
    let folder = folder.trim().to_string();
    match run_blocking(move || listing::list_notebooks(Path::new(&folder))).await {
        Ok(listing) => Json(ListFilesResponse {
            success: true,
            listing,
        })
        .into_response(),
        Err(e) => api_failure(&e),
    }
}

async fn open_notebook(
    State(state): State<AppState>,
    form: Result<Form<OpenNotebookForm>, FormRejection>,
) -> Response {
    let file = form.map(|Form(f)| f.file_path).unwrap_or_default();
    let file = file.trim().to_string();
    let paths = state.paths.clone();
    match run_blocking(move || convert::convert_file(Path::new(&file), &paths)).await {
        Ok(report) => Json(OpenNotebookResponse {
            success: true,
            message: format!(
                "Converted {} ({} items, {} images)",
                report.slug, report.items, report.images
            ),
            slug: report.slug,
        })
        .into_response(),
        Err(e) => {
            if let HandlerError::Convert(convert_error) = &e {
                warn!(error = %e, kind = ?convert_error.kind(), "open-notebook failed");
            }
            api_failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::{self, DisplayItem};
    use axum::body::{Body, Bytes, to_bytes};
    use axum::http::Request as HttpRequest;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state_in(tmp: &TempDir) -> AppState {
        AppState::new(config_in(tmp.path()), tmp.path())
    }

    fn get_request(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(uri)
            .header(header::HOST, "localhost:8000")
            .body(Body::empty())
            .unwrap()
    }

    fn form_request(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send_raw(state: &AppState, request: HttpRequest<Body>) -> (StatusCode, Bytes) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes)
    }

    async fn send(state: &AppState, request: HttpRequest<Body>) -> (StatusCode, String) {
        let (status, bytes) = send_raw(state, request).await;
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn send_json(state: &AppState, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let (status, body) = send(state, request).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn index_lists_converted_notebooks() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        types::write_record(&state.paths.records_dir, "05_Model", &[]).unwrap();

        let (status, body) = send(&state, get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/notebook/05_Model/"));
        assert!(body.contains("05 Model"));
    }

    #[tokio::test]
    async fn notebook_page_renders_record() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let items = vec![
            DisplayItem::Markdown {
                content: "# Model\n\nPredicts prices.\n\n## Training".to_string(),
            },
            DisplayItem::Text {
                content: "epoch 1".to_string(),
            },
        ];
        types::write_record(&state.paths.records_dir, "05_Model", &items).unwrap();

        let (status, body) = send(&state, get_request("/notebook/05_Model/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Predicts prices."));
        assert!(body.contains("<li>Training</li>"));
        assert!(body.contains("epoch 1"));
    }

    #[tokio::test]
    async fn missing_notebook_is_404() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);

        let (status, body) = send(&state, get_request("/notebook/ghost/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Notebook ghost does not exist."));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let tmp = TempDir::new().unwrap();
        let (status, _) = send(&state_in(&tmp), get_request("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_files_nonexistent_folder_is_json_failure() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let body = format!("folder_path={}", tmp.path().join("missing").display());

        let (status, json) = send_json(&state, form_request("/api/list-files/", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Folder not found");
    }

    #[tokio::test]
    async fn list_files_blank_folder_is_json_failure() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);

        let (status, json) =
            send_json(&state, form_request("/api/list-files/", "folder_path=++")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);

        let (status, json) = send_json(&state, form_request("/api/list-files/", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn list_files_returns_notebooks() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        write_notebook(&state.paths.notebooks_dir, "05_Model.ipynb", &[]);
        fs::write(state.paths.notebooks_dir.join("readme.md"), "x").unwrap();
        let body = format!("folder_path={}", state.paths.notebooks_dir.display());

        let (status, json) = send_json(&state, form_request("/api/list-files/", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let files = json["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["name"], "05_Model.ipynb");
        assert_eq!(files[0]["slug"], "05_Model");
        assert!(json["folder"].as_str().is_some());
    }

    #[tokio::test]
    async fn open_notebook_rejects_other_extensions() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let txt = tmp.path().join("notes.txt");
        fs::write(&txt, "hello").unwrap();
        let body = format!("file_path={}", txt.display());

        let (status, json) = send_json(&state, form_request("/api/open-notebook/", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains(".ipynb"));
        assert!(!state.paths.records_dir.exists());
    }

    #[tokio::test]
    async fn open_notebook_missing_file_is_json_failure() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let body = format!("file_path={}", tmp.path().join("ghost.ipynb").display());

        let (status, json) = send_json(&state, form_request("/api/open-notebook/", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("File not found"));
    }

    #[tokio::test]
    async fn open_notebook_converts_and_reports_slug() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let source = write_notebook(
            &state.paths.notebooks_dir,
            "07_Clusters.ipynb",
            &[markdown_cell("# Clusters"), code_cell(&[png_output()])],
        );
        let body = format!("file_path={}", source.display());

        let (status, json) = send_json(&state, form_request("/api/open-notebook/", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["slug"], "07_Clusters");
        assert!(types::record_path(&state.paths.records_dir, "07_Clusters").is_file());

        let (status, image) = send_raw(
            &state,
            get_request("/static/notebooks/07_Clusters/img_1.png"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(image.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[tokio::test]
    async fn disallowed_host_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let state = state_in(&tmp);
        let request = HttpRequest::builder()
            .uri("/")
            .header(header::HOST, "evil.example.com")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wildcard_host_allows_everything() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(tmp.path());
        config.server.allowed_hosts = vec!["*".to_string()];
        let state = AppState::new(config, tmp.path());
        let request = HttpRequest::builder()
            .uri("/")
            .header(header::HOST, "anything.test")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
