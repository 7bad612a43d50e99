//! HTTP API server for the web front end.
//!
//! Provides endpoints for PDF upload and management, streamed tutoring
//! answers, quizzes and lecture generation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::SmartLearnError;
use crate::ingest::validate_pdf_name;
use crate::orchestrator::Orchestrator;
use crate::quiz::QuizRecord;
use crate::storage::Bucket;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Largest accepted request body.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.ensure_buckets().await?;

    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("SmartLearn API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Upload PDF", "POST   /upload_pdf");
    Output::kv("Job status", "GET    /task_status/{id}");
    Output::kv("List PDFs", "GET    /list_pdfs");
    Output::kv("Download PDF", "GET    /download/{filename}");
    Output::kv("Delete PDF", "DELETE /delete_pdf/{filename}");
    Output::kv("Tutor (SSE)", "POST   /ai_tutor_query");
    Output::kv("Tutor (text)", "POST   /ai_tutor_query/plain");
    Output::kv("Quiz", "POST   /gen_quizz");
    Output::kv("Lecture", "POST   /generate_lecture");
    Output::kv("List videos", "GET    /list_videos");
    Output::kv("Download video", "GET    /download_video/{filename}");
    Output::kv("Lecture artifacts", "GET|DELETE /lectures/{folder}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.orchestrator.settings().server.allowed_origin);

    Router::new()
        .route("/health", get(health))
        .route("/upload_pdf", post(upload_pdf))
        .route("/task_status/{id}", get(task_status))
        .route("/download/{filename}", get(download_pdf))
        .route("/list_pdfs", get(list_pdfs))
        .route("/delete_pdf/{filename}", axum::routing::delete(delete_pdf))
        .route("/ai_tutor_query", post(tutor_query_sse))
        .route("/ai_tutor_query/plain", post(tutor_query_plain))
        .route("/gen_quizz", post(gen_quiz))
        .route("/generate_lecture", post(generate_lecture))
        .route("/list_videos", get(list_videos))
        .route("/download_video/{filename}", get(download_video))
        .route("/lectures/{folder}", get(lecture_artifacts).delete(delete_lecture))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!("Invalid allowed_origin {:?}, allowing any origin", allowed_origin);
            layer.allow_origin(Any)
        }
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TutorQuery {
    question: String,
}

#[derive(Serialize)]
struct TaskAccepted {
    task_id: Uuid,
    message: String,
}

#[derive(Serialize)]
struct PdfListResponse {
    pdf_files: Vec<String>,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A library error rendered as a JSON body with a matching status.
struct ApiError(SmartLearnError);

impl From<SmartLearnError> for ApiError {
    fn from(e: SmartLearnError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SmartLearnError::NotFound(_) => StatusCode::NOT_FOUND,
            SmartLearnError::AlreadyExists(_) => StatusCode::CONFLICT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Read the uploaded PDF from a multipart body.
async fn read_pdf_upload(mut multipart: Multipart) -> ApiResult<(String, Vec<u8>)> {
    let bad_request = |msg: String| ApiError(SmartLearnError::InvalidInput(msg));

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed upload: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if let Some(content_type) = field.content_type() {
            if content_type != "application/pdf" && content_type != "application/octet-stream" {
                return Err(bad_request(format!("Only PDF files are accepted, got {}", content_type)));
            }
        }
        validate_pdf_name(&filename)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Malformed upload: {}", e)))?;
        return Ok((filename, data.to_vec()));
    }

    Err(bad_request("No file in upload".to_string()))
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload_pdf(State(state): State<Arc<AppState>>, multipart: Multipart) -> ApiResult<Json<TaskAccepted>> {
    let (filename, data) = read_pdf_upload(multipart).await?;

    let objects = state.orchestrator.objects();
    if state.orchestrator.ingestor().is_in_flight(&filename) || objects.exists(Bucket::Files, &filename).await? {
        return Err(SmartLearnError::AlreadyExists(filename).into());
    }

    info!("Queued upload of {}", filename);
    let task_id = state.orchestrator.submit_ingest(data, filename).await;
    Ok(Json(TaskAccepted {
        task_id,
        message: "File is being uploaded".to_string(),
    }))
}

async fn task_status(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Response> {
    match state.orchestrator.jobs().status(id).await {
        Some(job) => Ok(Json(job).into_response()),
        None => Err(SmartLearnError::NotFound(format!("Task {}", id)).into()),
    }
}

async fn download_pdf(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> ApiResult<Response> {
    let bytes = state.orchestrator.ingestor().download(&filename).await?;
    Ok(attachment(bytes, "application/pdf", &filename))
}

async fn list_pdfs(State(state): State<Arc<AppState>>) -> ApiResult<Json<PdfListResponse>> {
    let pdf_files = state
        .orchestrator
        .ingestor()
        .list()
        .await?
        .into_iter()
        .filter(|name| name.to_lowercase().ends_with(".pdf"))
        .collect();
    Ok(Json(PdfListResponse { pdf_files }))
}

async fn delete_pdf(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> ApiResult<Json<MessageResponse>> {
    let removed = state.orchestrator.ingestor().delete(&filename).await?;
    Ok(Json(MessageResponse {
        message: format!(
            "Deleted {} and {} indexed chunks",
            removed.filename, removed.chunks_deleted
        ),
    }))
}

async fn tutor_query_sse(State(state): State<Arc<AppState>>, Json(query): Json<TutorQuery>) -> impl IntoResponse {
    let events = state
        .orchestrator
        .answer()
        .answer(&query.question)
        .map(|chunk| Ok::<_, Infallible>(Event::default().data(chunk)));

    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(events),
    )
}

async fn tutor_query_plain(State(state): State<Arc<AppState>>, Json(query): Json<TutorQuery>) -> impl IntoResponse {
    let chunks = state
        .orchestrator
        .answer()
        .answer(&query.question)
        .map(Ok::<_, Infallible>);

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
}

async fn gen_quiz(State(state): State<Arc<AppState>>, Json(filenames): Json<Vec<String>>) -> ApiResult<Json<Vec<QuizRecord>>> {
    if filenames.is_empty() {
        return Err(SmartLearnError::InvalidInput("No filenames given".to_string()).into());
    }
    let records = state.orchestrator.quiz().generate(&filenames).await?;
    Ok(Json(records))
}

async fn generate_lecture(State(state): State<Arc<AppState>>, multipart: Multipart) -> ApiResult<Json<TaskAccepted>> {
    let (filename, data) = read_pdf_upload(multipart).await?;

    info!("Queued lecture for {}", filename);
    let task_id = state.orchestrator.submit_lecture(data, filename).await;
    Ok(Json(TaskAccepted {
        task_id,
        message: "Lecture is being generated".to_string(),
    }))
}

async fn list_videos(State(state): State<Arc<AppState>>) -> ApiResult<Json<VideoListResponse>> {
    let videos = state
        .orchestrator
        .lecture()
        .list_videos()
        .await?
        .into_iter()
        .filter(|name| name.ends_with(".mp4"))
        .collect();
    Ok(Json(VideoListResponse { videos }))
}

async fn download_video(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> ApiResult<Response> {
    let bytes = state.orchestrator.lecture().download_video(&filename).await?;
    Ok(attachment(bytes, "video/mp4", &filename))
}

async fn lecture_artifacts(State(state): State<Arc<AppState>>, Path(folder): Path<String>) -> ApiResult<Response> {
    let artifacts = state.orchestrator.lecture().artifacts(&folder).await?;
    if artifacts.is_empty() {
        return Err(SmartLearnError::NotFound(format!("Lecture {}", folder)).into());
    }
    Ok(Json(artifacts).into_response())
}

async fn delete_lecture(State(state): State<Arc<AppState>>, Path(folder): Path<String>) -> ApiResult<Response> {
    let report = state.orchestrator.lecture().delete(&folder).await?;
    Ok(Json(report).into_response())
}
