use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::ingestion::UploadedPdf;
use crate::service::SourceRef;
use crate::types::RagError;

use super::AppState;

pub(super) async fn index_page() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub(super) struct SessionResponse {
    session_id: String,
}

pub(super) async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let context = state.sessions.create_session().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: context.session_id,
        }),
    )
}

#[derive(Serialize)]
pub(super) struct UploadResponse {
    session_id: String,
    files: usize,
    pages: usize,
    chunks: usize,
    message: &'static str,
}

pub(super) async fn upload_documents(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let session = state.sessions.resolve(&session_id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request(format!("malformed multipart body: {err}"))
    })? {
        // Only file parts count; other form fields are ignored.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|err| {
            ApiError::bad_request(format!("failed to read uploaded file: {err}"))
        })?;
        files.push(UploadedPdf::new(file_name, bytes.to_vec()));
    }

    let summary = state.service.index_documents(&session, files).await?;
    Ok(Json(UploadResponse {
        session_id: session.session_id,
        files: summary.files,
        pages: summary.pages,
        chunks: summary.chunks,
        message: "PDFs indexed successfully",
    }))
}

#[derive(Deserialize)]
pub(super) struct AskRequest {
    question: String,
}

#[derive(Serialize)]
pub(super) struct AskResponse {
    session_id: String,
    answer: String,
    sources: Vec<SourceRef>,
}

pub(super) async fn ask(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question must not be empty"));
    }
    let session = state.sessions.resolve(&session_id).await?;
    let answer = state.service.answer(&session, &request.question).await?;
    Ok(Json(AskResponse {
        session_id: session.session_id,
        answer: answer.text,
        sources: answer.sources,
    }))
}

/// JSON error envelope carrying the status for each failure class.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::NoFiles | RagError::PdfExtraction { .. } => StatusCode::BAD_REQUEST,
            RagError::UnknownSession(_) | RagError::IndexNotFound { .. } => StatusCode::NOT_FOUND,
            RagError::Embedding(_) | RagError::Generation(_) | RagError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            RagError::Storage(_) | RagError::Config(_) | RagError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &err {
            RagError::NoFiles => "Please upload at least one PDF".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        } else {
            warn!(error = %err, "request rejected");
        }
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
