//! API route handlers.
//!
//! Every handler locks the shared session, runs one session operation and
//! answers with the resulting [`SessionView`] so the editor can redraw its
//! status line without a second request.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use studio_core::io::BytesSource;
use studio_core::{
    DropError, DropGesture, DroppedItem, ExportFormat, ImportError, ImportReport,
    PersistenceError, SessionView, StudioError,
};
use thiserror::Error;

use crate::AppState;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The import was rejected; the session is in `error`.
    #[error("{error}")]
    Import {
        /// Why the file was rejected.
        error: ImportError,
        /// Session state after the rejection.
        session: Box<SessionView>,
    },

    /// The drop gesture was rejected as a whole.
    #[error(transparent)]
    Drop(#[from] DropError),

    /// The access gate is closed.
    #[error("Password required")]
    Unauthorized,

    /// Durable storage failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Document or engine operation failed.
    #[error(transparent)]
    Studio(#[from] StudioError),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionView>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Import { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Drop(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Studio(StudioError::PageOutOfRange { .. } | StudioError::ElementNotFound(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Studio(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("Request failed with {status}: {self}");
        }
        let body = match self {
            Self::Import { error, session } => ErrorBody {
                error: error.to_string(),
                diagnostics: error.diagnostics(),
                session: Some(*session),
            },
            other => ErrorBody {
                error: other.to_string(),
                diagnostics: Vec::new(),
                session: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// `GET /api/session`
pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.lock().await.view())
}

/// `GET /api/document`
///
/// The current document in its native JSON form.
pub async fn get_document(State(state): State<AppState>) -> Result<Response, ApiError> {
    let json = state.session.lock().await.document().to_json()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

/// `POST /api/document/new`
#[tracing::instrument(name = "new_document", skip(state))]
pub async fn new_document(State(state): State<AppState>) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.create_new_document();
    if let Err(e) = session.persist().await {
        tracing::warn!("New document not persisted: {e}");
    }
    Json(session.view())
}

/// Query of `POST /api/document/import`.
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// File name; its extension selects the format.
    pub name: String,
}

/// Result of a committed import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// What was imported.
    pub report: ImportReport,
    /// Session state after the commit.
    pub session: SessionView,
}

/// `POST /api/document/import?name=<file>`
///
/// The raw file is the request body; `Content-Type` is used as the declared
/// MIME type when the name has no known extension.
#[tracing::instrument(name = "import_document", skip(state, headers, body), fields(name = %query.name, bytes = body.len()))]
pub async fn import_document(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut source = BytesSource::new(query.name, body.to_vec());
    if let Some(mime) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        source = source.with_mime(mime);
    }

    let mut session = state.session.lock().await;
    match session.import_from_source(&source).await {
        Ok(report) => Ok(Json(ImportResponse {
            report,
            session: session.view(),
        })),
        Err(error) => Err(ApiError::Import {
            error,
            session: Box::new(session.view()),
        }),
    }
}

/// One dropped item, as sent by the browser.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropItemBody {
    /// A dropped file with its text contents.
    File {
        /// File name.
        name: String,
        /// Declared MIME type.
        #[serde(default)]
        mime: Option<String>,
        /// File contents.
        content: String,
    },
    /// Dragged text, a link or any other non-file payload.
    Text {
        /// The payload.
        text: String,
    },
}

impl From<DropItemBody> for DroppedItem {
    fn from(item: DropItemBody) -> Self {
        match item {
            DropItemBody::File {
                name,
                mime,
                content,
            } => Self::File {
                name,
                mime,
                bytes: content.into_bytes(),
            },
            DropItemBody::Text { text } => Self::Text(text),
        }
    }
}

/// Body of `POST /api/document/drop`.
#[derive(Debug, Deserialize)]
pub struct DropRequest {
    /// Every item of the gesture, in drop order.
    pub items: Vec<DropItemBody>,
}

/// Outcome of one dropped file.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropFileResult {
    /// The file was committed.
    Imported(ImportReport),
    /// The file was rejected.
    Rejected {
        /// Why.
        error: String,
        /// Details.
        diagnostics: Vec<String>,
    },
}

/// Result of an accepted drop gesture.
#[derive(Debug, Serialize)]
pub struct DropResponse {
    /// One entry per file, in drop order.
    pub results: Vec<DropFileResult>,
    /// Session state after the last file.
    pub session: SessionView,
}

/// `POST /api/document/drop`
#[tracing::instrument(name = "drop_files", skip(state, request), fields(items = request.items.len()))]
pub async fn drop_files(
    State(state): State<AppState>,
    Json(request): Json<DropRequest>,
) -> Result<Json<DropResponse>, ApiError> {
    let gesture = DropGesture::from_items(request.items.into_iter().map(Into::into).collect());

    let mut session = state.session.lock().await;
    let results = session
        .import_drop(gesture)
        .await?
        .into_iter()
        .map(|result| match result {
            Ok(report) => DropFileResult::Imported(report),
            Err(e) => DropFileResult::Rejected {
                error: e.to_string(),
                diagnostics: e.diagnostics(),
            },
        })
        .collect();

    Ok(Json(DropResponse {
        results,
        session: session.view(),
    }))
}

/// Query of `GET /api/document/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `json` (default) or `svg`.
    #[serde(default = "default_export_format")]
    pub format: ExportFormat,
}

fn default_export_format() -> ExportFormat {
    ExportFormat::Json
}

/// `GET /api/document/export?format=json|svg`
#[tracing::instrument(name = "export_document", skip(state))]
pub async fn export_document(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let file = state.session.lock().await.export(query.format)?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.name))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.mime)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// Body of `PUT /api/language`.
#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    /// Language code, e.g. `fr` or `pt-BR`.
    pub language: String,
}

/// `PUT /api/language`
#[tracing::instrument(name = "set_language", skip(state))]
pub async fn set_language(
    State(state): State<AppState>,
    Json(request): Json<LanguageRequest>,
) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.set_language(&request.language);
    if let Err(e) = session.persist().await {
        tracing::warn!("Language not persisted: {e}");
    }
    Json(session.view())
}

/// Body of `PUT /api/page/active`.
#[derive(Debug, Deserialize)]
pub struct ActivePageRequest {
    /// Zero-based page index.
    pub index: usize,
}

/// `PUT /api/page/active`
#[tracing::instrument(name = "set_active_page", skip(state))]
pub async fn set_active_page(
    State(state): State<AppState>,
    Json(request): Json<ActivePageRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let mut session = state.session.lock().await;
    session.set_active_page(request.index)?;
    Ok(Json(session.view()))
}
