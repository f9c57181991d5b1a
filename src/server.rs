//! HTTP API for the progress tracker.
//!
//! `trk serve` exposes one [`Session`] over a small JSON API, so a browser
//! dashboard or a script can read and tick off tasks.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/document` | The raw progress document |
//! | `GET`    | `/catalogue` | The task catalogue |
//! | `GET`    | `/progress` | Ratio report for every level |
//! | `PUT`    | `/tasks/{key}` | Set a task, body `{"done": true}` |
//! | `GET`    | `/notes` | The three note fields |
//! | `PUT`    | `/notes` | Replace the notes |
//! | `POST`   | `/reset` | Request a reset; returns a token |
//! | `POST`   | `/reset/confirm` | Confirm with `{"token": "…"}` |
//! | `DELETE` | `/reset` | Cancel a pending reset |
//!
//! Mutating endpoints return the store's `notices` alongside their result.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unknown_task", "message": "unknown task 'linux_nope'" } }
//! ```
//!
//! Error codes: `unknown_task` (404), `unknown_note_field` (400),
//! `reset_not_requested` (409), `reset_token_mismatch` (403).
//!
//! # Concurrency
//!
//! Every request takes the session lock for its whole duration, including
//! the save, so requests are applied one at a time.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skilltrack_core::{Catalogue, Document, Notes, ProgressReport};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::catalogue::load_catalogue;
use crate::config::Config;
use crate::error::SessionError;
use crate::notice::{Notice, NoticeReporter};
use crate::session::{ResetToken, Session};
use crate::store::ProgressStore;

pub type SharedSession = Arc<Mutex<Session>>;

/// Open a session from `config` and serve it on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config, notices: &dyn NoticeReporter) -> anyhow::Result<()> {
    let catalogue = Arc::new(load_catalogue(config)?);
    let store = ProgressStore::from_config(config)?;
    let (session, loaded) = Session::open(catalogue, store).await;
    notices.report_all(&loaded);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    println!("skilltrack API listening on http://{}", listener.local_addr()?);

    serve(listener, Arc::new(Mutex::new(session))).await
}

/// Serve `session` on an already-bound listener.
pub async fn serve(listener: TcpListener, session: SharedSession) -> anyhow::Result<()> {
    axum::serve(listener, router(session)).await?;
    Ok(())
}

pub fn router(session: SharedSession) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/document", get(handle_document))
        .route("/catalogue", get(handle_catalogue))
        .route("/progress", get(handle_progress))
        .route("/tasks/{key}", put(handle_set_task))
        .route("/notes", get(handle_get_notes).put(handle_put_notes))
        .route("/reset", post(handle_request_reset).delete(handle_cancel_reset))
        .route("/reset/confirm", post(handle_confirm_reset))
        .layer(cors)
        .with_state(session)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let (status, code) = match &err {
            SessionError::UnknownTask(_) => (StatusCode::NOT_FOUND, "unknown_task"),
            SessionError::UnknownNoteField(_) => (StatusCode::BAD_REQUEST, "unknown_note_field"),
            SessionError::ResetNotRequested => (StatusCode::CONFLICT, "reset_not_requested"),
            SessionError::ResetTokenMismatch => (StatusCode::FORBIDDEN, "reset_token_mismatch"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ Read endpoints ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_document(State(session): State<SharedSession>) -> Json<Document> {
    Json(session.lock().await.document().clone())
}

async fn handle_catalogue(State(session): State<SharedSession>) -> Json<Catalogue> {
    Json(session.lock().await.catalogue().clone())
}

async fn handle_progress(State(session): State<SharedSession>) -> Json<ProgressReport> {
    Json(session.lock().await.ratios())
}

async fn handle_get_notes(State(session): State<SharedSession>) -> Json<Notes> {
    Json(session.lock().await.notes().clone())
}

// ============ Mutations ============

#[derive(Deserialize)]
struct TaskUpdate {
    done: bool,
}

#[derive(Serialize)]
struct TaskResponse {
    key: String,
    done: bool,
    overall: f64,
    notices: Vec<Notice>,
}

async fn handle_set_task(
    State(session): State<SharedSession>,
    Path(key): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<TaskResponse>, AppError> {
    let mut session = session.lock().await;
    let notices = session.set_task_state(&key, update.done).await?;
    Ok(Json(TaskResponse {
        done: session.is_complete(&key),
        overall: session.ratios().overall,
        key,
        notices,
    }))
}

#[derive(Serialize)]
struct NotesResponse {
    notes: Notes,
    notices: Vec<Notice>,
}

async fn handle_put_notes(
    State(session): State<SharedSession>,
    Json(notes): Json<Notes>,
) -> Json<NotesResponse> {
    let mut session = session.lock().await;
    let notices = session.set_notes(notes).await;
    Json(NotesResponse {
        notes: session.notes().clone(),
        notices,
    })
}

// ============ Reset ============

#[derive(Serialize)]
struct ResetRequested {
    token: String,
    message: String,
}

async fn handle_request_reset(State(session): State<SharedSession>) -> Json<ResetRequested> {
    let token = session.lock().await.request_reset();
    Json(ResetRequested {
        token: token.as_str().to_string(),
        message: "This deletes all saved progress. POST the token to /reset/confirm to proceed."
            .to_string(),
    })
}

#[derive(Deserialize)]
struct ResetConfirm {
    token: String,
}

#[derive(Serialize)]
struct ResetDone {
    notices: Vec<Notice>,
}

async fn handle_confirm_reset(
    State(session): State<SharedSession>,
    Json(body): Json<ResetConfirm>,
) -> Result<Json<ResetDone>, AppError> {
    let token = ResetToken::from(body.token);
    let notices = session.lock().await.confirm_reset(&token).await?;
    Ok(Json(ResetDone { notices }))
}

#[derive(Serialize)]
struct ResetCancelled {
    cancelled: bool,
}

async fn handle_cancel_reset(State(session): State<SharedSession>) -> Json<ResetCancelled> {
    let mut session = session.lock().await;
    let cancelled = session.reset_pending();
    session.cancel_reset();
    Json(ResetCancelled { cancelled })
}
