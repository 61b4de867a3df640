//! Note service routes.
//!
//! # Responsibility
//! - `GET /` HTML list, `POST /add` form submit, `GET /api/notes` JSON list.
//! - Run blocking store calls off the async workers.
//!
//! # Invariants
//! - `POST /add` answers `302 Location: /` for every submission, blank or not,
//!   unless the store itself fails.
//! - Both list views come from the same `list_notes` call shape and order.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use log::{debug, info};
use notebox_core::{Note, NoteService, NoteServiceError};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::AppError;
use crate::render;
use crate::state::{AppState, SharedStore};

/// Form field read by `POST /add`.
pub const TEXT_FIELD: &str = "text";

/// Creates the note service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add_note))
        .route("/api/notes", get(api_notes))
        .route("/static/style.css", get(stylesheet))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let notes = with_service(&state, |service| service.list_notes()).await??;
    Ok(Html(render::index_page(&notes)))
}

async fn add_note(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, AppError> {
    let text = match form {
        Ok(Form(fields)) => first_text(fields),
        Err(rejection) => {
            debug!(
                "event=note_add module=http status=ignored reason=unreadable_form error={}",
                rejection
            );
            String::new()
        }
    };

    match with_service(&state, move |service| service.add_note(&text)).await? {
        Ok(note) => info!("event=note_add module=http status=ok id={}", note.id),
        // Blank submissions are dropped without telling the client.
        Err(NoteServiceError::Validation(_)) => {}
        Err(err) => return Err(err.into()),
    }

    Ok(redirect_home())
}

async fn api_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>, AppError> {
    let notes = with_service(&state, |service| service.list_notes()).await??;
    Ok(Json(notes))
}

async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        render::STYLESHEET,
    )
}

/// First `text` value, like a form lookup that tolerates repeated keys.
fn first_text(fields: Vec<(String, String)>) -> String {
    fields
        .into_iter()
        .find_map(|(name, value)| (name == TEXT_FIELD).then_some(value))
        .unwrap_or_default()
}

fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// Runs `op` on the blocking pool with a clone of the service.
///
/// The outer error is a join failure, the inner one is the service result.
async fn with_service<T, F>(
    state: &AppState,
    op: F,
) -> Result<Result<T, NoteServiceError>, AppError>
where
    F: FnOnce(&NoteService<SharedStore>) -> Result<T, NoteServiceError> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|err| AppError::Task(err.to_string()))
}
