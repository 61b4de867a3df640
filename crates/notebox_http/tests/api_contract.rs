use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use notebox_core::{InMemoryNoteStore, Note, NoteStore, SqliteNoteStore, StoreError, StoreResult};
use notebox_http::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(store: Arc<dyn NoteStore>) -> Router {
    create_router(AppState::new(store))
}

fn app() -> Router {
    app_with(Arc::new(InMemoryNoteStore::new()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn notes_json(app: &Router) -> Value {
    let (status, headers, body) = send(app, get("/api/notes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn empty_store_returns_empty_array_and_placeholder() {
    let app = app();

    assert_eq!(notes_json(&app).await, json!([]));

    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body.contains("No notes yet!"));
}

#[tokio::test]
async fn add_redirects_to_index_with_302() {
    let app = app();
    let (status, headers, _) = send(&app, post_form("text=Buy+milk")).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/");
}

#[tokio::test]
async fn buy_milk_then_walk_dog_scenario() {
    let app = app();
    send(&app, post_form("text=Buy+milk")).await;
    send(&app, post_form("text=Walk%20dog")).await;

    assert_eq!(
        notes_json(&app).await,
        json!([{"id": 2, "text": "Walk dog"}, {"id": 1, "text": "Buy milk"}])
    );
}

#[tokio::test]
async fn submitted_text_is_trimmed() {
    let app = app();
    send(&app, post_form("text=%20%20spaced%20out%20%0A")).await;
    assert_eq!(notes_json(&app).await, json!([{"id": 1, "text": "spaced out"}]));
}

#[tokio::test]
async fn information_separators_are_trimmed_like_whitespace() {
    let app = app();
    send(&app, post_form("text=%1FBuy+milk%1C")).await;
    assert_eq!(notes_json(&app).await, json!([{"id": 1, "text": "Buy milk"}]));
}

#[tokio::test]
async fn repeated_text_field_uses_the_first_value() {
    let app = app();
    let (status, headers, _) = send(&app, post_form("text=first&text=second")).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/");
    assert_eq!(notes_json(&app).await, json!([{"id": 1, "text": "first"}]));
}

#[tokio::test]
async fn blank_or_missing_text_is_a_silent_no_op() {
    let app = app();
    send(&app, post_form("text=keep")).await;
    let before = notes_json(&app).await;

    for body in ["text=", "text=+++", "text=%09%0A", "text=%1C%1F", "", "other=value"] {
        let (status, headers, _) = send(&app, post_form(body)).await;
        assert_eq!(status, StatusCode::FOUND, "body `{body}`");
        assert_eq!(headers[header::LOCATION], "/");
    }

    // No content type at all still redirects.
    let bare = Request::builder()
        .method("POST")
        .uri("/add")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, bare).await;
    assert_eq!(status, StatusCode::FOUND);

    assert_eq!(notes_json(&app).await, before);
}

#[tokio::test]
async fn html_and_json_views_agree_on_order_and_content() {
    let app = app();
    for text in ["alpha", "beta", "gamma"] {
        send(&app, post_form(&format!("text={text}"))).await;
    }

    let notes = notes_json(&app).await;
    let (_, _, page) = send(&app, get("/")).await;

    let mut last_position = 0;
    for note in notes.as_array().unwrap() {
        let marker = format!(
            "data-id=\"{}\">{}</li>",
            note["id"],
            note["text"].as_str().unwrap()
        );
        let position = page.find(&marker).expect("note missing from html");
        assert!(position >= last_position, "html order differs from json");
        last_position = position;
    }
    assert!(!page.contains("No notes yet!"));
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let app = app();
    send(&app, post_form("text=one")).await;

    assert_eq!(notes_json(&app).await, notes_json(&app).await);
    let (_, _, first) = send(&app, get("/")).await;
    let (_, _, second) = send(&app, get("/")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn html_view_escapes_note_text() {
    let app = app();
    send(&app, post_form("text=%3Cscript%3Ex%3C%2Fscript%3E")).await;

    let (_, _, page) = send(&app, get("/")).await;
    assert!(page.contains("&lt;script&gt;x&lt;/script&gt;"));
    assert!(!page.contains("<script>x</script>"));

    // JSON keeps the stored text verbatim.
    assert_eq!(notes_json(&app).await[0]["text"], "<script>x</script>");
}

#[tokio::test]
async fn stylesheet_is_served() {
    let (status, headers, body) = send(&app(), get("/static/style.css")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    assert!(body.contains(".container"));
}

#[tokio::test]
async fn sqlite_store_persists_across_router_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let store = SqliteNoteStore::new(&path);
    store.initialize().unwrap();
    send(&app_with(Arc::new(store)), post_form("text=durable")).await;

    let restarted = app_with(Arc::new(SqliteNoteStore::new(&path)));
    assert_eq!(notes_json(&restarted).await, json!([{"id": 1, "text": "durable"}]));
}

struct UnavailableStore;

impl NoteStore for UnavailableStore {
    fn initialize(&self) -> StoreResult<()> {
        Err(unavailable())
    }

    fn insert(&self, _text: &str) -> StoreResult<Note> {
        Err(unavailable())
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::InvalidData("disk unavailable".to_string())
}

#[tokio::test]
async fn storage_failure_is_a_generic_500() {
    let app = app_with(Arc::new(UnavailableStore));

    for request in [get("/"), get("/api/notes"), post_form("text=lost")] {
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("disk unavailable"));
    }
}

#[tokio::test]
async fn blank_submission_does_not_touch_a_failing_store() {
    let app = app_with(Arc::new(UnavailableStore));
    let (status, _, _) = send(&app, post_form("text=%20")).await;
    assert_eq!(status, StatusCode::FOUND);
}
