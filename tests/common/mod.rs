//! In-process HTTP doubles for the media origin, the B2 account API and a
//! webhook receiver. Each binds `127.0.0.1:0` and runs on the test runtime.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn serve(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

// ---------------------------------------------------------------------------
// Media origin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Start(String),
    End(String),
}

#[derive(Default)]
pub struct MediaState {
    pub events: Mutex<Vec<FetchEvent>>,
}

pub struct MediaServer {
    pub base: String,
    pub state: Arc<MediaState>,
}

impl MediaServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.state.events.lock().unwrap().clone()
    }
}

pub fn media_body(name: &str) -> Vec<u8> {
    format!("video bytes for {name}").into_bytes()
}

/// Routes:
/// - `/media/{name}`: 200 with a small body after a short delay
/// - `/slow/{name}`: GET stalls for 5 s
/// - `/missing/{name}`: 404
/// - `/empty/{name}`: 200 with no body
/// - `/redirect/{name}`: 307 to `/media/{name}`
///
/// GET start/end events are recorded for `/media`. HEAD probes are answered
/// immediately and not recorded.
pub async fn media_server() -> MediaServer {
    let state = Arc::new(MediaState::default());
    let app = Router::new()
        .route("/media/{name}", get(media))
        .route("/slow/{name}", get(slow))
        .route("/missing/{name}", get(|| async { StatusCode::NOT_FOUND }))
        .route("/empty/{name}", get(|| async { StatusCode::OK }))
        .route(
            "/redirect/{name}",
            get(|Path(name): Path<String>| async move {
                Redirect::temporary(&format!("/media/{name}"))
            }),
        )
        .with_state(state.clone());

    let (listener, base) = bind().await;
    serve(listener, app);
    MediaServer { base, state }
}

async fn media(
    method: Method,
    Path(name): Path<String>,
    State(state): State<Arc<MediaState>>,
) -> Response {
    if method == Method::HEAD {
        return ([(header::CONTENT_TYPE, "video/mp4")], media_body(&name)).into_response();
    }

    state
        .events
        .lock()
        .unwrap()
        .push(FetchEvent::Start(name.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    state
        .events
        .lock()
        .unwrap()
        .push(FetchEvent::End(name.clone()));

    ([(header::CONTENT_TYPE, "video/mp4")], media_body(&name)).into_response()
}

async fn slow(method: Method, Path(name): Path<String>) -> Response {
    if method != Method::HEAD {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    media_body(&name).into_response()
}

// ---------------------------------------------------------------------------
// B2 account + upload API
// ---------------------------------------------------------------------------

pub const ACCOUNT_TOKEN: &str = "account-token";

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub slot: usize,
    pub authorization: String,
    pub file_name: String,
    pub content_sha1: String,
    pub author: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

pub struct B2State {
    base: String,
    auth_status: StatusCode,
    upload_status: StatusCode,
    pub authorizations: AtomicUsize,
    pub upload_url_requests: AtomicUsize,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    session_expired: AtomicBool,
}

pub struct B2Server {
    pub base: String,
    pub state: Arc<B2State>,
}

impl B2Server {
    pub fn authorizations(&self) -> usize {
        self.state.authorizations.load(Ordering::SeqCst)
    }

    pub fn upload_url_requests(&self) -> usize {
        self.state.upload_url_requests.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    /// Reject the account token from now on, as B2 does once it expires
    pub fn expire_session(&self) {
        self.state.session_expired.store(true, Ordering::SeqCst);
    }
}

/// B2 double issuing `upload-token-{n}` / `{base}/upload/{n}` per request
pub async fn b2_server(auth_status: StatusCode, upload_status: StatusCode) -> B2Server {
    let (listener, base) = bind().await;
    let state = Arc::new(B2State {
        base: base.clone(),
        auth_status,
        upload_status,
        authorizations: AtomicUsize::new(0),
        upload_url_requests: AtomicUsize::new(0),
        uploads: Mutex::new(Vec::new()),
        session_expired: AtomicBool::new(false),
    });

    let app = Router::new()
        .route("/b2api/v2/b2_authorize_account", get(authorize_account))
        .route("/b2api/v4/b2_get_upload_url", post(get_upload_url))
        .route("/upload/{slot}", post(upload_file))
        .with_state(state.clone());

    serve(listener, app);
    B2Server { base, state }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn authorize_account(State(state): State<Arc<B2State>>, headers: HeaderMap) -> Response {
    state.authorizations.fetch_add(1, Ordering::SeqCst);

    if !header_value(&headers, "authorization").starts_with("Basic ") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.auth_status != StatusCode::OK {
        return (state.auth_status, Json(json!({"code": "unauthorized"}))).into_response();
    }

    Json(json!({
        "accountId": "account",
        "apiUrl": state.base,
        "authorizationToken": ACCOUNT_TOKEN,
        "downloadUrl": state.base,
    }))
    .into_response()
}

async fn get_upload_url(
    State(state): State<Arc<B2State>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if header_value(&headers, "authorization") != ACCOUNT_TOKEN
        || state.session_expired.load(Ordering::SeqCst)
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "expired_auth_token"})),
        )
            .into_response();
    }

    let slot = state.upload_url_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "bucketId": body["bucketId"],
        "uploadUrl": format!("{}/upload/{slot}", state.base),
        "authorizationToken": format!("upload-token-{slot}"),
    }))
    .into_response()
}

async fn upload_file(
    State(state): State<Arc<B2State>>,
    Path(slot): Path<usize>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.uploads.lock().unwrap().push(RecordedUpload {
        slot,
        authorization: header_value(&headers, "authorization"),
        file_name: header_value(&headers, "x-bz-file-name"),
        content_sha1: header_value(&headers, "x-bz-content-sha1"),
        author: header_value(&headers, "x-bz-info-author"),
        content_type: header_value(&headers, "content-type"),
        body: body.to_vec(),
    });

    if state.upload_status != StatusCode::OK {
        return (state.upload_status, "upload rejected").into_response();
    }
    Json(json!({"fileId": format!("file-{slot}")})).into_response()
}

// ---------------------------------------------------------------------------
// Webhook receiver
// ---------------------------------------------------------------------------

pub struct WebhookServer {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl WebhookServer {
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

/// Records every JSON body posted to `/hook` and answers with `status`
pub async fn webhook_server(status: StatusCode) -> WebhookServer {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let app = Router::new().route(
        "/hook",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(body);
                status
            }
        }),
    );

    let (listener, base) = bind().await;
    serve(listener, app);
    WebhookServer {
        url: format!("{base}/hook"),
        received,
    }
}

/// Number of entries in the workspace root (per-job dirs should be gone)
pub fn dir_entries(path: &std::path::Path) -> usize {
    std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}
