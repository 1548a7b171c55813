//! HTTP + WebSocket surface for StressFuse
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /preview.jpg - Latest captured frame
//! - GET /video_feed - MJPEG preview stream
//! - WS /ws - Live `stress_update`, `stress_alert` and `market_update` events

use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::core::emitter::{BroadcastEmitter, BroadcastEvent};
use crate::core::mailbox::PreviewMailbox;
use crate::types::Frame;
use crate::Result;

/// Pace of the MJPEG feed
const FEED_INTERVAL: Duration = Duration::from_millis(33);
const MJPEG_BOUNDARY: &str = "frame";

/// Shared handles for every handler
#[derive(Clone)]
pub struct AppState {
    pub emitter: Arc<BroadcastEmitter>,
    pub mailbox: Arc<PreviewMailbox>,
    pub jpeg: Arc<JpegCache>,
}

impl AppState {
    pub fn new(emitter: Arc<BroadcastEmitter>, mailbox: Arc<PreviewMailbox>) -> Self {
        Self {
            emitter,
            mailbox,
            jpeg: Arc::new(JpegCache::new()),
        }
    }
}

/// Last encoded preview, shared by every viewer
///
/// A frame is encoded at most once per index, off the async workers.
#[derive(Default)]
pub struct JpegCache {
    slot: Mutex<Option<(u64, Bytes)>>,
}

impl JpegCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, index: u64) -> Option<Bytes> {
        self.slot
            .lock()
            .as_ref()
            .filter(|(cached, _)| *cached == index)
            .map(|(_, jpeg)| jpeg.clone())
    }

    fn store(&self, index: u64, jpeg: Bytes) {
        *self.slot.lock() = Some((index, jpeg));
    }

    /// JPEG of the mailbox's latest frame, `None` before the first frame
    pub async fn latest(&self, mailbox: &PreviewMailbox) -> Result<Option<Bytes>> {
        let Some(index) = mailbox.latest_index() else {
            return Ok(None);
        };
        if let Some(jpeg) = self.cached(index) {
            return Ok(Some(jpeg));
        }
        let Some(frame) = mailbox.latest() else {
            return Ok(None);
        };
        let index = frame.index();
        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame)).await??;
        let jpeg = Bytes::from(jpeg);
        self.store(index, jpeg.clone());
        Ok(Some(jpeg))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subscribers: usize,
    pub preview_available: bool,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/preview.jpg", get(preview))
        .route("/video_feed", get(video_feed))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        subscribers: state.emitter.subscriber_count(),
        preview_available: !state.mailbox.is_empty(),
    })
}

/// JPEG bytes for a frame
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    frame.to_dynamic().write_to(&mut buf, image::ImageFormat::Jpeg)?;
    Ok(buf.into_inner())
}

/// Latest preview frame
async fn preview(State(state): State<AppState>) -> std::result::Result<Response, StatusCode> {
    let jpeg = state
        .jpeg
        .latest(&state.mailbox)
        .await
        .map_err(|e| {
            warn!(error = %e, "Preview encode failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}

/// One multipart section of the MJPEG stream
fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let mut part = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", MJPEG_BOUNDARY).into_bytes();
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// MJPEG preview stream; waits for the first frame
async fn video_feed(State(state): State<AppState>) -> Response {
    let ticker = tokio::time::interval(FEED_INTERVAL);
    let stream = futures_util::stream::unfold((state, ticker), |(state, mut ticker)| async move {
        loop {
            ticker.tick().await;
            match state.jpeg.latest(&state.mailbox).await {
                Ok(Some(jpeg)) => {
                    let part = mjpeg_part(&jpeg);
                    return Some((Ok::<_, Infallible>(part), (state, ticker)));
                }
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Feed encode failed"),
            }
        }
    });

    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
        )],
        Body::from_stream(stream),
    )
        .into_response()
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    let rx = state.emitter.subscribe().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Acknowledgement sent back for each inbound text message
fn ack(inbound: &str) -> BroadcastEvent {
    let name = serde_json::from_str::<serde_json::Value>(inbound)
        .ok()
        .and_then(|v| v.get("event").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| "message".to_string());
    BroadcastEvent {
        event: "ack".to_string(),
        data: serde_json::json!({ "received": name }),
    }
}

/// Handle WebSocket connection
async fn handle_websocket(mut socket: WebSocket, mut rx: broadcast::Receiver<BroadcastEvent>) {
    info!("Client connected");
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Subscriber lagging, events dropped"),
                Err(RecvError::Closed) => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    info!(message = %text, "Client message");
                    let json = serde_json::to_string(&ack(&text)).unwrap_or_default();
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!("Client disconnected");
}

/// Run the API server until `shutdown` resolves
pub async fn run_server<F>(addr: &str, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "StressFuse API running");
    info!("  GET  /health       - Health check");
    info!("  GET  /preview.jpg  - Latest frame");
    info!("  GET  /video_feed   - MJPEG stream");
    info!("  WS   /ws           - Live events");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
