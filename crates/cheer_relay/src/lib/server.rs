use std::{path::Path, sync::Arc};

use axum::{
    body::Bytes,
    extract::{FromRef, Path as UrlPath, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use cheer_queue::{CheerEntry, CheerQueue, EntryId, QueueError, QueuedCheer};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    bus::LiveBus, notify::NotificationDispatcher, tts::SpeechSynthesizer,
    twitch::RecordingLocator, CheerProcessor, ProcessError, ProcessOutcome,
};

pub struct AppState<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    pub processor: Arc<CheerProcessor<L, N, S>>,
    pub queue: CheerQueue,
    pub bus: LiveBus,
}

impl<L, N, S> AppState<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    pub fn new(processor: CheerProcessor<L, N, S>) -> Self {
        let queue = processor.queue().clone();
        let bus = processor.bus().clone();
        Self {
            processor: Arc::new(processor),
            queue,
            bus,
        }
    }
}

impl<L, N, S> Clone for AppState<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            queue: self.queue.clone(),
            bus: self.bus.clone(),
        }
    }
}

impl<L, N, S> FromRef<AppState<L, N, S>> for CheerQueue
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    fn from_ref(state: &AppState<L, N, S>) -> Self {
        state.queue.clone()
    }
}

impl<L, N, S> FromRef<AppState<L, N, S>> for LiveBus
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    fn from_ref(state: &AppState<L, N, S>) -> Self {
        state.bus.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No cheers in queue")]
    EmptyQueue,
    #[error("Invalid index")]
    InvalidIndex,
    #[error("No queued cheer with id {0}")]
    UnknownEntry(EntryId),
    #[error("Failed to process cheer")]
    Process(#[from] ProcessError),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Empty => ApiError::EmptyQueue,
            QueueError::InvalidIndex { .. } => ApiError::InvalidIndex,
            QueueError::UnknownEntry(id) => ApiError::UnknownEntry(id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::EmptyQueue | ApiError::UnknownEntry(_) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": self.to_string() }),
            ),
            ApiError::InvalidIndex => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": self.to_string() }),
            ),
            ApiError::Process(e) => {
                tracing::error!(error = ?e, "Error processing cheer");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": self.to_string(), "error": e.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Builds the full HTTP surface: queue admin, processing trigger, the SSE
/// stream for overlays, and static files from `public_dir`.
pub fn router<L, N, S>(state: AppState<L, N, S>, public_dir: &Path) -> Router
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/queue", get(list_queue).delete(remove_at_index))
        .route("/queue/{id}", delete(remove_by_id))
        .route("/process", post(process_next::<L, N, S>))
        .route("/test-cheer", post(inject_test_cheer))
        .route("/tts-stream", get(tts_stream))
        .route_service("/obs", ServeFile::new(public_dir.join("obs.html")))
        .route_service("/admin", ServeFile::new(public_dir.join("admin.html")))
        .nest_service("/audio", ServeDir::new(public_dir))
        .fallback_service(ServeDir::new(public_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_queue(State(queue): State<CheerQueue>) -> Json<Vec<QueuedCheer>> {
    Json(queue.snapshot())
}

#[derive(Debug, Serialize)]
struct ProcessedResponse {
    success: bool,
    cheer: CheerEntry,
    url: Option<String>,
}

async fn process_next<L, N, S>(
    State(state): State<AppState<L, N, S>>,
) -> ApiResult<Json<ProcessedResponse>>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    match state.processor.process_next().await? {
        ProcessOutcome::Empty => Err(ApiError::EmptyQueue),
        ProcessOutcome::Processed { cheer, url } => Ok(Json(ProcessedResponse {
            success: true,
            cheer,
            url,
        })),
    }
}

#[derive(Debug, Deserialize)]
struct RemoveAtRequest {
    index: Option<serde_json::Value>,
}

/// Any body that is not JSON with a non-negative integer `index` is an
/// invalid index, never an extractor rejection
fn parse_index(body: &[u8]) -> Option<usize> {
    let request = serde_json::from_slice::<RemoveAtRequest>(body).ok()?;
    let index = request.index?.as_u64()?;
    usize::try_from(index).ok()
}

async fn remove_at_index(
    State(queue): State<CheerQueue>,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let index = parse_index(&body).ok_or(ApiError::InvalidIndex)?;

    let removed = queue.remove_at(index)?;
    tracing::info!(index, id = %removed.id, "Removed cheer at index");

    Ok(Json(json!({ "success": true })))
}

async fn remove_by_id(
    State(queue): State<CheerQueue>,
    UrlPath(id): UrlPath<u64>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = queue.remove(EntryId(id))?;
    tracing::info!(id = %removed.id, "Removed cheer by id");

    Ok(Json(json!({ "success": true, "cheer": removed })))
}

#[derive(Debug, Default, Deserialize)]
struct TestCheerRequest {
    user: Option<String>,
    message: Option<String>,
    bits: Option<u32>,
}

async fn inject_test_cheer(
    State(queue): State<CheerQueue>,
    request: Option<Json<TestCheerRequest>>,
) -> Json<serde_json::Value> {
    let TestCheerRequest {
        user,
        message,
        bits,
    } = request.map(|Json(r)| r).unwrap_or_default();

    let cheer = CheerEntry::new(
        user.filter(|u| !u.is_empty())
            .unwrap_or_else(|| "testuser".to_string()),
        message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "This is a test cheer!".to_string()),
        bits.filter(|b| *b > 0).unwrap_or(100),
    );
    let id = queue.enqueue(cheer.clone());
    tracing::info!(%id, user = %cheer.display_name, "Test cheer added to queue");

    Json(json!({ "success": true, "cheer": QueuedCheer { id, cheer } }))
}

async fn tts_stream(
    State(bus): State<LiveBus>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let client = bus.subscribe();
    tracing::info!(client_id = %client.id(), "New SSE connection established");

    let events = client
        .into_stream()
        .map(|notification| Event::default().json_data(notification));

    Sse::new(events).keep_alive(KeepAlive::default())
}
