use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use idworker::{IdGenStatus, IdParts, IdWorker, SnowflakeId, TimeSource};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::server::error::{ApiError, Result};

/// Shared handler state: the node's single generator plus request limits.
pub struct AppState<T: TimeSource> {
    generator: Arc<IdWorker<T>>,
    epoch: Duration,
    max_batch: usize,
}

impl<T: TimeSource> AppState<T> {
    pub fn new(generator: Arc<IdWorker<T>>, epoch: Duration, max_batch: usize) -> Self {
        Self {
            generator,
            epoch,
            max_batch,
        }
    }
}

// Manual impl: cloning the state never requires cloning the clock.
impl<T: TimeSource> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            epoch: self.epoch,
            max_batch: self.max_batch,
        }
    }
}

/// Builds the HTTP routes.
///
/// - `GET /health`
/// - `GET /ids/next`: one ID as a decimal string
/// - `GET /ids?count=N`: a batch of IDs
/// - `GET /ids/{id}`: the decoded fields of an ID
pub fn router<T>(state: AppState<T>) -> Router
where
    T: TimeSource + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/ids", get(next_batch::<T>))
        .route("/ids/next", get(next_id::<T>))
        .route("/ids/{id}", get(decode_id::<T>))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Generates an ID without blocking a runtime thread.
///
/// An exhausted millisecond parks the task on the timer until the clock
/// reaches the next one, instead of spinning inside the generator.
async fn generate<T: TimeSource>(generator: &IdWorker<T>) -> idworker::Result<SnowflakeId> {
    loop {
        let yield_until = match generator.try_poll_id()? {
            IdGenStatus::Ready { id } => return Ok(id),
            IdGenStatus::Pending { yield_until } => yield_until,
        };
        let wait = yield_until.saturating_sub(generator.clock().current_millis());
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }
}

/// Returns one fresh ID in its storage form (decimal string).
#[instrument(level = "debug", skip_all)]
async fn next_id<T>(State(state): State<AppState<T>>) -> Result<String>
where
    T: TimeSource + Send + Sync + 'static,
{
    Ok(generate(&state.generator).await?.to_string())
}

#[derive(Debug, Deserialize)]
struct BatchParams {
    count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdBatch {
    ids: Vec<String>,
}

#[instrument(level = "debug", skip_all, fields(count = ?params.count))]
async fn next_batch<T>(
    State(state): State<AppState<T>>,
    Query(params): Query<BatchParams>,
) -> Result<Json<IdBatch>>
where
    T: TimeSource + Send + Sync + 'static,
{
    let count = params.count.unwrap_or(1);
    if count == 0 || count > state.max_batch {
        return Err(ApiError::InvalidRequest {
            reason: format!("count must be within 1..={}", state.max_batch),
        });
    }

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(generate(&state.generator).await?.to_string());
    }
    Ok(Json(IdBatch { ids }))
}

#[derive(Debug, Serialize, Deserialize)]
struct DecodedId {
    id: String,
    #[serde(flatten)]
    parts: IdParts,
    unix_millis: u64,
}

#[instrument(level = "debug", skip_all, fields(id = %id))]
async fn decode_id<T>(
    State(state): State<AppState<T>>,
    Path(id): Path<String>,
) -> Result<Json<DecodedId>>
where
    T: TimeSource + Send + Sync + 'static,
{
    let id: SnowflakeId = id.parse()?;
    Ok(Json(DecodedId {
        id: id.to_string(),
        parts: id.parts(),
        unix_millis: id.unix_millis(state.epoch),
    }))
}
