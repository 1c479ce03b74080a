use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use beerpong_store::{ScoreStore, StoreError};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::game::GameData;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct BeginResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EndResponse {
    pub status: &'static str,
    pub result: Option<Vec<i64>>,
}

pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.version.clone(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.sensor.get().map(|reading| reading.to_vec()),
    })
}

pub async fn begin(
    State(state): State<AppState>,
    body: Result<Json<GameData>, JsonRejection>,
) -> ApiResult<Json<BeginResponse>> {
    let Json(data) = body.map_err(bad_json)?;

    let username = data.username.clone();
    let created = with_store(&state, move |store| {
        if store.exists(&username)? {
            return Ok(None);
        }
        store.insert(&username, 0).map(Some)
    })
    .await?;

    if let Some(record) = created {
        info!(username = %record.username, score = record.score, "user insertion");
    }

    state.game.begin();
    Ok(Json(BeginResponse { status: "begin" }))
}

pub async fn end(
    State(state): State<AppState>,
    body: Result<Json<GameData>, JsonRejection>,
) -> ApiResult<Json<EndResponse>> {
    let Json(data) = body.map_err(bad_json)?;

    if !state.game.in_progress() {
        return Err(ApiError::BadRequest("the game is not started".to_string()));
    }

    let username = data.username.clone();
    let exists = with_store(&state, move |store| store.exists(&username)).await?;
    if !exists {
        return Err(ApiError::BadRequest("this user does not exist".to_string()));
    }

    let score = data.score();
    let username = data.username.clone();
    let record = with_store(&state, move |store| store.update(&username, score)).await?;
    info!(username = %record.username, score = record.score, "user update");

    state.game.finish();
    Ok(Json(EndResponse {
        status: "end",
        result: state.sensor.get().map(|reading| reading.to_vec()),
    }))
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    error!(error = %rejection, "error on JSON binding");
    ApiError::BadRequest(rejection.body_text())
}

/// Run a store operation off the async executor.
async fn with_store<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ScoreStore) -> Result<T, StoreError> + Send + 'static,
{
    let store: Arc<dyn ScoreStore> = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))?
        .map_err(ApiError::from)
}
