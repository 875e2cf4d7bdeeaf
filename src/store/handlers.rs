use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    store::{
        dto::{
            ConfigValueResponse, HistoryEntryResponse, HistoryKeysResponse, KeyQuery,
            PutConfigRequest, SavedResponse,
        },
        repo,
    },
};

#[instrument(skip(state, auth))]
pub async fn history_keys(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<HistoryKeysResponse>, AppError> {
    let keys = repo::history_keys(&state.db, auth.user_id).await?;
    Ok(Json(HistoryKeysResponse { keys }))
}

#[instrument(skip(state, auth))]
pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<KeyQuery>,
) -> Result<Json<HistoryEntryResponse>, AppError> {
    let key = require_key(&query)?;
    let data = repo::get_history(&state.db, auth.user_id, key)
        .await?
        .ok_or_else(|| AppError::NotFound("no entry for this key".into()))?;
    Ok(Json(HistoryEntryResponse { data }))
}

#[instrument(skip(state, auth, body))]
pub async fn put_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<KeyQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SavedResponse>, AppError> {
    let key = require_key(&query)?;
    if body.is_null() {
        return Err(AppError::Validation("request body must not be empty".into()));
    }
    repo::upsert_history(&state.db, auth.user_id, key, &body).await?;
    Ok(Json(SavedResponse { message: "saved" }))
}

#[instrument(skip(state, auth))]
pub async fn get_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(config_key): Path<String>,
) -> Result<Json<ConfigValueResponse>, AppError> {
    let value = repo::get_config(&state.db, auth.user_id, &config_key)
        .await?
        .ok_or_else(|| AppError::NotFound("no config for this key".into()))?;
    Ok(Json(ConfigValueResponse { value }))
}

#[instrument(skip(state, auth, body))]
pub async fn put_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(config_key): Path<String>,
    Json(body): Json<PutConfigRequest>,
) -> Result<Json<SavedResponse>, AppError> {
    repo::upsert_config(&state.db, auth.user_id, &config_key, &body.value).await?;
    Ok(Json(SavedResponse { message: "saved" }))
}

fn require_key(query: &KeyQuery) -> Result<&str, AppError> {
    let key = query.key.trim();
    if key.is_empty() {
        return Err(AppError::Validation("missing query parameter key".into()));
    }
    Ok(key)
}
