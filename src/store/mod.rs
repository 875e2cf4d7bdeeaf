use axum::{routing::get, Router};

use crate::state::AppState;

mod dto;
pub mod handlers;
mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/viewing-history/keys", get(handlers::history_keys))
        .route(
            "/viewing-history/operation",
            get(handlers::get_history).post(handlers::put_history),
        )
        .route(
            "/user-config/:config_key",
            get(handlers::get_config).post(handlers::put_config),
        )
}
