use axum::Router;

use crate::state::AppState;

mod cookie;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod ratelimit;
pub mod repo;
pub mod tokens;
mod validate;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
