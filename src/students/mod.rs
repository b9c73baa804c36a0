pub mod dto;
mod extractors;
pub mod handlers;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::lookup_routes())
        .merge(handlers::record_routes())
}
