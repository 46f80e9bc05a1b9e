use crate::state::AppState;
use axum::Router;

mod dto;
pub mod claims;
pub mod error;
pub(crate) mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
