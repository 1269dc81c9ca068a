use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
mod password;
pub mod referral_code;
pub mod repo_types;
pub mod services;
mod validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::referral_routes())
}
