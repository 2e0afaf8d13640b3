use axum::{extract::State, response::IntoResponse, Json};

use crate::services::Services;

pub mod chats;
pub mod comments;
pub mod posts;
pub mod reactions;
pub mod users;

// ==================== Health Handler ====================

pub async fn health_check(State(services): State<Services>) -> impl IntoResponse {
    Json(services.health.check_health().await)
}
