//! Update endpoints
//!
//! - POST /updates - publish a new status update
//! - DELETE /updates/{id} - delete an update (author only)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::AppState;

/// Create updates router
pub fn updates_router() -> Router<AppState> {
    Router::new()
        .route("/updates", post(create_update))
        .route("/updates/:id", delete(delete_update))
}

#[derive(Debug, Deserialize)]
struct CreateUpdateRequest {
    /// Posting author's username; authentication happens upstream
    username: String,
    text: String,
}

/// POST /updates
///
/// Publishes an update on the author's feed and pings the feed's hubs.
/// The response reports how many hubs acknowledged; the post itself never
/// fails on hub unreachability.
async fn create_update(
    State(state): State<AppState>,
    Json(request): Json<CreateUpdateRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let (update, hubs_pinged) = state
        .update_service()
        .publish(&request.username, &request.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": update.id,
            "entry_id": update.entry_id,
            "text": update.text,
            "published_at": update.published_at.to_rfc3339(),
            "hubs_pinged": hubs_pinged,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct DeleteUpdateRequest {
    username: String,
}

/// DELETE /updates/{id}
async fn delete_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeleteUpdateRequest>,
) -> Result<StatusCode, AppError> {
    state
        .update_service()
        .delete(&id, &request.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
