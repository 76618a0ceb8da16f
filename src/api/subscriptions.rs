//! Subscription endpoints
//!
//! - POST /signup - finalize a signup (creates author + feed)
//! - POST /subscriptions - follow a remote feed through its hub
//! - DELETE /subscriptions/{id} - unfollow

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::AppState;

/// Create accounts/subscriptions router
pub fn subscriptions_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(finalize_signup))
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions/:id", delete(remove_subscription))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    display_name: Option<String>,
    email: Option<String>,
}

/// POST /signup
///
/// Finalizes a confirmed signup: the author and their feed come into
/// existence together, and the feed URL is fixed from here on.
async fn finalize_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let (author, feed) = state
        .account_service()
        .finalize_signup(&request.username, request.display_name, request.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": author.id,
            "username": author.username,
            "feed_id": feed.id,
            "feed_url": feed.url,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct CreateSubscriptionRequest {
    topic_url: String,
    hub_url: String,
}

/// POST /subscriptions
///
/// Sends the subscribe request to the remote hub. The subscription stays
/// `pending` until the hub's verification challenge lands on our feed URL.
async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let subscription = state
        .follow_service()
        .follow(&request.topic_url, &request.hub_url)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": subscription.id,
            "feed_id": subscription.feed_id,
            "topic_url": subscription.topic_url,
            "state": subscription.state,
        })),
    ))
}

/// DELETE /subscriptions/{id}
///
/// Sends the unsubscribe request; the record is removed once the hub
/// verifies. 202 because removal is asynchronous.
async fn remove_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.follow_service().unfollow(&id).await?;
    Ok(StatusCode::ACCEPTED)
}
