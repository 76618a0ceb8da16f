//! Feed endpoints
//!
//! - GET /feeds/{id}.atom - serve the Atom document, or answer a hub
//!   verification challenge when `hub.challenge` is present
//! - POST /feeds/{id}.atom - receive a signed push payload
//! - GET /users/{username}/feed - redirect alias to the feed URL

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::HeaderMap;

use crate::data::{Feed, SubscriptionState};
use crate::error::AppError;
use crate::federation::{self, atom, ChallengeOutcome, ChallengeParams};
use crate::metrics::{CHALLENGES_TOTAL, PUSH_REQUESTS_TOTAL};
use crate::AppState;

/// Create feeds router
pub fn feeds_router() -> Router<AppState> {
    Router::new()
        .route("/feeds/:id", get(serve_feed).post(receive_push))
        .route("/users/:username/feed", get(user_feed_redirect))
}

/// Resolve a `{id}.atom` path segment to a feed.
async fn resolve_feed(state: &AppState, raw_id: &str) -> Result<Feed, AppError> {
    let id = raw_id.strip_suffix(".atom").unwrap_or(raw_id);
    state.db.get_feed(id).await?.ok_or(AppError::UnknownFeed)
}

/// GET /feeds/{id}.atom
///
/// Publishers feed the Atom document to hubs from here; hubs verify
/// subscriptions against the same URL. The two cases are distinguished by
/// the presence of `hub.challenge`.
async fn serve_feed(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<ChallengeParams>,
) -> Result<Response, AppError> {
    let feed = resolve_feed(&state, &raw_id).await?;

    if params.is_verification() {
        return answer_challenge(&state, &feed, &params).await;
    }

    // Plain feed fetch: render the current state.
    let updates = state.db.get_updates(&feed.id).await?;
    let hubs = state.db.get_hubs(&feed.id).await?;

    let updated = updates
        .first()
        .map(|u| u.published_at)
        .unwrap_or(feed.updated_at);

    let doc = atom::FeedDocument {
        url: feed.url.clone(),
        title: feed.title.clone(),
        updated,
        hubs,
        entries: updates
            .into_iter()
            .map(|u| atom::Entry {
                entry_id: u.entry_id,
                author_name: u.author_name,
                text: u.text,
                published_at: u.published_at,
            })
            .collect(),
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/atom+xml; charset=utf-8")],
        atom::render(&doc),
    )
        .into_response())
}

/// Answer a hub verification challenge.
///
/// The hub proves it reached the right callback by having us echo its
/// challenge; we prove the subscription is ours by matching the topic and
/// the stored single-use token. Anything else is a 404, as the protocol
/// requires.
async fn answer_challenge(
    state: &AppState,
    feed: &Feed,
    params: &ChallengeParams,
) -> Result<Response, AppError> {
    let subscription = match params.topic.as_deref() {
        Some(topic) => state.db.find_pending_subscription(topic).await?,
        None => None,
    };

    let outcome = match &subscription {
        Some(sub) => federation::handle_challenge(params, &feed.url, &sub.verify_token),
        None => ChallengeOutcome::Rejected,
    };

    match outcome {
        ChallengeOutcome::Echo(challenge) => {
            // Subscription is always present when the challenge matched.
            if let Some(sub) = subscription {
                if params.is_unsubscribe() {
                    state.db.delete_subscription(&sub.id).await?;
                    tracing::info!(topic = ?params.topic, "Unsubscribe verified, subscription removed");
                } else {
                    state
                        .db
                        .set_subscription_state(&sub.id, SubscriptionState::Verified)
                        .await?;
                    tracing::info!(topic = ?params.topic, "Subscription verified");
                }
            }
            CHALLENGES_TOTAL.with_label_values(&["verified"]).inc();
            Ok((StatusCode::OK, challenge).into_response())
        }
        ChallengeOutcome::Rejected => {
            if let Some(sub) = subscription {
                // Only fail the attempt this callback actually belongs to.
                if sub.feed_id == feed.id {
                    state
                        .db
                        .set_subscription_state(&sub.id, SubscriptionState::Failed)
                        .await?;
                }
            }
            CHALLENGES_TOTAL.with_label_values(&["rejected"]).inc();
            tracing::warn!(
                feed_id = %feed.id,
                topic = ?params.topic,
                "Verification challenge rejected"
            );
            Ok(StatusCode::NOT_FOUND.into_response())
        }
    }
}

/// POST /feeds/{id}.atom
///
/// Receives pushed updates for a followed feed. The raw body and the
/// X-Hub-Signature header go to the ingestor untouched; signature and
/// parse failures discard the whole payload.
async fn receive_push(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let feed = resolve_feed(&state, &raw_id).await?;

    let signature = headers
        .get("x-hub-signature")
        .and_then(|value| value.to_str().ok());

    let outcome = match state.ingestor().ingest(&feed, &body, signature).await {
        Ok(outcome) => outcome,
        Err(e) => {
            PUSH_REQUESTS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(e);
        }
    };
    PUSH_REQUESTS_TOTAL.with_label_values(&["accepted"]).inc();

    Ok(Json(serde_json::json!({
        "accepted": outcome.accepted,
        "skipped": outcome.skipped,
    })))
}

/// GET /users/{username}/feed
///
/// Redirect alias for the author's canonical feed URL.
async fn user_feed_redirect(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = state
        .db
        .get_author_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;
    let feed = state
        .db
        .get_feed_by_author(&author.id)
        .await?
        .ok_or(AppError::UnknownFeed)?;

    Ok(Redirect::to(&feed.url))
}
