use arena_interaction::{Actor, Interaction, ReviewPatch};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    middleware::{AuthUser, MaybeUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub message: String,
    pub score: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listing/{slug}/vote", post(vote))
        .route("/listing/{slug}/click", post(click))
        .route("/listing/{slug}/reviews", post(publish_review))
        .route(
            "/listing/{slug}/reviews/{id}",
            patch(update_review).delete(delete_review),
        )
}

/// POST /listing/{slug}/vote
/// Counted against the signed-in user when there is one, else the client address.
async fn vote(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    MaybeUser(user): MaybeUser,
    AppPath(slug): AppPath<String>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    let actor = match user {
        Some(user_id) => Actor::User(user_id),
        None => Actor::Address(addr.ip()),
    };
    let vote = state.interactions.cast_vote(&slug, actor, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// POST /listing/{slug}/click
async fn click(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    AppPath(slug): AppPath<String>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    let click = state
        .interactions
        .record_click(&slug, Actor::Address(addr.ip()), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(click)))
}

/// POST /listing/{slug}/reviews
async fn publish_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(slug): AppPath<String>,
    AppJson(req): AppJson<ReviewRequest>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    let review = state
        .interactions
        .publish_review(&slug, user_id, req.message, req.score, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// PATCH /listing/{slug}/reviews/{id}
async fn update_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath((slug, review_id)): AppPath<(String, Uuid)>,
    AppJson(patch): AppJson<ReviewPatch>,
) -> Result<Json<Interaction>, AppError> {
    let review = state
        .interactions
        .update_review(&slug, review_id, user_id, &patch)
        .await?;
    Ok(Json(review))
}

/// DELETE /listing/{slug}/reviews/{id}
async fn delete_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath((slug, review_id)): AppPath<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.interactions.delete_review(&slug, review_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
