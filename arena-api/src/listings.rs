use arena_catalog::{Listing, ListingConfigs, NewListing};
use arena_core::{AggregatedListing, ListingProfile, ListingQuery};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::AuthUser,
    state::AppState,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<AggregatedListing>,
}

/// Trailing segments of `/servers/...`; absent ones take their defaults.
#[derive(Debug, Deserialize)]
pub struct ServerPath {
    pub exp_group: Option<String>,
    pub mode: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/listings", post(create_listing))
        .route("/listing/{slug}", get(profile).delete(delete_listing))
        .route("/listing/{slug}/configs", patch(update_configs))
        .route("/servers", get(search_all))
        .route("/servers/{exp_group}", get(search))
        .route("/servers/{exp_group}/{mode}", get(search))
        .route("/servers/{exp_group}/{mode}/{sort}", get(search))
        .route("/servers/{exp_group}/{mode}/{sort}/{orderBy}", get(search))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
async fn index(State(state): State<AppState>) -> Result<Json<ListingsResponse>, AppError> {
    let listings = state.listings.index(Utc::now()).await?;
    Ok(Json(ListingsResponse { listings }))
}

/// GET /listing/{slug}
async fn profile(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<Json<ListingProfile>, AppError> {
    Ok(Json(state.listings.profile(&slug, Utc::now()).await?))
}

/// GET /servers/{exp_group}/{mode}/{sort}/{orderBy}
async fn search(
    State(state): State<AppState>,
    AppPath(path): AppPath<ServerPath>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<ListingsResponse>, AppError> {
    let query = ListingQuery::parse(
        path.exp_group.as_deref().unwrap_or("all"),
        path.mode.as_deref().unwrap_or("all"),
        path.sort.as_deref().unwrap_or("any"),
        path.order_by.as_deref().unwrap_or("desc"),
    )?;
    run_search(&state, query, params).await
}

/// GET /servers
async fn search_all(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<ListingsResponse>, AppError> {
    run_search(&state, ListingQuery::default(), params).await
}

async fn run_search(
    state: &AppState,
    query: ListingQuery,
    params: SearchParams,
) -> Result<Json<ListingsResponse>, AppError> {
    let query = query.with_tag(params.tag.as_deref()).with_limit(params.limit);
    let listings = state.listings.search(&query, Utc::now()).await?;
    Ok(Json(ListingsResponse { listings }))
}

/// POST /listings
async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(mut submission): AppJson<NewListing>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    submission.owner_id = user_id;
    let listing = state.listings.create_listing(submission).await?;
    info!("Listing {} submitted by {}", listing.slug, user_id);
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PATCH /listing/{slug}/configs
async fn update_configs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(slug): AppPath<String>,
    AppJson(configs): AppJson<ListingConfigs>,
) -> Result<Json<Listing>, AppError> {
    Ok(Json(state.listings.update_configs(&slug, user_id, configs).await?))
}

/// DELETE /listing/{slug}
async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(slug): AppPath<String>,
) -> Result<StatusCode, AppError> {
    state.listings.delete_listing(&slug, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
