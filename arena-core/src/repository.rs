use arena_catalog::{Listing, ListingConfigs, NewListing};
use arena_interaction::{Actor, Aggregator, DedupGuard, Interaction, InteractionSummary, ReviewBody};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::CoreResult;

/// Repository trait for listing data access
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Issues the next id and stores `statistics.rank` for it.
    /// A taken slug fails with `CoreError::Conflict`.
    async fn create_listing(&self, listing: NewListing) -> CoreResult<Listing>;

    async fn find_by_slug(&self, slug: &str) -> CoreResult<Option<Listing>>;

    /// Every listing, ordered by id.
    async fn list_listings(&self) -> CoreResult<Vec<Listing>>;

    /// Replaces the configs map. Statistics are left untouched.
    async fn update_configs(&self, listing_id: i64, configs: &ListingConfigs) -> CoreResult<Listing>;

    /// Removes the listing together with all of its interactions.
    async fn delete_listing(&self, listing_id: i64) -> CoreResult<()>;
}

/// Repository trait for interaction data access.
///
/// `record_vote` and `publish_review` must run the guard check and the insert
/// as one atomic step, so two concurrent duplicates leave exactly one row.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn record_vote(
        &self,
        listing_id: i64,
        actor: Actor,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction>;

    async fn record_click(&self, listing_id: i64, actor: Actor, now: DateTime<Utc>) -> CoreResult<Interaction>;

    async fn publish_review(
        &self,
        listing_id: i64,
        user_id: Uuid,
        body: ReviewBody,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction>;

    async fn find_review(&self, review_id: Uuid) -> CoreResult<Option<Interaction>>;

    /// Replaces message and score. Id, author and `created_at` are kept.
    async fn update_review(&self, review_id: Uuid, body: &ReviewBody) -> CoreResult<Interaction>;

    async fn delete_review(&self, review_id: Uuid) -> CoreResult<()>;

    /// Reviews for one listing, newest first.
    async fn list_reviews(&self, listing_id: i64) -> CoreResult<Vec<Interaction>>;

    /// Statistics for one listing under `aggregator`'s window ending at `now`.
    /// Reads nothing that belongs to other listings.
    async fn summarize_listing(
        &self,
        listing_id: i64,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<InteractionSummary>;

    /// Statistics for every listing with at least one counted interaction.
    /// Stores compute the counts themselves instead of returning raw rows.
    async fn summarize_all(
        &self,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<HashMap<i64, InteractionSummary>>;
}
