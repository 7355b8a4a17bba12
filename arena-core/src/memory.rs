//! In-process repositories backed by a single `RwLock`.
//!
//! Used by tests and by the API when no database is configured. Every write
//! holds the lock across the guard check and the insert.

use arena_catalog::{Listing, ListingConfigs, NewListing};
use arena_interaction::{
    Actor, Aggregator, DedupGuard, Interaction, InteractionDetail, InteractionKind, InteractionSummary, ReviewBody,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::repository::{InteractionRepository, ListingRepository};
use crate::{CoreError, CoreResult};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    listings: BTreeMap<i64, Listing>,
    interactions: Vec<Interaction>,
}

impl MemoryState {
    fn ensure_listing(&self, listing_id: i64) -> CoreResult<()> {
        if self.listings.contains_key(&listing_id) {
            Ok(())
        } else {
            Err(CoreError::NotFound(format!("listing {listing_id}")))
        }
    }

    fn review_mut(&mut self, review_id: Uuid) -> CoreResult<&mut Interaction> {
        self.interactions
            .iter_mut()
            .find(|i| i.id == review_id && i.kind() == InteractionKind::Review)
            .ok_or_else(|| CoreError::NotFound(format!("review {review_id}")))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn interaction_count(&self, kind: InteractionKind) -> usize {
        self.state.read().await.interactions.iter().filter(|i| i.kind() == kind).count()
    }

    /// Inserts an interaction verbatim, bypassing the guard. Used to seed history.
    pub async fn insert_interaction(&self, interaction: Interaction) {
        self.state.write().await.interactions.push(interaction);
    }
}

#[async_trait]
impl ListingRepository for MemoryStore {
    async fn create_listing(&self, listing: NewListing) -> CoreResult<Listing> {
        let mut state = self.state.write().await;
        let slug = listing.slug();
        if state.listings.values().any(|l| l.slug == slug) {
            return Err(CoreError::Conflict(format!("slug '{slug}' is already taken")));
        }

        state.last_id += 1;
        let listing = listing.into_listing(state.last_id, Utc::now());
        state.listings.insert(listing.id, listing.clone());
        debug!(listing_id = listing.id, slug = %listing.slug, "listing stored");
        Ok(listing)
    }

    async fn find_by_slug(&self, slug: &str) -> CoreResult<Option<Listing>> {
        let state = self.state.read().await;
        Ok(state.listings.values().find(|l| l.slug == slug).cloned())
    }

    async fn list_listings(&self) -> CoreResult<Vec<Listing>> {
        Ok(self.state.read().await.listings.values().cloned().collect())
    }

    async fn update_configs(&self, listing_id: i64, configs: &ListingConfigs) -> CoreResult<Listing> {
        let mut state = self.state.write().await;
        let listing = state
            .listings
            .get_mut(&listing_id)
            .ok_or_else(|| CoreError::NotFound(format!("listing {listing_id}")))?;
        listing.configs = configs.clone();
        Ok(listing.clone())
    }

    async fn delete_listing(&self, listing_id: i64) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.listings.remove(&listing_id).is_none() {
            return Err(CoreError::NotFound(format!("listing {listing_id}")));
        }
        state.interactions.retain(|i| i.listing_id != listing_id);
        Ok(())
    }
}

#[async_trait]
impl InteractionRepository for MemoryStore {
    async fn record_vote(
        &self,
        listing_id: i64,
        actor: Actor,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction> {
        let mut state = self.state.write().await;
        state.ensure_listing(listing_id)?;
        guard.check_vote(listing_id, &actor, &state.interactions, now)?;

        let vote = Interaction::vote(listing_id, actor, now);
        state.interactions.push(vote.clone());
        Ok(vote)
    }

    async fn record_click(&self, listing_id: i64, actor: Actor, now: DateTime<Utc>) -> CoreResult<Interaction> {
        let mut state = self.state.write().await;
        state.ensure_listing(listing_id)?;

        let click = Interaction::click(listing_id, actor, now);
        state.interactions.push(click.clone());
        Ok(click)
    }

    async fn publish_review(
        &self,
        listing_id: i64,
        user_id: Uuid,
        body: ReviewBody,
        guard: &DedupGuard,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction> {
        let mut state = self.state.write().await;
        state.ensure_listing(listing_id)?;
        guard.check_review(listing_id, user_id, &state.interactions)?;

        let review = Interaction::review(listing_id, user_id, body, now);
        state.interactions.push(review.clone());
        Ok(review)
    }

    async fn find_review(&self, review_id: Uuid) -> CoreResult<Option<Interaction>> {
        let state = self.state.read().await;
        Ok(state
            .interactions
            .iter()
            .find(|i| i.id == review_id && i.kind() == InteractionKind::Review)
            .cloned())
    }

    async fn update_review(&self, review_id: Uuid, body: &ReviewBody) -> CoreResult<Interaction> {
        let mut state = self.state.write().await;
        let review = state.review_mut(review_id)?;
        review.detail = InteractionDetail::Review(body.clone());
        Ok(review.clone())
    }

    async fn delete_review(&self, review_id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().await;
        state.review_mut(review_id)?;
        state.interactions.retain(|i| i.id != review_id);
        Ok(())
    }

    async fn list_reviews(&self, listing_id: i64) -> CoreResult<Vec<Interaction>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Interaction> = state
            .interactions
            .iter()
            .filter(|i| i.listing_id == listing_id && i.kind() == InteractionKind::Review)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn summarize_listing(
        &self,
        listing_id: i64,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<InteractionSummary> {
        let state = self.state.read().await;
        Ok(aggregator.aggregate(listing_id, &state.interactions, now))
    }

    async fn summarize_all(
        &self,
        aggregator: &Aggregator,
        now: DateTime<Utc>,
    ) -> CoreResult<HashMap<i64, InteractionSummary>> {
        let state = self.state.read().await;
        Ok(aggregator.aggregate_all(&state.interactions, now))
    }
}
