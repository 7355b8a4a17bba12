use arena_catalog::{Listing, ListingConfigs, NewListing, RateThresholds};
use arena_interaction::{Actor, Aggregator, DedupGuard, Interaction, InteractionSummary, ReviewBody, ReviewPatch};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::filter::{AggregatedListing, SortColumn, SortDirection};
use crate::query::ListingQuery;
use crate::repository::{InteractionRepository, ListingRepository};
use crate::{CoreError, CoreResult};

/// Everything `GET /listing/{slug}` renders.
#[derive(Debug, Clone, Serialize)]
pub struct ListingProfile {
    pub listing: AggregatedListing,
    pub reviews: Vec<Interaction>,
}

async fn listing_by_slug(listings: &dyn ListingRepository, slug: &str) -> CoreResult<Listing> {
    listings
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("listing '{slug}'")))
}

/// Read side: aggregation, filtering and listing maintenance.
pub struct ListingService {
    listings: Arc<dyn ListingRepository>,
    interactions: Arc<dyn InteractionRepository>,
    thresholds: RateThresholds,
    aggregator: Aggregator,
    default_sort: SortColumn,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        interactions: Arc<dyn InteractionRepository>,
        thresholds: RateThresholds,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            listings,
            interactions,
            thresholds,
            aggregator,
            default_sort: SortColumn::VotesCount,
        }
    }

    pub fn with_default_sort(mut self, column: SortColumn) -> Self {
        self.default_sort = column;
        self
    }

    /// Every listing joined with its statistics at `now`, in id order.
    pub async fn aggregated_listings(&self, now: DateTime<Utc>) -> CoreResult<Vec<AggregatedListing>> {
        let listings = self.listings.list_listings().await?;
        let summaries = self.interactions.summarize_all(&self.aggregator, now).await?;

        Ok(listings
            .into_iter()
            .map(|listing| {
                let summary = summaries
                    .get(&listing.id)
                    .cloned()
                    .unwrap_or_else(|| InteractionSummary::empty(listing.id));
                AggregatedListing::new(listing, &summary, &self.thresholds)
            })
            .collect())
    }

    pub async fn search(&self, query: &ListingQuery, now: DateTime<Utc>) -> CoreResult<Vec<AggregatedListing>> {
        debug!(?query, "listing search");
        let all = self.aggregated_listings(now).await?;
        Ok(query.apply(&all).to_vec())
    }

    /// Index page: every listing by the configured default column, descending.
    pub async fn index(&self, now: DateTime<Utc>) -> CoreResult<Vec<AggregatedListing>> {
        self.search(&ListingQuery::sorted_by(self.default_sort, SortDirection::Desc), now)
            .await
    }

    pub async fn profile(&self, slug: &str, now: DateTime<Utc>) -> CoreResult<ListingProfile> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        let summary = self
            .interactions
            .summarize_listing(listing.id, &self.aggregator, now)
            .await?;
        let reviews = self.interactions.list_reviews(listing.id).await?;

        Ok(ListingProfile {
            listing: AggregatedListing::new(listing, &summary, &self.thresholds),
            reviews,
        })
    }

    pub async fn create_listing(&self, submission: NewListing) -> CoreResult<Listing> {
        if submission.name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".to_string()));
        }
        if submission.slug().is_empty() {
            return Err(CoreError::Validation(format!(
                "name '{}' does not produce a usable slug",
                submission.name
            )));
        }
        if submission.website.trim().is_empty() {
            return Err(CoreError::Validation("website must not be empty".to_string()));
        }
        if !submission.episode.is_finite() {
            return Err(CoreError::Validation("episode must be a finite number".to_string()));
        }
        validate_configs(&submission.configs)?;

        let listing = self.listings.create_listing(submission).await?;
        info!(listing_id = listing.id, slug = %listing.slug, rank = listing.rank(), "listing created");
        Ok(listing)
    }

    pub async fn update_configs(&self, slug: &str, owner_id: Uuid, configs: ListingConfigs) -> CoreResult<Listing> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        if listing.owner_id != owner_id {
            warn!(slug, %owner_id, "config update by non-owner");
            return Err(CoreError::Forbidden("only the owner may edit this listing".to_string()));
        }
        validate_configs(&configs)?;

        let updated = self.listings.update_configs(listing.id, &configs).await?;
        info!(listing_id = updated.id, "listing configs updated");
        Ok(updated)
    }

    pub async fn delete_listing(&self, slug: &str, owner_id: Uuid) -> CoreResult<()> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        if listing.owner_id != owner_id {
            return Err(CoreError::Forbidden("only the owner may delete this listing".to_string()));
        }
        self.listings.delete_listing(listing.id).await?;
        info!(listing_id = listing.id, "listing deleted");
        Ok(())
    }
}

fn validate_configs(configs: &ListingConfigs) -> CoreResult<()> {
    match configs.iter().find(|(_, value)| !value.is_finite() || *value < 0.0) {
        Some((key, value)) => Err(CoreError::Validation(format!(
            "config '{key}' must be a non-negative number, got {value}"
        ))),
        None => Ok(()),
    }
}

/// Write side for votes, clicks and reviews.
pub struct InteractionService {
    listings: Arc<dyn ListingRepository>,
    interactions: Arc<dyn InteractionRepository>,
    guard: DedupGuard,
}

impl InteractionService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        interactions: Arc<dyn InteractionRepository>,
        guard: DedupGuard,
    ) -> Self {
        Self {
            listings,
            interactions,
            guard,
        }
    }

    pub async fn cast_vote(&self, slug: &str, actor: Actor, now: DateTime<Utc>) -> CoreResult<Interaction> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        match self.interactions.record_vote(listing.id, actor, &self.guard, now).await {
            Ok(vote) => {
                info!(listing_id = listing.id, %actor, "vote accepted");
                Ok(vote)
            }
            Err(err) => {
                if let CoreError::DuplicateInteraction { .. } = err {
                    info!(listing_id = listing.id, %actor, "vote rejected");
                }
                Err(err)
            }
        }
    }

    /// Clicks are never deduplicated.
    pub async fn record_click(&self, slug: &str, actor: Actor, now: DateTime<Utc>) -> CoreResult<Interaction> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        let click = self.interactions.record_click(listing.id, actor, now).await?;
        debug!(listing_id = listing.id, %actor, "click recorded");
        Ok(click)
    }

    pub async fn publish_review(
        &self,
        slug: &str,
        user_id: Uuid,
        message: String,
        score: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Interaction> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        let body = ReviewBody::new(message, score)?;
        let review = self
            .interactions
            .publish_review(listing.id, user_id, body, &self.guard, now)
            .await?;
        info!(listing_id = listing.id, %user_id, review_id = %review.id, "review published");
        Ok(review)
    }

    /// Loads a review of `slug` and checks that `user_id` wrote it.
    async fn authored_review(&self, slug: &str, review_id: Uuid, user_id: Uuid) -> CoreResult<(Interaction, ReviewBody)> {
        let listing = listing_by_slug(self.listings.as_ref(), slug).await?;
        let review = self
            .interactions
            .find_review(review_id)
            .await?
            .filter(|r| r.listing_id == listing.id)
            .ok_or_else(|| CoreError::NotFound(format!("review {review_id}")))?;

        if !review.is_by(&Actor::User(user_id)) {
            warn!(%review_id, %user_id, "review edit by non-author");
            return Err(CoreError::Forbidden("only the author may change this review".to_string()));
        }

        let body = review
            .review_body()
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("review {review_id}")))?;
        Ok((review, body))
    }

    pub async fn update_review(
        &self,
        slug: &str,
        review_id: Uuid,
        user_id: Uuid,
        patch: &ReviewPatch,
    ) -> CoreResult<Interaction> {
        let (_, body) = self.authored_review(slug, review_id, user_id).await?;
        let body = body.patched(patch)?;
        let review = self.interactions.update_review(review_id, &body).await?;
        info!(%review_id, "review updated");
        Ok(review)
    }

    pub async fn delete_review(&self, slug: &str, review_id: Uuid, user_id: Uuid) -> CoreResult<()> {
        self.authored_review(slug, review_id, user_id).await?;
        self.interactions.delete_review(review_id).await?;
        info!(%review_id, "review deleted");
        Ok(())
    }
}
