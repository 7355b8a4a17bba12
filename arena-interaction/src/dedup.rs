//! At-most-one policies for votes and reviews.
//!
//! These checks decide whether a write is allowed given the existing history.
//! They do not close the race between concurrent submissions; stores call them
//! while holding their own per-(listing, actor) serialization.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Actor, Interaction, InteractionError, InteractionKind};

#[derive(Debug, Clone, Copy)]
pub struct DedupGuard {
    vote_cooldown: Duration,
}

impl DedupGuard {
    pub fn new(vote_cooldown: Duration) -> Self {
        Self { vote_cooldown }
    }

    pub fn from_hours(hours: u32) -> Self {
        Self::new(Duration::hours(hours as i64))
    }

    pub fn vote_cooldown(&self) -> Duration {
        self.vote_cooldown
    }

    /// `now - cooldown`, clamped to the earliest representable instant.
    pub fn cooldown_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.vote_cooldown)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// False when `actor` already voted for `listing_id` after `now - cooldown`.
    pub fn can_vote(&self, listing_id: i64, actor: &Actor, history: &[Interaction], now: DateTime<Utc>) -> bool {
        let since = self.cooldown_start(now);
        !history.iter().any(|i| {
            i.listing_id == listing_id
                && i.kind() == InteractionKind::Vote
                && i.is_by(actor)
                && i.created_at > since
        })
    }

    /// One review per user per listing, for the listing's whole lifetime.
    pub fn can_review(&self, listing_id: i64, user_id: Uuid, history: &[Interaction]) -> bool {
        let actor = Actor::User(user_id);
        !history
            .iter()
            .any(|i| i.listing_id == listing_id && i.kind() == InteractionKind::Review && i.is_by(&actor))
    }

    pub fn check_vote(
        &self,
        listing_id: i64,
        actor: &Actor,
        history: &[Interaction],
        now: DateTime<Utc>,
    ) -> Result<(), InteractionError> {
        if self.can_vote(listing_id, actor, history, now) {
            return Ok(());
        }
        debug!(listing_id, %actor, "vote rejected inside cooldown");
        Err(InteractionError::Duplicate {
            kind: InteractionKind::Vote,
            listing_id,
            actor: *actor,
        })
    }

    pub fn check_review(&self, listing_id: i64, user_id: Uuid, history: &[Interaction]) -> Result<(), InteractionError> {
        if self.can_review(listing_id, user_id, history) {
            return Ok(());
        }
        debug!(listing_id, %user_id, "review rejected, user already reviewed");
        Err(InteractionError::Duplicate {
            kind: InteractionKind::Review,
            listing_id,
            actor: Actor::User(user_id),
        })
    }
}
