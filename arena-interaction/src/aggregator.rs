//! Read-only projection of a listing's interactions.
//!
//! Recomputed on every query; nothing here is cached or stored.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Interaction, InteractionDetail};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSummary {
    pub listing_id: i64,
    pub votes_count: u64,
    pub clicks_count: u64,
    pub reviews_count: u64,
    /// Mean of every review score ever published. `None` means "no reviews",
    /// which is deliberately distinct from an average of zero.
    pub average_score: Option<f64>,
}

impl InteractionSummary {
    pub fn empty(listing_id: i64) -> Self {
        Self {
            listing_id,
            votes_count: 0,
            clicks_count: 0,
            reviews_count: 0,
            average_score: None,
        }
    }
}

#[derive(Default)]
struct Tally {
    votes: u64,
    clicks: u64,
    reviews: u64,
    score_sum: i64,
}

impl Tally {
    fn into_summary(self, listing_id: i64) -> InteractionSummary {
        InteractionSummary {
            listing_id,
            votes_count: self.votes,
            clicks_count: self.clicks,
            reviews_count: self.reviews,
            average_score: (self.reviews > 0).then(|| self.score_sum as f64 / self.reviews as f64),
        }
    }
}

/// Counts votes and clicks inside a rolling window of `window_days`.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    window: Duration,
}

impl Aggregator {
    pub fn new(window_days: u32) -> Self {
        Self {
            window: Duration::days(window_days as i64),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window.num_days()
    }

    /// `now - window`, clamped to the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// `(now - window, now]`: events exactly at the cutoff are already too old.
    pub fn in_window(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        at > self.cutoff(now) && at <= now
    }

    fn add(&self, tally: &mut Tally, interaction: &Interaction, now: DateTime<Utc>) {
        match &interaction.detail {
            InteractionDetail::Vote if self.in_window(interaction.created_at, now) => tally.votes += 1,
            InteractionDetail::Click if self.in_window(interaction.created_at, now) => tally.clicks += 1,
            InteractionDetail::Review(body) => {
                tally.reviews += 1;
                tally.score_sum += body.score as i64;
            }
            _ => {}
        }
    }

    /// Summary for one listing. Interactions of other listings are ignored.
    pub fn aggregate(&self, listing_id: i64, interactions: &[Interaction], now: DateTime<Utc>) -> InteractionSummary {
        let mut tally = Tally::default();
        for interaction in interactions.iter().filter(|i| i.listing_id == listing_id) {
            self.add(&mut tally, interaction, now);
        }
        tally.into_summary(listing_id)
    }

    /// Summaries for every listing that has at least one interaction.
    pub fn aggregate_all(&self, interactions: &[Interaction], now: DateTime<Utc>) -> HashMap<i64, InteractionSummary> {
        let mut tallies: HashMap<i64, Tally> = HashMap::new();
        for interaction in interactions {
            let tally = tallies.entry(interaction.listing_id).or_default();
            self.add(tally, interaction, now);
        }

        tallies
            .into_iter()
            .map(|(listing_id, tally)| (listing_id, tally.into_summary(listing_id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Actor, ReviewBody};
    use std::net::IpAddr;
    use uuid::Uuid;

    fn ip(last: u8) -> Actor {
        Actor::Address(IpAddr::from([10, 0, 0, last]))
    }

    #[test]
    fn test_votes_outside_window_are_ignored() {
        let now = Utc::now();
        let aggregator = Aggregator::new(30);
        let interactions = vec![
            Interaction::vote(1, ip(1), now),
            Interaction::vote(1, ip(2), now - Duration::days(60)),
            Interaction::click(1, ip(1), now - Duration::days(1)),
            Interaction::click(1, ip(3), now - Duration::days(45)),
        ];

        let summary = aggregator.aggregate(1, &interactions, now);
        assert_eq!(summary.votes_count, 1);
        assert_eq!(summary.clicks_count, 1);
    }

    #[test]
    fn test_window_boundaries() {
        let now = Utc::now();
        let aggregator = Aggregator::new(30);
        let cutoff = aggregator.cutoff(now);

        assert!(aggregator.in_window(now, now));
        assert!(!aggregator.in_window(cutoff, now));
        assert!(aggregator.in_window(cutoff + Duration::seconds(1), now));
        assert!(!aggregator.in_window(now + Duration::seconds(1), now));
    }

    #[test]
    fn test_huge_window_reaches_back_to_the_start() {
        let now = Utc::now();
        let aggregator = Aggregator::new(u32::MAX);
        assert_eq!(aggregator.cutoff(now), DateTime::<Utc>::MIN_UTC);

        let interactions = vec![Interaction::vote(1, ip(1), now - Duration::days(20_000))];
        assert_eq!(aggregator.aggregate(1, &interactions, now).votes_count, 1);
    }

    #[test]
    fn test_average_score_spans_all_time() {
        let now = Utc::now();
        let aggregator = Aggregator::new(30);
        let interactions = vec![
            Interaction::review(1, Uuid::new_v4(), ReviewBody::new("old", 2).unwrap(), now - Duration::days(400)),
            Interaction::review(1, Uuid::new_v4(), ReviewBody::new("new", 5).unwrap(), now),
        ];

        let summary = aggregator.aggregate(1, &interactions, now);
        assert_eq!(summary.reviews_count, 2);
        assert_eq!(summary.average_score, Some(3.5));
    }

    #[test]
    fn test_no_reviews_is_not_zero() {
        let now = Utc::now();
        let summary = Aggregator::new(30).aggregate(1, &[Interaction::vote(1, ip(1), now)], now);
        assert_eq!(summary.average_score, None);
        assert_eq!(InteractionSummary::empty(9).average_score, None);
    }

    #[test]
    fn test_aggregate_all_groups_by_listing() {
        let now = Utc::now();
        let interactions = vec![
            Interaction::vote(1, ip(1), now),
            Interaction::vote(2, ip(1), now),
            Interaction::vote(2, ip(2), now),
        ];

        let summaries = Aggregator::new(30).aggregate_all(&interactions, now);
        assert_eq!(summaries[&1].votes_count, 1);
        assert_eq!(summaries[&2].votes_count, 2);
        assert!(!summaries.contains_key(&3));
    }
}
