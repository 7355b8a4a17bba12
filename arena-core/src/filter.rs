//! Listing filter/sort engine.
//!
//! [`ListingFilter`] is a view over a borrowed slice of aggregated listings.
//! Every operation returns a fresh view; neither the previous view nor the
//! underlying records are touched, so filters compose in any order.

use arena_catalog::{Listing, Mode, RateGroup, RateThresholds};
use arena_interaction::InteractionSummary;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A listing joined with its interaction statistics for the current window.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub votes_count: u64,
    pub clicks_count: u64,
    pub reviews_count: u64,
    pub average_score: Option<f64>,
    pub rate_group: Option<RateGroup>,
    pub exp_rate_title: Option<&'static str>,
}

impl AggregatedListing {
    pub fn new(listing: Listing, summary: &InteractionSummary, thresholds: &RateThresholds) -> Self {
        let rate_group = listing.rate_group(thresholds);
        Self {
            listing,
            votes_count: summary.votes_count,
            clicks_count: summary.clicks_count,
            reviews_count: summary.reviews_count,
            average_score: summary.average_score,
            rate_group,
            exp_rate_title: rate_group.map(|g| g.title()),
        }
    }
}

/// `"all"` or one concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn as_ref(&self) -> Selection<&T> {
        match self {
            Selection::All => Selection::All,
            Selection::Only(v) => Selection::Only(v),
        }
    }

    pub fn map_only<U, F: FnOnce(T) -> U>(self, f: F) -> Selection<U> {
        match self {
            Selection::All => Selection::All,
            Selection::Only(v) => Selection::Only(f(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Rank,
    VotesCount,
    ClicksCount,
    CreatedAt,
    Episode,
    Name,
}

impl SortColumn {
    pub const ALL: [SortColumn; 6] = [
        SortColumn::Rank,
        SortColumn::VotesCount,
        SortColumn::ClicksCount,
        SortColumn::CreatedAt,
        SortColumn::Episode,
        SortColumn::Name,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SortColumn::Rank => "rank",
            SortColumn::VotesCount => "votes_count",
            SortColumn::ClicksCount => "clicks_count",
            SortColumn::CreatedAt => "created_at",
            SortColumn::Episode => "episode",
            SortColumn::Name => "name",
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|c| c.name().to_string()).collect()
    }

    fn compare(&self, a: &AggregatedListing, b: &AggregatedListing) -> Ordering {
        match self {
            SortColumn::Rank => a.listing.rank().cmp(&b.listing.rank()),
            SortColumn::VotesCount => a.votes_count.cmp(&b.votes_count),
            SortColumn::ClicksCount => a.clicks_count.cmp(&b.clicks_count),
            SortColumn::CreatedAt => a.listing.created_at.cmp(&b.listing.created_at),
            SortColumn::Episode => a.listing.episode.total_cmp(&b.listing.episode),
            SortColumn::Name => a
                .listing
                .name
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.listing.name.chars().flat_map(char::to_lowercase)),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortColumn(pub String);

impl FromStr for SortColumn {
    type Err = UnknownSortColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortColumn::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSortColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const NAMES: [&'static str; 2] = ["asc", "desc"];
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(s.to_string())
        }
    }
}

/// Chainable, non-destructive view over aggregated listings.
#[derive(Debug, Clone)]
pub struct ListingFilter<'a> {
    entries: Vec<&'a AggregatedListing>,
}

impl<'a> ListingFilter<'a> {
    pub fn new(listings: &'a [AggregatedListing]) -> Self {
        Self {
            entries: listings.iter().collect(),
        }
    }

    fn retain<F>(&self, keep: F) -> Self
    where
        F: Fn(&AggregatedListing) -> bool,
    {
        Self {
            entries: self.entries.iter().copied().filter(|entry| keep(entry)).collect(),
        }
    }

    pub fn filter_mode(&self, mode: Selection<Mode>) -> Self {
        match mode {
            Selection::All => self.clone(),
            Selection::Only(mode) => self.retain(|entry| entry.listing.mode == mode),
        }
    }

    /// Listings without a base rate never match a concrete group.
    pub fn filter_group(&self, group: Selection<RateGroup>) -> Self {
        match group {
            Selection::All => self.clone(),
            Selection::Only(group) => self.retain(|entry| entry.rate_group == Some(group)),
        }
    }

    pub fn filter_tag(&self, tag: Selection<&str>) -> Self {
        match tag {
            Selection::All => self.clone(),
            Selection::Only(tag) => self.retain(|entry| entry.listing.has_tag(tag)),
        }
    }

    /// Stable: entries with equal keys keep their current relative order.
    pub fn filter_sort(&self, column: SortColumn, direction: SortDirection) -> Self {
        let mut entries = self.entries.clone();
        match direction {
            SortDirection::Asc => entries.sort_by(|a, b| column.compare(a, b)),
            SortDirection::Desc => entries.sort_by(|a, b| column.compare(b, a)),
        }
        Self { entries }
    }

    /// First `n` entries in the current order.
    pub fn take(&self, n: usize) -> Self {
        Self {
            entries: self.entries.iter().copied().take(n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&'a AggregatedListing> {
        self.entries.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a AggregatedListing> + '_ {
        self.entries.iter().copied()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.listing.id).collect()
    }

    pub fn to_vec(&self) -> Vec<AggregatedListing> {
        self.entries.iter().map(|e| (*e).clone()).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arena_catalog::{ListingConfigs, ListingStatistics, Tag, BASE_EXP_RATE};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    pub(crate) fn thresholds() -> RateThresholds {
        RateThresholds::new(100.0, 500.0, 2000.0).unwrap()
    }

    pub(crate) fn entry(id: i64, mode: Mode, base_rate: f64, tags: &[&str], votes: u64) -> AggregatedListing {
        let listing = Listing {
            id,
            slug: format!("listing-{id}"),
            name: format!("Listing {id}"),
            website: "https://example.org".to_string(),
            description: String::new(),
            banner_url: None,
            episode: 13.0,
            configs: ListingConfigs::new().with(BASE_EXP_RATE, base_rate),
            statistics: ListingStatistics::ranked(id),
            owner_id: Uuid::nil(),
            mode,
            tags: tags.iter().map(|t| Tag::new(t)).collect(),
            created_at: Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap() + Duration::days(id),
        };
        let mut summary = InteractionSummary::empty(id);
        summary.votes_count = votes;
        AggregatedListing::new(listing, &summary, &thresholds())
    }

    #[test]
    fn test_filter_mode_keeps_matching_listings() {
        let listings = vec![
            entry(1, Mode::Renewal, 50.0, &[], 0),
            entry(2, Mode::Classic, 50.0, &[], 0),
            entry(3, Mode::Renewal, 50.0, &[], 0),
            entry(4, Mode::Custom, 50.0, &[], 0),
            entry(5, Mode::PreRenewal, 50.0, &[], 0),
        ];
        let filter = ListingFilter::new(&listings);

        assert_eq!(filter.filter_mode(Selection::Only(Mode::Renewal)).ids(), vec![1, 3]);
        let sorted_first = filter
            .filter_sort(SortColumn::Rank, SortDirection::Desc)
            .filter_mode(Selection::Only(Mode::Renewal));
        assert_eq!(sorted_first.len(), 2);
    }

    #[test]
    fn test_filter_group_uses_classification() {
        let listings = vec![
            entry(1, Mode::Renewal, 150.0, &[], 0),
            entry(2, Mode::Renewal, 20.0, &[], 0),
            entry(3, Mode::Renewal, 100.0, &[], 0),
        ];
        let low = ListingFilter::new(&listings).filter_group(Selection::Only(RateGroup::LowRate));
        assert_eq!(low.ids(), vec![2, 3]);
    }

    #[test]
    fn test_filter_tag() {
        let listings = vec![
            entry(1, Mode::Renewal, 50.0, &["pvp", "woe"], 0),
            entry(2, Mode::Renewal, 50.0, &["woe"], 0),
        ];
        let filter = ListingFilter::new(&listings);
        assert_eq!(filter.filter_tag(Selection::Only("PvP")).ids(), vec![1]);
        assert!(filter.filter_tag(Selection::Only("gvg")).is_empty());
    }

    #[test]
    fn test_votes_desc_keeps_ties_in_input_order() {
        let listings = vec![
            entry(1, Mode::Renewal, 50.0, &[], 0),
            entry(2, Mode::Renewal, 50.0, &[], 1),
            entry(3, Mode::Renewal, 50.0, &[], 0),
        ];
        let sorted = ListingFilter::new(&listings).filter_sort(SortColumn::VotesCount, SortDirection::Desc);
        assert_eq!(sorted.ids(), vec![2, 1, 3]);
    }

    #[test]
    fn test_sort_by_episode_and_name() {
        let mut a = entry(1, Mode::Renewal, 50.0, &[], 0);
        a.listing.episode = 2.0;
        a.listing.name = "b server".to_string();
        let mut b = entry(2, Mode::Renewal, 50.0, &[], 0);
        b.listing.episode = 1.0;
        b.listing.name = "A server".to_string();
        let listings = vec![a, b];
        let filter = ListingFilter::new(&listings);

        assert_eq!(filter.filter_sort(SortColumn::Episode, SortDirection::Asc).ids(), vec![2, 1]);
        assert_eq!(filter.filter_sort(SortColumn::Name, SortDirection::Asc).ids(), vec![2, 1]);
        assert_eq!(filter.filter_sort(SortColumn::CreatedAt, SortDirection::Desc).ids(), vec![2, 1]);
    }

    #[test]
    fn test_operations_do_not_touch_previous_view() {
        let listings = vec![
            entry(1, Mode::Renewal, 50.0, &[], 3),
            entry(2, Mode::Classic, 50.0, &[], 5),
        ];
        let base = ListingFilter::new(&listings);
        let _narrowed = base.filter_mode(Selection::Only(Mode::Classic)).take(0);
        let _sorted = base.filter_sort(SortColumn::VotesCount, SortDirection::Desc);

        assert_eq!(base.ids(), vec![1, 2]);
        assert_eq!(listings[0].listing.id, 1);
    }

    #[test]
    fn test_empty_collection_yields_empty_results() {
        let listings: Vec<AggregatedListing> = Vec::new();
        let filter = ListingFilter::new(&listings)
            .filter_mode(Selection::Only(Mode::Custom))
            .filter_group(Selection::Only(RateGroup::HighRate))
            .filter_tag(Selection::Only("pvp"))
            .filter_sort(SortColumn::Name, SortDirection::Asc)
            .take(10);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_sort_column_parse() {
        assert_eq!("clicks_count".parse::<SortColumn>().unwrap(), SortColumn::ClicksCount);
        assert_eq!("Votes_Count".parse::<SortColumn>().unwrap(), SortColumn::VotesCount);
        assert_eq!("CREATED_AT".parse::<SortColumn>().unwrap(), SortColumn::CreatedAt);
        assert_eq!(
            "id; drop table listings".parse::<SortColumn>(),
            Err(UnknownSortColumn("id; drop table listings".to_string()))
        );
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    const MODES: [Mode; 4] = Mode::ALL;
    const RATES: [f64; 4] = [50.0, 300.0, 1500.0, 9000.0];
    const TAGS: [&str; 3] = ["pvp", "woe", "quest"];

    fn arb_listings() -> impl Strategy<Value = Vec<AggregatedListing>> {
        prop::collection::vec((0..4usize, 0..4usize, 0..3usize, 0..4u64), 0..24).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (m, r, t, v))| entry(i as i64 + 1, MODES[m], RATES[r], &[TAGS[t]], v))
                .collect()
        })
    }

    fn apply_in_order(
        filter: &ListingFilter<'_>,
        order: &[usize],
        mode: Selection<Mode>,
        group: Selection<RateGroup>,
        tag: Selection<&str>,
    ) -> Vec<i64> {
        let mut view = filter.clone();
        for step in order {
            view = match step {
                0 => view.filter_mode(mode),
                1 => view.filter_group(group),
                _ => view.filter_tag(tag),
            };
        }
        let mut ids = view.ids();
        ids.sort_unstable();
        ids
    }

    proptest! {
        #[test]
        fn prop_filters_commute(
            listings in arb_listings(),
            m in 0..4usize,
            g in 0..4usize,
            t in 0..3usize,
            order in Just(vec![0usize, 1, 2]).prop_shuffle(),
        ) {
            let filter = ListingFilter::new(&listings);
            let mode = Selection::Only(MODES[m]);
            let group = Selection::Only(RateGroup::ALL[g]);
            let tag = Selection::Only(TAGS[t]);

            let expected: Vec<i64> = listings
                .iter()
                .filter(|e| e.listing.mode == MODES[m])
                .filter(|e| e.rate_group == Some(RateGroup::ALL[g]))
                .filter(|e| e.listing.has_tag(TAGS[t]))
                .map(|e| e.listing.id)
                .collect();

            prop_assert_eq!(apply_in_order(&filter, &order, mode, group, tag), expected);
        }

        #[test]
        fn prop_all_filters_are_identity(listings in arb_listings()) {
            let filter = ListingFilter::new(&listings);
            let view = filter
                .filter_mode(Selection::All)
                .filter_group(Selection::All)
                .filter_tag(Selection::All);
            prop_assert_eq!(view.ids(), filter.ids());
        }

        #[test]
        fn prop_sort_is_stable(listings in arb_listings(), asc in any::<bool>()) {
            let direction = if asc { SortDirection::Asc } else { SortDirection::Desc };
            let sorted = ListingFilter::new(&listings).filter_sort(SortColumn::VotesCount, direction);
            let entries: Vec<&AggregatedListing> = sorted.iter().collect();
            for pair in entries.windows(2) {
                if pair[0].votes_count == pair[1].votes_count {
                    prop_assert!(pair[0].listing.id < pair[1].listing.id);
                }
            }
        }

        #[test]
        fn prop_take_is_bounded_prefix(listings in arb_listings(), n in 0..30usize) {
            let sorted = ListingFilter::new(&listings).filter_sort(SortColumn::VotesCount, SortDirection::Desc);
            let taken = sorted.take(n);
            prop_assert_eq!(taken.len(), n.min(listings.len()));
            prop_assert_eq!(&sorted.ids()[..taken.len()], &taken.ids()[..]);
        }
    }
}
