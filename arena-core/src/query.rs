//! Parsing of the `/servers/{exp_group}/{mode}/{sort}/{orderBy}` segments.

use arena_catalog::{Mode, RateGroup};
use std::str::FromStr;

use crate::filter::{AggregatedListing, ListingFilter, Selection, SortColumn, SortDirection};
use crate::{CoreError, CoreResult};

/// A fully validated listing query. Unknown values never reach the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingQuery {
    pub exp_group: Selection<RateGroup>,
    pub mode: Selection<Mode>,
    pub tag: Selection<String>,
    pub sort: SortColumn,
    pub direction: SortDirection,
    pub limit: Option<usize>,
}

fn is_wildcard(segment: &str) -> bool {
    segment.is_empty() || segment.eq_ignore_ascii_case("all") || segment.eq_ignore_ascii_case("any")
}

fn selection<T>(field: &'static str, segment: &str, allowed: &[&str]) -> CoreResult<Selection<T>>
where
    T: FromStr,
{
    if is_wildcard(segment) {
        return Ok(Selection::All);
    }
    segment
        .parse::<T>()
        .map(Selection::Only)
        .map_err(|_| CoreError::InvalidFilterValue {
            field,
            value: segment.to_string(),
            allowed: std::iter::once("all").chain(allowed.iter().copied()).map(String::from).collect(),
        })
}

impl ListingQuery {
    /// Parses raw path segments. Empty, `all` and `any` mean "no constraint";
    /// a wildcard sort falls back to `rank`.
    pub fn parse(exp_group: &str, mode: &str, sort: &str, order_by: &str) -> CoreResult<Self> {
        let exp_group = selection::<RateGroup>("exp_group", exp_group, &RateGroup::NAMES)?;
        let mode = selection::<Mode>("mode", mode, &Mode::NAMES)?;

        let sort = if is_wildcard(sort) {
            SortColumn::Rank
        } else {
            sort.parse::<SortColumn>()
                .map_err(|e| CoreError::InvalidSortColumn {
                    column: e.0,
                    allowed: SortColumn::names(),
                })?
        };

        let direction = if order_by.is_empty() {
            SortDirection::Desc
        } else {
            order_by
                .parse::<SortDirection>()
                .map_err(|value| CoreError::InvalidFilterValue {
                    field: "orderBy",
                    value,
                    allowed: SortDirection::NAMES.iter().map(|s| s.to_string()).collect(),
                })?
        };

        Ok(Self {
            exp_group,
            mode,
            tag: Selection::All,
            sort,
            direction,
            limit: None,
        })
    }

    pub fn sorted_by(sort: SortColumn, direction: SortDirection) -> Self {
        Self {
            sort,
            direction,
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = match tag {
            Some(t) if !is_wildcard(t.trim()) => Selection::Only(t.trim().to_string()),
            _ => Selection::All,
        };
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Filters first, then sorts, then truncates.
    pub fn apply<'a>(&self, listings: &'a [AggregatedListing]) -> ListingFilter<'a> {
        let view = ListingFilter::new(listings)
            .filter_mode(self.mode)
            .filter_group(self.exp_group)
            .filter_tag(self.tag.as_ref().map_only(String::as_str))
            .filter_sort(self.sort, self.direction);

        match self.limit {
            Some(n) => view.take(n),
            None => view,
        }
    }
}
