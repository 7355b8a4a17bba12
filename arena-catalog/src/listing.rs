use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::mode::Mode;
use crate::rate_group::{RateGroup, RateThresholds};

/// Key inside `configs` that drives rate-group classification.
pub const BASE_EXP_RATE: &str = "base_exp_rate";

/// Free-form label shared between listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Tags are compared trimmed and lowercased.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, name: &str) -> bool {
        self.0 == name.trim().to_lowercase()
    }
}

/// Owner-editable rate tuning values (`base_exp_rate`, `job_exp_rate`, `drop_card_rate`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ListingConfigs(BTreeMap<String, f64>);

impl ListingConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn base_exp_rate(&self) -> Option<f64> {
        self.get(BASE_EXP_RATE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for ListingConfigs {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stored statistics bucket. `rank` is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingStatistics {
    pub rank: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ListingStatistics {
    pub fn ranked(rank: i64) -> Self {
        Self { rank, extra: BTreeMap::new() }
    }
}

/// A single advertised game server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: i64,
    /// External identity, unique across listings.
    pub slug: String,
    pub name: String,
    pub website: String,
    pub description: String,
    pub banner_url: Option<String>,
    pub episode: f64,
    pub configs: ListingConfigs,
    pub statistics: ListingStatistics,
    pub owner_id: Uuid,
    pub mode: Mode,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn rank(&self) -> i64 {
        self.statistics.rank
    }

    /// `None` when the owner never configured a base experience rate.
    pub fn rate_group(&self, thresholds: &RateThresholds) -> Option<RateGroup> {
        self.configs.base_exp_rate().map(|rate| thresholds.classify(rate))
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.matches(name))
    }
}

/// Listing submission as received from an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub website: String,
    #[serde(default)]
    pub description: String,
    pub banner_url: Option<String>,
    pub episode: f64,
    #[serde(default)]
    pub configs: ListingConfigs,
    pub mode: Mode,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub owner_id: Uuid,
}

impl NewListing {
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Deduplicated, normalized tag set.
    pub fn tag_set(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Tag::new(t))
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Materializes the stored listing once the store has issued an id.
    pub fn into_listing(self, id: i64, created_at: DateTime<Utc>) -> Listing {
        let slug = self.slug();
        let tags = self.tag_set();
        Listing {
            id,
            slug,
            name: self.name,
            website: self.website,
            description: self.description,
            banner_url: self.banner_url,
            episode: self.episode,
            configs: self.configs,
            statistics: ListingStatistics::ranked(crate::rank::assign_rank(id)),
            owner_id: self.owner_id,
            mode: self.mode,
            tags,
            created_at,
        }
    }
}

/// Lowercase ASCII slug; every run of other characters becomes a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
