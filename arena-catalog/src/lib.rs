pub mod listing;
pub mod mode;
pub mod rate_group;
pub mod rank;

pub use listing::{slugify, BASE_EXP_RATE, Listing, ListingConfigs, ListingStatistics, NewListing, Tag};
pub use mode::{Mode, UnknownMode};
pub use rate_group::{classify, ConfigurationError, RateGroup, RateThresholds, UnknownRateGroup};
pub use rank::assign_rank;
