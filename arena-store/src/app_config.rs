use arena_catalog::{ConfigurationError, RateThresholds};
use arena_interaction::{Aggregator, DedupGuard};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub interactions: InteractionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Tokens are minted by the account service; only the shared secret lives here.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// `filter.exp.<group>.max` upper bounds. Left optional here so a missing key
/// surfaces as a `ConfigurationError` instead of a generic parse failure.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub exp: ExpRateConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExpRateConfig {
    #[serde(rename = "low-rate", default)]
    pub low_rate: RateBound,
    #[serde(rename = "mid-rate", default)]
    pub mid_rate: RateBound,
    #[serde(rename = "high-rate", default)]
    pub high_rate: RateBound,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RateBound {
    pub max: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InteractionsConfig {
    #[serde(default = "default_vote_cooldown_hours")]
    pub vote_cooldown_hours: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

fn default_vote_cooldown_hours() -> u32 { 24 }
fn default_window_days() -> u32 { 30 }
fn default_sort() -> String { "votes_count".to_string() }

/// One year.
pub const MAX_VOTE_COOLDOWN_HOURS: u32 = 24 * 366;
/// Ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

fn within(name: &'static str, value: u32, max: u32) -> Result<u32, ConfigurationError> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigurationError::OutOfRange { name, value, min: 1, max })
    }
}

impl Default for InteractionsConfig {
    fn default() -> Self {
        Self {
            vote_cooldown_hours: default_vote_cooldown_hours(),
            window_days: default_window_days(),
            default_sort: default_sort(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overlay
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ARENA__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("ARENA").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn rate_thresholds(&self) -> Result<RateThresholds, ConfigurationError> {
        let exp = &self.filter.exp;
        RateThresholds::from_optional(exp.low_rate.max, exp.mid_rate.max, exp.high_rate.max)
    }

    pub fn dedup_guard(&self) -> Result<DedupGuard, ConfigurationError> {
        let hours = within(
            "interactions.vote_cooldown_hours",
            self.interactions.vote_cooldown_hours,
            MAX_VOTE_COOLDOWN_HOURS,
        )?;
        Ok(DedupGuard::from_hours(hours))
    }

    pub fn aggregator(&self) -> Result<Aggregator, ConfigurationError> {
        let days = within("interactions.window_days", self.interactions.window_days, MAX_WINDOW_DAYS)?;
        Ok(Aggregator::new(days))
    }
}
