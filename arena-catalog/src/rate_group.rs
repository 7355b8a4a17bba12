//! Experience-rate tiers.
//!
//! A listing's tier is never stored. It is derived from `configs.base_exp_rate`
//! against three externally configured upper bounds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered experience-rate tier, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RateGroup {
    LowRate,
    MidRate,
    HighRate,
    SuperHighRate,
}

impl RateGroup {
    pub const ALL: [RateGroup; 4] = [
        RateGroup::LowRate,
        RateGroup::MidRate,
        RateGroup::HighRate,
        RateGroup::SuperHighRate,
    ];

    pub const NAMES: [&'static str; 4] = ["low-rate", "mid-rate", "high-rate", "super-high-rate"];

    pub fn name(&self) -> &'static str {
        match self {
            RateGroup::LowRate => "low-rate",
            RateGroup::MidRate => "mid-rate",
            RateGroup::HighRate => "high-rate",
            RateGroup::SuperHighRate => "super-high-rate",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RateGroup::LowRate => "Low Rate",
            RateGroup::MidRate => "Mid Rate",
            RateGroup::HighRate => "High Rate",
            RateGroup::SuperHighRate => "Super High Rate",
        }
    }
}

impl fmt::Display for RateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rate group '{0}'")]
pub struct UnknownRateGroup(pub String);

impl FromStr for RateGroup {
    type Err = UnknownRateGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RateGroup::ALL
            .into_iter()
            .find(|group| group.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRateGroup(s.to_string()))
    }
}

/// Configuration failures. Always fatal for the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("missing rate threshold: {0}")]
    MissingThreshold(&'static str),

    #[error("rate threshold {name} is not a finite number")]
    NonFiniteThreshold { name: &'static str },

    #[error("rate thresholds are not monotonic: {lower} ({lower_value}) > {upper} ({upper_value})")]
    NonMonotonic {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// Validated upper bounds for the first three tiers.
///
/// Construction is the only place thresholds are checked, so holding a
/// `RateThresholds` means classification cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateThresholds {
    low_max: f64,
    mid_max: f64,
    high_max: f64,
}

impl RateThresholds {
    pub fn new(low_max: f64, mid_max: f64, high_max: f64) -> Result<Self, ConfigurationError> {
        for (name, value) in [("low_max", low_max), ("mid_max", mid_max), ("high_max", high_max)] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFiniteThreshold { name });
            }
        }
        if low_max > mid_max {
            return Err(ConfigurationError::NonMonotonic {
                lower: "low_max",
                lower_value: low_max,
                upper: "mid_max",
                upper_value: mid_max,
            });
        }
        if mid_max > high_max {
            return Err(ConfigurationError::NonMonotonic {
                lower: "mid_max",
                lower_value: mid_max,
                upper: "high_max",
                upper_value: high_max,
            });
        }

        Ok(Self { low_max, mid_max, high_max })
    }

    /// Builds thresholds from possibly-absent configuration values.
    pub fn from_optional(
        low_max: Option<f64>,
        mid_max: Option<f64>,
        high_max: Option<f64>,
    ) -> Result<Self, ConfigurationError> {
        let low_max = low_max.ok_or(ConfigurationError::MissingThreshold("low_max"))?;
        let mid_max = mid_max.ok_or(ConfigurationError::MissingThreshold("mid_max"))?;
        let high_max = high_max.ok_or(ConfigurationError::MissingThreshold("high_max"))?;
        Self::new(low_max, mid_max, high_max)
    }

    pub fn low_max(&self) -> f64 {
        self.low_max
    }

    pub fn mid_max(&self) -> f64 {
        self.mid_max
    }

    pub fn high_max(&self) -> f64 {
        self.high_max
    }

    pub fn classify(&self, base_exp_rate: f64) -> RateGroup {
        classify(base_exp_rate, self)
    }
}

/// Maps a base experience rate onto its tier. Bounds are inclusive.
///
/// NaN compares false against every bound and lands in `SuperHighRate`.
pub fn classify(base_exp_rate: f64, thresholds: &RateThresholds) -> RateGroup {
    if base_exp_rate <= thresholds.low_max {
        RateGroup::LowRate
    } else if base_exp_rate <= thresholds.mid_max {
        RateGroup::MidRate
    } else if base_exp_rate <= thresholds.high_max {
        RateGroup::HighRate
    } else {
        RateGroup::SuperHighRate
    }
}
