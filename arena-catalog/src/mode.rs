use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game ruleset a listed server runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Renewal,
    PreRenewal,
    Classic,
    Custom,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Renewal, Mode::PreRenewal, Mode::Classic, Mode::Custom];

    /// Machine names as they appear in URL segments.
    pub const NAMES: [&'static str; 4] = ["renewal", "pre-renewal", "classic", "custom"];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Renewal => "renewal",
            Mode::PreRenewal => "pre-renewal",
            Mode::Classic => "classic",
            Mode::Custom => "custom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Renewal => "Renewal",
            Mode::PreRenewal => "Pre-Renewal",
            Mode::Classic => "Classic",
            Mode::Custom => "Custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}
