//! Seasons and live time windows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the five ranking periods of the creator program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    S1,
    S2,
    S3,
    S4,
    S5,
}

impl Season {
    /// Closed seasons, served from the snapshot store.
    pub const HISTORICAL: [Season; 4] = [Season::S1, Season::S2, Season::S3, Season::S4];

    /// The season ranked by the live upstream API.
    pub const LIVE: Season = Season::S5;

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::S1 => "s1",
            Season::S2 => "s2",
            Season::S3 => "s3",
            Season::S4 => "s4",
            Season::S5 => "s5",
        }
    }

    pub fn is_live(&self) -> bool {
        *self == Self::LIVE
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s1" => Ok(Season::S1),
            "s2" => Ok(Season::S2),
            "s3" => Ok(Season::S3),
            "s4" => Ok(Season::S4),
            "s5" => Ok(Season::S5),
            other => Err(format!("unknown season: {}", other)),
        }
    }
}

/// Rolling window used by the live upstream leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Day, Timeframe::Week, Timeframe::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
        }
    }

    /// Parse a `range` query value, falling back to 30d for anything unrecognised.
    pub fn from_range(range: Option<&str>) -> Self {
        match range.map(str::trim) {
            Some("24h") => Timeframe::Day,
            Some("7d") => Timeframe::Week,
            _ => Timeframe::Month,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
