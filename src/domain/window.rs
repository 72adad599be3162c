// Window selection and trend direction domain models
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowSelection {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[default]
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "24h")]
    Day,
}

impl WindowSelection {
    pub const ALL: [WindowSelection; 4] = [
        WindowSelection::FiveMinutes,
        WindowSelection::FifteenMinutes,
        WindowSelection::SixtyMinutes,
        WindowSelection::Day,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            WindowSelection::FiveMinutes => 5,
            WindowSelection::FifteenMinutes => 15,
            WindowSelection::SixtyMinutes => 60,
            WindowSelection::Day => 24 * 60,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            WindowSelection::FiveMinutes => "5m",
            WindowSelection::FifteenMinutes => "15m",
            WindowSelection::SixtyMinutes => "60m",
            WindowSelection::Day => "24h",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindowSelection::FiveMinutes => "5 min",
            WindowSelection::FifteenMinutes => "15 min",
            WindowSelection::SixtyMinutes => "60 min",
            WindowSelection::Day => "24 h",
        }
    }

    /// Nominal number of points covered by this window at the given sampling interval.
    pub fn requested_points(&self, sampling_interval_secs: u32) -> usize {
        let interval = sampling_interval_secs.max(1);
        (self.minutes() * 60 / interval) as usize
    }
}

impl fmt::Display for WindowSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown window selection '{0}', expected one of 5m, 15m, 60m, 24h")]
pub struct UnknownWindow(pub String);

impl FromStr for WindowSelection {
    type Err = UnknownWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowSelection::ALL
            .into_iter()
            .find(|w| w.key() == s.trim())
            .ok_or_else(|| UnknownWindow(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}
