use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which label set a dashboard classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Risk,
    Investment,
}

impl Scale {
    pub const ALL: [Scale; 2] = [Scale::Risk, Scale::Investment];

    pub fn as_str(self) -> &'static str {
        match self {
            Scale::Risk => "risk",
            Scale::Investment => "investment",
        }
    }

    pub fn level(self, tier: Tier) -> Level {
        match (self, tier) {
            (Scale::Risk, Tier::Top) => Level::Good,
            (Scale::Risk, Tier::Middle) => Level::Neutral,
            (Scale::Risk, Tier::Bottom) => Level::Bad,
            (Scale::Investment, Tier::Top) => Level::Excellent,
            (Scale::Investment, Tier::Middle) => Level::Good,
            (Scale::Investment, Tier::Bottom) => Level::Fair,
        }
    }

    /// Labels in display order, best first, followed by the unavailable sentinel.
    pub fn levels(self) -> [Level; 4] {
        [
            self.level(Tier::Top),
            self.level(Tier::Middle),
            self.level(Tier::Bottom),
            Level::Unavailable,
        ]
    }

    pub fn color(self, level: Level) -> Color {
        match (self, level) {
            (_, Level::Unavailable) => Color::Black,
            (Scale::Risk, Level::Good) => Color::Green,
            (Scale::Risk, Level::Neutral) => Color::Yellow,
            (Scale::Risk, Level::Bad) => Color::Red,
            (Scale::Investment, Level::Excellent) => Color::Green,
            (Scale::Investment, Level::Good) => Color::Yellow,
            (Scale::Investment, Level::Fair) => Color::Orange,
            // Label from the other scale; only reachable through hand-built results.
            _ => Color::Black,
        }
    }

    /// Lowest and highest contribution a single parameter can make.
    pub fn contribution_bounds(self) -> (i32, i32) {
        let top = self.level(Tier::Top).contribution();
        let bottom = self.level(Tier::Bottom).contribution();
        (bottom, top)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "risk" => Ok(Scale::Risk),
            "investment" => Ok(Scale::Investment),
            other => anyhow::bail!("unknown scale: {other} (expected risk or investment)"),
        }
    }
}

/// Position of a value relative to a parameter's thresholds, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Bottom,
    Middle,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Excellent,
    Good,
    Neutral,
    Fair,
    Bad,
    #[serde(rename = "Data not available")]
    Unavailable,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Excellent => "Excellent",
            Level::Good => "Good",
            Level::Neutral => "Neutral",
            Level::Fair => "Fair",
            Level::Bad => "Bad",
            Level::Unavailable => "Data not available",
        }
    }

    /// Signed score contribution. `Good` counts +1 on both scales.
    pub fn contribution(self) -> i32 {
        match self {
            Level::Excellent => 2,
            Level::Good => 1,
            Level::Neutral | Level::Unavailable => 0,
            Level::Fair | Level::Bad => -1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Yellow,
    Orange,
    Red,
    Black,
}
