//! Selectors name the thematic group a run of steps is built from.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value identifying one thematic group for the sequence builder.
///
/// Selectors are persisted as part of the session snapshot, so they must
/// round-trip through serde, and `key` must be stable across releases: it
/// namespaces the content keys of every step built from the selector.
pub trait Selector: Clone + Eq + fmt::Debug + Serialize + DeserializeOwned {
    /// Stable identifier used in content keys and completion records
    fn key(&self) -> &str;
}

/// The four sets of rosary mysteries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mystery {
    Joyful,
    Sorrowful,
    Glorious,
    Luminous,
}

impl Mystery {
    /// All mysteries in the order the complete rosary prays them
    pub fn complete() -> Vec<Mystery> {
        vec![
            Mystery::Joyful,
            Mystery::Sorrowful,
            Mystery::Glorious,
            Mystery::Luminous,
        ]
    }

    /// Traditional weekday schedule
    pub fn for_weekday(day: Weekday) -> Mystery {
        match day {
            Weekday::Mon | Weekday::Sat => Mystery::Joyful,
            Weekday::Tue | Weekday::Fri => Mystery::Sorrowful,
            Weekday::Wed | Weekday::Sun => Mystery::Glorious,
            Weekday::Thu => Mystery::Luminous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mystery::Joyful => "joyful",
            Mystery::Sorrowful => "sorrowful",
            Mystery::Glorious => "glorious",
            Mystery::Luminous => "luminous",
        }
    }
}

impl Selector for Mystery {
    fn key(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Mystery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mystery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joyful" => Ok(Mystery::Joyful),
            "sorrowful" => Ok(Mystery::Sorrowful),
            "glorious" => Ok(Mystery::Glorious),
            "luminous" => Ok(Mystery::Luminous),
            other => Err(format!(
                "unknown mystery '{other}' (expected joyful, sorrowful, glorious or luminous)"
            )),
        }
    }
}
