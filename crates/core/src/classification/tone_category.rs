use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToneCategory {
    Fair,
    Light,
    Medium,
    Dark,
    Unknown,
}

impl ToneCategory {
    pub const ALL: [ToneCategory; 5] = [
        ToneCategory::Fair,
        ToneCategory::Light,
        ToneCategory::Medium,
        ToneCategory::Dark,
        ToneCategory::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToneCategory::Fair => "FAIR",
            ToneCategory::Light => "LIGHT",
            ToneCategory::Medium => "MEDIUM",
            ToneCategory::Dark => "DARK",
            ToneCategory::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(self) -> bool {
        self != ToneCategory::Unknown
    }
}

impl fmt::Display for ToneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToneCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToneCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tone category '{s}'"))
    }
}
