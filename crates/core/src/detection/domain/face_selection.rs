use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::face_box::FaceBox;

/// Rule for picking one face when the detector reports several.
///
/// Every variant is bounds-checked: an empty list or an index past the end
/// yields `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSelection {
    /// First detection in scan order.
    #[default]
    First,
    /// Detection with the largest area; ties keep the earlier one.
    Largest,
    /// The n-th detection in scan order.
    Index(usize),
}

impl FaceSelection {
    pub fn select(&self, faces: &[FaceBox]) -> Option<FaceBox> {
        match self {
            FaceSelection::First => faces.first().copied(),
            FaceSelection::Largest => faces
                .iter()
                .copied()
                .reduce(|best, f| if f.area() > best.area() { f } else { best }),
            FaceSelection::Index(i) => faces.get(*i).copied(),
        }
    }
}

impl fmt::Display for FaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceSelection::First => write!(f, "first"),
            FaceSelection::Largest => write!(f, "largest"),
            FaceSelection::Index(i) => write!(f, "index:{i}"),
        }
    }
}

impl FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(FaceSelection::First),
            "largest" => Ok(FaceSelection::Largest),
            other => other
                .strip_prefix("index:")
                .and_then(|n| n.parse().ok())
                .map(FaceSelection::Index)
                .ok_or_else(|| {
                    format!("Face selection must be 'first', 'largest' or 'index:N', got '{s}'")
                }),
        }
    }
}
