use serde::{Deserialize, Serialize};

use crate::shared::interval::Interval;

use super::hsv::Hsv;

/// Per-channel HSV bounds a pixel must fall within to count as skin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkinMask {
    pub hue: Interval,
    pub saturation: Interval,
    pub value: Interval,
}

impl Default for SkinMask {
    fn default() -> Self {
        Self {
            hue: Interval::closed(0.0, 50.0),
            saturation: Interval::closed(25.0, 204.0),
            value: Interval::closed(51.0, 255.0),
        }
    }
}

impl SkinMask {
    pub fn contains(&self, hsv: &Hsv) -> bool {
        self.hue.contains(hsv.hue)
            && self.saturation.contains(hsv.saturation)
            && self.value.contains(hsv.value)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.hue.validate()?;
        self.saturation.validate()?;
        self.value.validate()
    }
}
