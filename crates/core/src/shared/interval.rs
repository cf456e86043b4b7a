use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric range with an inclusive upper bound and an optionally open
/// lower bound: `[min, max]` or `(min, max]`.
///
/// NaN is never contained.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub min_exclusive: bool,
}

impl Interval {
    pub const fn closed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_exclusive: false,
        }
    }

    pub const fn left_open(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            min_exclusive: true,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        let above_min = if self.min_exclusive {
            v > self.min
        } else {
            v >= self.min
        };
        above_min && v <= self.max
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(format!("interval {self} has a non-finite bound"));
        }
        if self.min > self.max {
            return Err(format!("interval {self} has min above max"));
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.min_exclusive { '(' } else { '[' };
        write!(f, "{open}{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, true)]
    #[case(25.0, true)]
    #[case(50.0, true)]
    #[case(50.0001, false)]
    #[case(-0.1, false)]
    #[case(f64::NAN, false)]
    fn test_closed_contains(#[case] v: f64, #[case] expected: bool) {
        assert_eq!(Interval::closed(0.0, 50.0).contains(v), expected);
    }

    #[rstest]
    #[case(80.0, false)]
    #[case(80.5, true)]
    #[case(255.0, true)]
    #[case(255.5, false)]
    fn test_left_open_contains(#[case] v: f64, #[case] expected: bool) {
        assert_eq!(Interval::left_open(80.0, 255.0).contains(v), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::closed(0.0, 50.0).to_string(), "[0, 50]");
        assert_eq!(Interval::left_open(80.0, 255.0).to_string(), "(80, 255]");
    }

    #[test]
    fn test_validate() {
        assert!(Interval::closed(0.0, 1.0).validate().is_ok());
        assert!(Interval::closed(2.0, 1.0).validate().is_err());
        assert!(Interval::closed(f64::NAN, 1.0).validate().is_err());
        assert!(Interval::closed(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults_to_closed() {
        let parsed: Interval = serde_json::from_str(r#"{ "min": 1.0, "max": 2.0 }"#).unwrap();
        assert_eq!(parsed, Interval::closed(1.0, 2.0));
    }
}
