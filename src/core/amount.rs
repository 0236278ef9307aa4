//! User supplied amount with an explicit empty marker.

use std::fmt::Display;

/// Amount entered by the user. `Empty` is distinct from zero: it is what
/// blank or non-numeric input coerces to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Amount {
    #[default]
    Empty,
    Value(f64),
}

impl Amount {
    /// Coerces raw input the way a numeric form field does. Anything that is
    /// not a finite, non-negative number becomes `Empty`.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Amount::Value(v),
            _ => Amount::Empty,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Empty => None,
            Amount::Value(v) => Some(*v),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Amount::Empty)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 {
            Amount::Value(value)
        } else {
            Amount::Empty
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Empty => write!(f, ""),
            Amount::Value(v) => write!(f, "{v}"),
        }
    }
}
