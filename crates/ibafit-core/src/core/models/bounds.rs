use serde::{Deserialize, Serialize};
use tracing::warn;

/// Inclusive optimization range of a single scalar parameter.
///
/// An inverted range (`min > max`) collapses to the single point `min`, and a range with
/// `min == max` pins the parameter during a fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        if min > max {
            warn!(min, max, "Inverted bounds collapsed to their lower limit.");
            return Self { min, max: min };
        }
        Self { min, max }
    }

    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Re-validates bounds that were assembled field by field (e.g. by a deserializer).
    pub fn normalized(self) -> Self {
        Self::new(self.min, self.max)
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}
