use crate::consts::{HUE_MAX, PERCENT_MAX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when a bounded numeric value is out of its range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Percentage outside `0..=100` or not a finite number.
    #[error("Invalid percent: {0} (must be 0-100)")]
    InvalidPercent(f64),

    /// Hue outside `0..=120` or not a finite number.
    #[error("Invalid hue: {0} (must be 0-120)")]
    InvalidHue(f64),
}

/// A percentage guaranteed to be finite and in the range `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percent(f64);

impl Percent {
    /// 0%
    pub const ZERO: Self = Self(0.0);
    /// 100%
    pub const FULL: Self = Self(PERCENT_MAX);

    /// Creates a new Percent, validating that it's finite and within `0..=100`
    ///
    /// # Errors
    /// Returns `ValueError::InvalidPercent` if the value is NaN, infinite or out of range.
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if !value.is_finite() || !(0.0..=PERCENT_MAX).contains(&value) {
            return Err(ValueError::InvalidPercent(value));
        }
        Ok(Self(value))
    }

    /// Creates a Percent by clamping into `0..=100`. NaN maps to 0.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, PERCENT_MAX))
    }

    /// Picks 100% or 0% for ranges with no length
    pub const fn from_reached(reached: bool) -> Self {
        if reached { Self::FULL } else { Self::ZERO }
    }

    /// Returns the percentage value as f64
    #[inline]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Returns the value as a fraction in `0.0..=1.0`
    #[inline]
    pub fn fraction(self) -> f64 {
        self.0 / PERCENT_MAX
    }
}

impl TryFrom<f64> for Percent {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for f64 {
    fn from(percent: Percent) -> Self {
        percent.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A colour hue in degrees, guaranteed to be in the range `0..=120`
/// (red through yellow to green).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Hue(f64);

impl Hue {
    /// Creates a new Hue, validating that it's finite and within `0..=120`
    ///
    /// # Errors
    /// Returns `ValueError::InvalidHue` if the value is NaN, infinite or out of range.
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if !value.is_finite() || !(0.0..=HUE_MAX).contains(&value) {
            return Err(ValueError::InvalidHue(value));
        }
        Ok(Self(value))
    }

    /// Linear map of `0..=100` percent onto `0..=120` degrees
    pub fn from_percent(percent: Percent) -> Self {
        Self(percent.fraction() * HUE_MAX)
    }

    /// Returns the hue in degrees
    #[inline]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Hue {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hue> for f64 {
    fn from(hue: Hue) -> Self {
        hue.0
    }
}

impl fmt::Display for Hue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
