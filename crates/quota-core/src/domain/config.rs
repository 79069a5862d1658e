use std::time::Duration;

use chrono::TimeDelta;

use super::Category;
use crate::error::ConfigError;

/// Reference window length: 72 hours.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(72 * 3600);

/// Maximum actions per category within one window.
///
/// A limit of zero denies the category outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub text: u32,
    pub code: u32,
    pub image: u32,
}

impl Limits {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Text => self.text,
            Category::Code => self.code,
            Category::Image => self.image,
        }
    }

    /// Return a copy with the limit for `category` replaced.
    pub fn with(mut self, category: Category, limit: u32) -> Self {
        match category {
            Category::Text => self.text = limit,
            Category::Code => self.code = limit,
            Category::Image => self.image = limit,
        }
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            text: 5,
            code: 3,
            image: 1,
        }
    }
}

/// Window policy supplied at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// How long a window stays valid after its start.
    pub period: Duration,
    /// Per-category maxima.
    pub limits: Limits,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            limits: Limits::default(),
        }
    }
}

impl WindowConfig {
    pub fn new(period: Duration, limits: Limits) -> Self {
        Self { period, limits }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        if TimeDelta::from_std(self.period).is_err() {
            return Err(ConfigError::PeriodOutOfRange(self.period));
        }
        Ok(())
    }

    /// The period as a signed delta for timestamp arithmetic.
    pub fn window_length(&self) -> TimeDelta {
        TimeDelta::from_std(self.period).unwrap_or(TimeDelta::MAX)
    }
}
