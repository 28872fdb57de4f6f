//! Politeness pacing between successful chapter requests.

use crate::scraper::error::ScraperError;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_DELAY_MIN: Duration = Duration::from_secs(1);
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_secs(2);

/// Inclusive `[min, max]` bound for the randomized pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self, ScraperError> {
        if min > max {
            return Err(ScraperError::InvalidDelay { min, max });
        }
        Ok(Self { min, max })
    }

    /// Build from fractional seconds (config file and CLI form).
    /// Negative, non-finite or overflowing values are rejected.
    pub fn from_secs_f64(min: f64, max: f64) -> Result<Self, ScraperError> {
        let to_duration = |secs: f64| {
            Duration::try_from_secs_f64(secs).map_err(|e| ScraperError::InvalidDelaySeconds {
                value: secs,
                reason: e.to_string(),
            })
        };
        Self::new(to_duration(min)?, to_duration(max)?)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a duration uniformly from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_DELAY_MIN,
            max: DEFAULT_DELAY_MAX,
        }
    }
}

/// Where the orchestrator's pauses go. Tests record them instead of sleeping.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Pacer for ThreadSleeper {
    fn pause(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn new_rejects_inverted_bounds() {
        let result = DelayRange::new(Duration::from_secs(3), Duration::from_secs(1));
        assert!(matches!(result, Err(ScraperError::InvalidDelay { .. })));
    }

    #[test]
    fn sample_stays_within_bounds() -> Result<(), ScraperError> {
        let range = DelayRange::from_secs_f64(0.5, 1.5)?;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let d = range.sample(&mut rng);
            assert!(d >= range.min() && d <= range.max(), "{:?} out of range", d);
        }
        Ok(())
    }

    #[test]
    fn sample_of_degenerate_range_is_constant() -> Result<(), ScraperError> {
        let range = DelayRange::new(Duration::from_millis(250), Duration::from_millis(250))?;
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(range.sample(&mut rng), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn sample_respects_sub_millisecond_bounds() -> Result<(), ScraperError> {
        let range = DelayRange::from_secs_f64(1.0005, 1.0009)?;
        for seed in 0..50 {
            let d = range.sample(&mut StdRng::seed_from_u64(seed));
            assert!(d >= range.min() && d <= range.max(), "{:?} out of range", d);
        }
        Ok(())
    }

    #[test]
    fn from_secs_f64_rejects_unrepresentable_seconds() {
        for (min, max, bad) in [(-1.0, 0.0, -1.0), (1.0, 1e30, 1e30), (f64::NAN, 1.0, f64::NAN)] {
            match DelayRange::from_secs_f64(min, max) {
                Err(ScraperError::InvalidDelaySeconds { value, .. }) => {
                    assert!(value == bad || (value.is_nan() && bad.is_nan()));
                }
                other => panic!("expected InvalidDelaySeconds, got {:?}", other),
            }
        }
    }
}
