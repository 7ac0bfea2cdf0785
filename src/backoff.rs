//! Exponential backoff with jitter for request retries

use std::time::Duration;
use log::trace;
use rand::Rng;
use crate::config::BackoffConfig;

/// Delay schedule between attempts of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy
{   pub base: Duration
  , pub cap: Duration
}

impl BackoffPolicy
{   pub fn new(base: Duration, cap: Duration) -> Self
    {   BackoffPolicy { base, cap }
    }

    /// Deterministic part of the delay: `base * 2^(attempt-1)`, capped
    pub fn exponential(&self, attempt: u32) -> Duration
    {   let exponent = attempt.saturating_sub(1).min(31);
        self.base
          .checked_mul(1u32 << exponent)
          .map_or(self.cap, |d| d.min(self.cap))
    }

    /// Delay to sleep after failed attempt `attempt` (numbered from 1)
    pub fn delay(&self, attempt: u32) -> Duration
    {   self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Same as [`delay`](Self::delay) but drawing jitter from `rng`
    pub fn delay_with<R: Rng + ?Sized>(
      &self
    , attempt: u32
    , rng: &mut R
    ) -> Duration
    {   let exp = self.exponential(attempt);
        let half = exp.as_secs_f64() / 2.0;
        let jitter = if half > 0.0
        {   rng.gen_range(0.0..half)
        } else
        {   0.0
        };
        let delay = exp + Duration::from_secs_f64(jitter);
        trace!("Backoff for attempt {}: {:?}", attempt, delay);
        delay
    }
}

impl Default for BackoffPolicy
{   fn default() -> Self
    {   BackoffPolicy::from(&BackoffConfig::default())
    }
}

impl From<&BackoffConfig> for BackoffPolicy
{   fn from(config: &BackoffConfig) -> Self
    {   BackoffPolicy::new(
          Duration::from_millis(config.base_ms)
        , Duration::from_millis(config.cap_ms)
        )
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_stays_within_jitter_window()
    {   let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=12
        {   let exp = policy.exponential(attempt);
            for _ in 0..50
            {   let d = policy.delay_with(attempt, &mut rng);
                assert!(d >= exp, "attempt {}: {:?} < {:?}", attempt, d, exp);
                assert!(d < exp.mul_f64(1.5), "attempt {}: {:?}", attempt, d);
            }
        }
    }

    #[test]
    fn exponential_doubles_then_caps()
    {   let policy = BackoffPolicy::default();
        assert_eq!(policy.exponential(1), Duration::from_millis(500));
        assert_eq!(policy.exponential(2), Duration::from_millis(1_000));
        assert_eq!(policy.exponential(4), Duration::from_millis(4_000));
        assert_eq!(policy.exponential(5), Duration::from_secs(8));
        assert_eq!(policy.exponential(40), Duration::from_secs(8));
    }

    #[test]
    fn same_seed_same_schedule()
    {   let policy = BackoffPolicy::default();
        let a: Vec<_> = (1..6)
          .map(|n| policy.delay_with(n, &mut StdRng::seed_from_u64(42)))
          .collect();
        let b: Vec<_> = (1..6)
          .map(|n| policy.delay_with(n, &mut StdRng::seed_from_u64(42)))
          .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn never_exceeds_one_and_a_half_cap()
    {   let policy = BackoffPolicy::new(
          Duration::from_millis(100)
        , Duration::from_millis(300)
        );
        for attempt in 1..20
        {   assert!(policy.delay(attempt) < Duration::from_millis(450));
        }
    }

    #[test]
    fn zero_base_means_no_wait()
    {   let policy = BackoffPolicy::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.delay(3), Duration::ZERO);
    }
}
