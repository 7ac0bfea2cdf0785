//! Configuration for the batch client, its limits and retry behavior

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Shortest timeout a client will use for a non-positive or NaN setting
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig
{   /// Delay before the first retry, in milliseconds
    pub base_ms: u64
  , /// Upper bound on the exponential part, in milliseconds
    pub cap_ms: u64
}

impl Default for BackoffConfig
{   fn default() -> Self
    {   BackoffConfig
        {   base_ms: 500
          , cap_ms: 8_000
        }
    }
}

/// Batch client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig
{   /// Max backend calls in flight at once (floored at 1)
    pub max_concurrency: usize
  , /// Global requests-per-second limit; `None` disables the limiter
    pub qps: Option<f64>
  , /// Token bucket capacity
    pub burst: f64
  , /// Retries allowed after the first attempt
    pub max_retries: usize
  , /// Per-call backend timeout in seconds
    pub timeout_secs: f64
  , /// Retry backoff
    pub backoff: BackoffConfig
}

impl Default for BatchConfig
{   fn default() -> Self
    {   BatchConfig
        {   max_concurrency: 8
          , qps: None
          , burst: 1.0
          , max_retries: 3
          , timeout_secs: 60.0
          , backoff: BackoffConfig::default()
        }
    }
}

impl BatchConfig
{   /// Parse a JSON document; absent fields take their defaults
    pub fn from_json_str(s: &str) -> Result<Self>
    {   let config: BatchConfig = serde_json::from_str(s)
          .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self
    {   self.max_concurrency = n;
        self
    }

    pub fn with_qps(mut self, qps: f64) -> Self
    {   self.qps = Some(qps);
        self
    }

    pub fn with_burst(mut self, burst: f64) -> Self
    {   self.burst = burst;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self
    {   self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self
    {   self.timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_backoff(mut self, base_ms: u64, cap_ms: u64) -> Self
    {   self.backoff = BackoffConfig { base_ms, cap_ms };
        self
    }

    /// Per-call timeout, clamped to `[MIN_TIMEOUT, Duration::MAX]`
    pub fn timeout(&self) -> Duration
    {   if self.timeout_secs.is_nan() || self.timeout_secs <= 0.0
        {   return MIN_TIMEOUT;
        }
        Duration::try_from_secs_f64(self.timeout_secs)
          .unwrap_or(Duration::MAX)
          .max(MIN_TIMEOUT)
    }

    /// Reject values that would make the limiter or timeout meaningless
    pub fn validate(&self) -> Result<()>
    {   if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0
        {   return Err(Error::InvalidConfiguration(
              format!("timeout_secs must be positive, got {}", self.timeout_secs)
            ));
        }
        if Duration::try_from_secs_f64(self.timeout_secs).is_err()
        {   return Err(Error::InvalidConfiguration(
              format!("timeout_secs is out of range, got {}", self.timeout_secs)
            ));
        }
        if let Some(qps) = self.qps
        {   if !qps.is_finite() || qps <= 0.0
            {   return Err(Error::InvalidConfiguration(
                  format!("qps must be positive, got {}", qps)
                ));
            }
        }
        if !self.burst.is_finite() || self.burst < 1.0
        {   return Err(Error::InvalidConfiguration(
              format!("burst must be at least 1, got {}", self.burst)
            ));
        }
        if self.backoff.cap_ms < self.backoff.base_ms
        {   return Err(Error::InvalidConfiguration(
              "backoff cap_ms is below base_ms".to_string()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn defaults_match_documented_values()
    {   let config = BatchConfig::default();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.qps, None);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.backoff, BackoffConfig { base_ms: 500, cap_ms: 8_000 });
    }

    #[test]
    fn partial_json_fills_defaults()
    {   let config = BatchConfig::from_json_str(
          r#"{"qps": 5.0, "burst": 2.0, "backoff": {"base_ms": 10}}"#
        ).unwrap();
        assert_eq!(config.qps, Some(5.0));
        assert_eq!(config.burst, 2.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff.base_ms, 10);
        assert_eq!(config.backoff.cap_ms, 8_000);
    }

    #[test]
    fn rejects_non_positive_qps()
    {   let err = BatchConfig::from_json_str(r#"{"qps": 0.0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_unrepresentable_timeout()
    {   let config = BatchConfig::default().with_timeout(Duration::MAX);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn timeout_clamps_instead_of_panicking()
    {   let mut config = BatchConfig::default();
        config.timeout_secs = -1.0;
        assert_eq!(config.timeout(), MIN_TIMEOUT);
        config.timeout_secs = f64::NAN;
        assert_eq!(config.timeout(), MIN_TIMEOUT);
        config.timeout_secs = 1e30;
        assert_eq!(config.timeout(), Duration::MAX);
        config.timeout_secs = 1e-12;
        assert_eq!(config.timeout(), MIN_TIMEOUT);
    }

    #[test]
    fn rejects_malformed_json()
    {   let err = BatchConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
