//! Token bucket limiting the global request rate of one client

use std::time::Duration;
use log::trace;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Lowest accepted rate; keeps the wait computation finite
pub const MIN_QPS: f64 = 0.1;

const MIN_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct BucketState
{   tokens: f64
  , last_refill: Instant
}

/// Polling token bucket
///
/// Every `acquire` refills the bucket from elapsed time and either takes a
/// token or sleeps until one should be available, then tries again. The
/// refill-and-take step runs under a mutex so concurrent callers cannot
/// both spend the same token.
#[derive(Debug)]
pub struct TokenBucket
{   rate: f64
  , capacity: f64
  , state: Mutex<BucketState>
}

impl TokenBucket
{   /// Bucket refilling at `qps` tokens per second, holding at most `burst`
    pub fn new(qps: f64, burst: f64) -> Self
    {   let capacity = burst.max(1.0);
        TokenBucket
        {   rate: qps.max(MIN_QPS)
          , capacity
          , state: Mutex::new(BucketState
            {   tokens: capacity
              , last_refill: Instant::now()
            })
        }
    }

    pub fn rate(&self) -> f64
    {   self.rate
    }

    pub fn capacity(&self) -> f64
    {   self.capacity
    }

    /// Wait until a token is available, then consume it
    pub async fn acquire(&self)
    {   loop
        {   let wait = match self.try_take().await
            {   None => return
              , Some(wait) => wait
            };
            trace!("Rate limited, sleeping {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Take a token if one is available, else report how long to wait
    async fn try_take(&self) -> Option<Duration>
    {   let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens >= 1.0
        {   state.tokens -= 1.0;
            return None;
        }
        let need = (1.0 - state.tokens) / self.rate;
        Some(Duration::from_secs_f64(need).max(MIN_SLEEP))
    }

    /// Current token level after refilling
    pub async fn available(&self) -> f64
    {   let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState)
    {   let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
    }
}
