use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

use batchcall::{ConcurrencyGate, Error, TokenBucket};

// ===== Token bucket =====

#[tokio::test(start_paused = true)]
async fn test_token_bucket_limiter_basic()
{   let limiter = TokenBucket::new(5.0, 2.0);
    let start = Instant::now();

    limiter.acquire().await;
    limiter.acquire().await;
    assert!(start.elapsed() < Duration::from_millis(10));

    limiter.acquire().await;
    assert!(start.elapsed() >= Duration::from_millis(150), "{:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn test_default_burst_enforces_spacing()
{   let limiter = TokenBucket::new(10.0, 1.0);
    let start = Instant::now();
    let mut stamps = Vec::new();

    for _ in 0..5
    {   limiter.acquire().await;
        stamps.push(start.elapsed());
    }

    assert!(stamps[0] < Duration::from_millis(1));
    for pair in stamps.windows(2)
    {   assert!(pair[1] - pair[0] >= Duration::from_millis(99), "{:?}", stamps);
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquirers_do_not_over_admit()
{   let limiter = Arc::new(TokenBucket::new(10.0, 1.0));
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
      .map(|_| {
        let limiter = limiter.clone();
        tokio::spawn(async move {
          limiter.acquire().await;
          start.elapsed()
        })
      })
      .collect();
    let mut stamps = Vec::new();
    for h in handles
    {   stamps.push(assert_ok!(h.await));
    }
    stamps.sort();

    // ten tokens at 10/s with a burst of one: the last lands at ~0.9s
    assert!(stamps[9] >= Duration::from_millis(890), "{:?}", stamps);
    for pair in stamps.windows(2)
    {   assert!(pair[1] - pair[0] >= Duration::from_millis(99), "{:?}", stamps);
    }
}

#[tokio::test(start_paused = true)]
async fn test_refill_is_capped_at_burst()
{   let limiter = TokenBucket::new(5.0, 2.0);
    limiter.acquire().await;
    limiter.acquire().await;

    sleep(Duration::from_secs(10)).await;

    assert_eq!(limiter.available().await, 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_refill()
{   let limiter = TokenBucket::new(4.0, 1.0);
    limiter.acquire().await;

    sleep(Duration::from_millis(125)).await;

    let level = limiter.available().await;
    assert!((level - 0.5).abs() < 1e-6, "{}", level);
}

#[tokio::test]
async fn test_rate_is_floored()
{   let limiter = TokenBucket::new(0.0, 1.0);
    assert_eq!(limiter.rate(), 0.1);
    assert_eq!(limiter.capacity(), 1.0);
}

// ===== Concurrency gate =====

#[tokio::test]
async fn test_gate_floors_limit_at_one()
{   let gate = ConcurrencyGate::new(0);
    assert_eq!(gate.limit(), 1);
    assert_eq!(gate.available(), 1);
}

#[tokio::test]
async fn test_gate_permit_released_on_drop()
{   let gate = ConcurrencyGate::new(2);
    let first = assert_ok!(gate.acquire().await);
    let second = assert_ok!(gate.acquire().await);
    assert_eq!(gate.available(), 0);

    drop(first);
    assert_eq!(gate.available(), 1);
    drop(second);
    assert_eq!(gate.available(), 2);
}

#[tokio::test]
async fn test_gate_permit_released_on_error_path()
{   async fn failing(gate: &ConcurrencyGate) -> batchcall::Result<()>
    {   let _permit = gate.acquire().await?;
        Err(Error::Other("held section failed".into()))
    }

    let gate = ConcurrencyGate::new(1);
    assert!(failing(&gate).await.is_err());
    assert_eq!(gate.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gate_blocks_until_release()
{   let gate = ConcurrencyGate::new(1);
    let held = assert_ok!(gate.acquire().await);

    let waiter = {
      let gate = gate.clone();
      tokio::spawn(async move {
        let start = Instant::now();
        let _permit = gate.acquire().await?;
        Ok::<_, Error>(start.elapsed())
      })
    };

    sleep(Duration::from_millis(50)).await;
    drop(held);

    let waited = assert_ok!(assert_ok!(waiter.await));
    assert!(waited >= Duration::from_millis(50), "{:?}", waited);
}

#[tokio::test]
async fn test_closed_gate_refuses_permits()
{   let gate = ConcurrencyGate::new(1);
    gate.close();
    let err = assert_err!(gate.acquire().await);
    assert_eq!(err, Error::GateClosed);
}
