//! batchcall: concurrency-bounded batch dispatch of text-generation calls
//!
//! A [`BatchClient`] runs many independent [`Request`]s against one
//! [`Backend`], keeping at most `max_concurrency` calls in flight, spacing
//! calls through an optional token bucket, retrying failures with jittered
//! exponential backoff and optionally validating each response. Batch
//! results always come back in input order.
//!
//! ```no_run
//! use batchcall::{BatchClient, BatchConfig, Message, OpenAiProvider, RequestOptions};
//!
//! # async fn demo() -> batchcall::Result<()> {
//! let client = BatchClient::new(
//!   OpenAiProvider::from_env()?
//! , BatchConfig::default().with_max_concurrency(5).with_qps(2.0)
//! ).with_validator(batchcall::require_json);
//! let prompts = vec![vec![Message::user("Reply with {\"n\": 4}")]];
//! let responses = client
//!   .execute_batch(prompts, "gpt-4.1-mini", &RequestOptions::default())
//!   .await;
//! # Ok(()) }
//! ```

/*

batchcall/
├── src/
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error type
│   ├── config.rs       # Client, limiter and backoff configuration
│   ├── request.rs      # Message / Request / Response / Usage
│   ├── backoff.rs      # Retry delay schedule
│   ├── token_bucket.rs # Global rate limit
│   ├── gate.rs         # Concurrency permits
│   ├── validation.rs   # Response validators
│   ├── client.rs       # Attempt loop and batch fan-out
│   ├── blocking.rs     # Sync wrappers
│   └── providers/      # Backend trait and implementations
└── tests/

*/

pub mod error;
pub mod config;
pub mod request;
pub mod backoff;
pub mod token_bucket;
pub mod gate;
pub mod validation;
pub mod providers;
pub mod client;
pub mod blocking;

pub use backoff::BackoffPolicy;
pub use blocking::{run_batch, run_one};
pub use client::{BatchClient, BatchOutcome};
pub use config::{BackoffConfig, BatchConfig};
pub use error::{Error, Result};
pub use gate::{ConcurrencyGate, GatePermit};
pub use providers::{Backend, OpenAiProvider};
pub use request::{Message, Request, RequestOptions, Response, Role, Usage};
pub use token_bucket::TokenBucket;
pub use validation::{require_json, Validator, VALIDATION_ERROR_PREFIX};
