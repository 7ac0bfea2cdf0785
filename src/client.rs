//! Batch client: bounded, rate limited, retrying request dispatch

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use futures::FutureExt;
use log::{debug, error, trace, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::backoff::BackoffPolicy;
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::gate::ConcurrencyGate;
use crate::providers::Backend;
use crate::request::{Message, Request, RequestOptions, Response};
use crate::token_bucket::TokenBucket;
use crate::validation::{validation_error_message, Validator};

/// One slot of an exception-preserving batch
///
/// `Err` means the orchestration itself broke for that request: a
/// transport fault outlived the retry budget or the request task panicked.
/// Backend-reported and validation failures stay `Ok` with `error` set.
pub type BatchOutcome = Result<Response>;

/// Request tasks of one batch; aborted when the batch future is dropped
struct BatchTasks(Vec<JoinHandle<BatchOutcome>>);

impl Drop for BatchTasks
{   fn drop(&mut self)
    {   for handle in &self.0
        {   handle.abort();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String
{   payload.downcast_ref::<&str>()
      .map(|s| s.to_string())
      .or_else(|| payload.downcast_ref::<String>().cloned())
      .unwrap_or_else(|| "panic".to_string())
}

/// Dispatches requests to a backend with bounded concurrency, an optional
/// global rate limit, retries with jittered backoff and optional validation.
///
/// Cloning is cheap; clones share the gate and the rate limiter.
pub struct BatchClient<B>
{   backend: Arc<B>
  , gate: ConcurrencyGate
  , bucket: Option<Arc<TokenBucket>>
  , backoff: BackoffPolicy
  , max_retries: usize
  , timeout: Duration
  , validator: Option<Validator>
}

impl<B> Clone for BatchClient<B>
{   fn clone(&self) -> Self
    {   BatchClient
        {   backend: self.backend.clone()
          , gate: self.gate.clone()
          , bucket: self.bucket.clone()
          , backoff: self.backoff
          , max_retries: self.max_retries
          , timeout: self.timeout
          , validator: self.validator.clone()
        }
    }
}

impl<B: Backend + 'static> BatchClient<B>
{   /// Create a client; out-of-range limits are clamped rather than rejected
    pub fn new(
      backend: B
    , config: BatchConfig
    ) -> Self
    {   debug!(
          "Creating BatchClient: concurrency={} qps={:?} retries={}",
          config.max_concurrency, config.qps, config.max_retries
        );
        BatchClient
        {   backend: Arc::new(backend)
          , gate: ConcurrencyGate::new(config.max_concurrency)
          , bucket: config.qps
              .map(|qps| Arc::new(TokenBucket::new(qps, config.burst)))
          , backoff: BackoffPolicy::from(&config.backoff)
          , max_retries: config.max_retries
          , timeout: config.timeout()
          , validator: None
        }
    }

    /// Create a client after checking `config`
    pub fn try_new(
      backend: B
    , config: BatchConfig
    ) -> Result<Self>
    {   config.validate()?;
        Ok(BatchClient::new(backend, config))
    }

    /// Run `validator` on every backend response; a rejection overwrites the
    /// response error and is retried
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
      F: Fn(&Response) -> Result<()> + Send + Sync + 'static
    {   self.validator = Some(Arc::new(validator));
        self
    }

    pub fn backend(&self) -> &B
    {   &self.backend
    }

    pub fn gate(&self) -> &ConcurrencyGate
    {   &self.gate
    }

    pub fn max_retries(&self) -> usize
    {   self.max_retries
    }

    pub fn timeout(&self) -> Duration
    {   self.timeout
    }

    /// Stop admitting backend calls
    ///
    /// Requests waiting for a permit, and any submitted later, end at once
    /// with a failed response; calls already in flight finish normally.
    pub fn close(&self)
    {   debug!("Closing BatchClient");
        self.gate.close();
    }

    /// Complete one conversation
    pub async fn complete(
      &self
    , messages: Vec<Message>
    , model: &str
    , options: &RequestOptions
    ) -> Response
    {   self.execute_one(Request::with_options(messages, model, options)).await
    }

    /// Run one request to a terminal state using the configured timeout
    pub async fn execute_one(&self, request: Request) -> Response
    {   self.execute_one_with_timeout(request, self.timeout).await
    }

    /// Run one request with a per-call timeout override
    ///
    /// Never fails: a fault surviving the retry budget, or a panic in the
    /// backend, becomes an empty-content response carrying the error.
    pub async fn execute_one_with_timeout(
      &self
    , request: Request
    , timeout: Duration
    ) -> Response
    {   let outcome = AssertUnwindSafe(self.run(&request, timeout))
          .catch_unwind()
          .await
          .unwrap_or_else(|payload| {
            let msg = panic_message(payload.as_ref());
            error!("Request panicked: {}", msg);
            Err(Error::TaskFailed(msg))
          });
        match outcome
        {   Ok(resp) => resp
          , Err(e) => Response::failed(self.backend.name(), request.model, e.to_string())
        }
    }

    /// Complete each conversation with shared options; output order matches input
    pub async fn execute_batch(
      &self
    , prompts: Vec<Vec<Message>>
    , model: &str
    , options: &RequestOptions
    ) -> Vec<Response>
    {   let requests = prompts
          .into_iter()
          .map(|messages| Request::with_options(messages, model, options))
          .collect();
        self.execute_requests(requests).await
    }

    /// Run prepared requests concurrently; every slot holds a response
    pub async fn execute_requests(&self, requests: Vec<Request>) -> Vec<Response>
    {   let models: Vec<String> = requests
          .iter()
          .map(|r| r.model.clone())
          .collect();
        self.execute_batch_results(requests)
          .await
          .into_iter()
          .zip(models)
          .map(|(outcome, model)| outcome.unwrap_or_else(|e| {
            Response::failed(self.backend.name(), model, e.to_string())
          }))
          .collect()
    }

    /// Run prepared requests concurrently, keeping orchestration faults as `Err`
    pub async fn execute_batch_results(&self, requests: Vec<Request>) -> Vec<BatchOutcome>
    {   debug!("Dispatching batch of {} requests", requests.len());
        let mut tasks = BatchTasks(requests
          .into_iter()
          .map(|request| {
            let client = self.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
              client.run(&request, timeout).await
            })
          })
          .collect());

        // Awaiting in spawn order keeps slot i aligned with request i
        let mut results = Vec::with_capacity(tasks.0.len());
        for (index, handle) in tasks.0.iter_mut().enumerate()
        {   let outcome = match handle.await
            {   Ok(outcome) => outcome
              , Err(e) => {
                  error!("Request {} task failed: {}", index, e);
                  Err(Error::TaskFailed(e.to_string()))
                }
            };
            results.push(outcome);
        }
        results
    }

    /// Attempt loop: call, validate, classify, then retry or return
    async fn run(
      &self
    , request: &Request
    , timeout: Duration
    ) -> Result<Response>
    {   let mut attempt: u32 = 1;
        loop
        {   let failure = match self.attempt(request, timeout, attempt).await
            {   Ok(resp) if resp.is_success() => {
                  debug!("Request succeeded on attempt {}", attempt);
                  return Ok(resp);
                }
              , Ok(resp) => {
                  let reason = resp.error.clone().unwrap_or_default();
                  if attempt as usize > self.max_retries
                  {   warn!(
                        "Giving up after {} attempts: {}",
                        attempt, reason
                      );
                      return Ok(resp);
                  }
                  reason
                }
              , Err(Error::GateClosed) => {
                  warn!("Gate closed, abandoning request");
                  return Err(Error::GateClosed);
                }
              , Err(e) => {
                  if attempt as usize > self.max_retries
                  {   warn!(
                        "Giving up after {} attempts: {}",
                        attempt, e
                      );
                      return Err(e);
                  }
                  e.to_string()
                }
            };

            let delay = self.backoff.delay(attempt);
            warn!(
              "Attempt {} failed: {}. Retrying in {:?}",
              attempt, failure, delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// A single backend call under a gate permit and a rate-limit token
    async fn attempt(
      &self
    , request: &Request
    , timeout: Duration
    , attempt: u32
    ) -> Result<Response>
    {   let mut resp = {
          let _permit = self.gate.acquire().await?;
          if let Some(bucket) = &self.bucket
          {   bucket.acquire().await;
          }
          trace!("Attempt {} calling {} for {}", attempt, self.backend.name(), request.model);
          match tokio::time::timeout(
            timeout,
            self.backend.complete(request, timeout)
          ).await
          {   Ok(result) => result?
            , Err(_) => {
                error!("Backend call exceeded {:?}", timeout);
                return Err(Error::Timeout);
              }
          }
        };

        if let Some(validator) = &self.validator
        {   if let Err(e) = validator(&resp)
            {   debug!("Validation failed: {}", e);
                resp.error = Some(validation_error_message(&e));
            }
        }
        Ok(resp)
    }
}
