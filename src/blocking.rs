//! Synchronous wrappers for callers outside an async runtime
//!
//! Each call builds its own current-thread runtime, so these must not be
//! called from inside another tokio runtime.

use log::debug;
use tokio::runtime::{Builder, Runtime};

use crate::client::BatchClient;
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::providers::Backend;
use crate::request::{Message, RequestOptions, Response};

fn runtime() -> Result<Runtime>
{   Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(|e| Error::Runtime(e.to_string()))
}

/// Complete every conversation in `prompts` and block until all finish
pub fn run_batch<B: Backend + 'static>(
  backend: B
, prompts: Vec<Vec<Message>>
, model: &str
, options: &RequestOptions
, config: BatchConfig
) -> Result<Vec<Response>>
{   debug!("run_batch with {} prompts", prompts.len());
    let client = BatchClient::new(backend, config);
    Ok(runtime()?.block_on(client.execute_batch(prompts, model, options)))
}

/// Complete one conversation with the default configuration
pub fn run_one<B: Backend + 'static>(
  backend: B
, messages: Vec<Message>
, model: &str
, options: &RequestOptions
) -> Result<Response>
{   let client = BatchClient::new(backend, BatchConfig::default());
    Ok(runtime()?.block_on(client.complete(messages, model, options)))
}
