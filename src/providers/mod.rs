//! Backend capability and its implementations

pub mod openai;

use std::time::Duration;
use async_trait::async_trait;
use crate::error::Result;
use crate::request::{Request, Response};

pub use openai::OpenAiProvider;

/// Something that turns one request into one response
///
/// `Ok` with `error` set is a backend-reported failure (bad status,
/// malformed payload). `Err` is a transport or unexpected fault. Both are
/// retried by the client.
#[async_trait]
pub trait Backend: Send + Sync
{   /// Name recorded on synthesized failure responses
    fn name(&self) -> &str;

    /// Execute `request`, never running past `timeout`
    async fn complete(
      &self
    , request: &Request
    , timeout: Duration
    ) -> Result<Response>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B>
{   fn name(&self) -> &str
    {   (**self).name()
    }

    async fn complete(
      &self
    , request: &Request
    , timeout: Duration
    ) -> Result<Response>
    {   (**self).complete(request, timeout).await
    }
}
