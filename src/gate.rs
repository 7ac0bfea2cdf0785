//! Counting permit pool bounding in-flight backend calls

use std::sync::Arc;
use log::trace;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use crate::error::{Error, Result};

/// Concurrency gate shared by all requests of one client
#[derive(Debug, Clone)]
pub struct ConcurrencyGate
{   semaphore: Arc<Semaphore>
  , limit: usize
}

/// A held permit; dropping it returns the permit on every exit path
#[derive(Debug)]
pub struct GatePermit
{   _permit: OwnedSemaphorePermit
}

impl ConcurrencyGate
{   /// Gate with `limit` permits, floored at 1
    pub fn new(limit: usize) -> Self
    {   let limit = limit.max(1);
        ConcurrencyGate
        {   semaphore: Arc::new(Semaphore::new(limit))
          , limit
        }
    }

    pub fn limit(&self) -> usize
    {   self.limit
    }

    /// Permits currently free
    pub fn available(&self) -> usize
    {   self.semaphore.available_permits()
    }

    /// Wait for a free permit
    pub async fn acquire(&self) -> Result<GatePermit>
    {   let permit = self.semaphore
          .clone()
          .acquire_owned()
          .await
          .map_err(|_| Error::GateClosed)?;
        trace!(
          "Gate permit acquired, {} of {} free",
          self.available(), self.limit
        );
        Ok(GatePermit { _permit: permit })
    }

    /// Stop handing out permits; pending and future waiters fail
    pub fn close(&self)
    {   self.semaphore.close();
    }
}
