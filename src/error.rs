use std::fmt;

/// Error type for batchcall operations
/// Implements Clone so a fault can be stored in a batch slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for a provider
    MissingApiKey(String)
  , /// HTTP transport error
    HttpError(String)
  , /// API returned an error status
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// Backend call exceeded its timeout
    Timeout
  , /// Response failed a post-hoc validation check
    Validation(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Concurrency gate was closed while waiting for a permit
    GateClosed
  , /// A spawned request task panicked or was cancelled
    TaskFailed(String)
  , /// Could not start the blocking runtime
    Runtime(String)
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Validation(msg) => {
              write!(f, "{}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::GateClosed => {
              write!(f, "Concurrency gate closed")
            }
          , Error::TaskFailed(msg) => {
              write!(f, "Request task failed: {}", msg)
            }
          , Error::Runtime(msg) => {
              write!(f, "Runtime error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
