//! Post-hoc response checks usable as a client validator

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::request::Response;

/// Marker prefixed to the error of a response that failed validation
pub const VALIDATION_ERROR_PREFIX: &str = "validation_error";

/// Check run on every backend response; a rejection replaces its error
pub type Validator
  = Arc<dyn Fn(&Response) -> Result<()> + Send + Sync>;

/// Fail unless the response content parses as JSON
pub fn require_json(resp: &Response) -> Result<()>
{   serde_json::from_str::<serde_json::Value>(&resp.content)
      .map(|_| ())
      .map_err(|e| Error::Validation(
        format!("response is not valid JSON: {}", e)
      ))
}

/// Error text stored on a response rejected by a validator
pub fn validation_error_message(err: &Error) -> String
{   format!("{}: {}", VALIDATION_ERROR_PREFIX, err)
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn accepts_json_document()
    {   let resp = Response::new("mock", "m", r#"{"answer": 4}"#);
        assert!(require_json(&resp).is_ok());
    }

    #[test]
    fn rejects_plain_text()
    {   let resp = Response::new("mock", "m", "four");
        let err = require_json(&resp).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(validation_error_message(&err)
          .starts_with("validation_error: response is not valid JSON"));
    }

    #[test]
    fn rejects_empty_content()
    {   let resp = Response::new("mock", "m", "");
        assert!(require_json(&resp).is_err());
    }
}
