use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, trace};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::providers::Backend;
use crate::request::{Request, Response, Usage};

const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize)]
pub struct InputMessage<'a>
{   pub role: &'a str
  , pub content: &'a str
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest<'a>
{   pub model: &'a str
  , pub input: Vec<InputMessage<'a>>
  , pub temperature: f64
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>
  , #[serde(flatten)]
    pub extra: &'a Map<String, Value>
}

impl<'a> From<&'a Request> for ResponsesRequest<'a>
{   fn from(req: &'a Request) -> Self
    {   ResponsesRequest
        {   model: &req.model
          , input: req.messages
              .iter()
              .map(|m| InputMessage
              {   role: m.role.as_str()
                , content: &m.content
              })
              .collect()
          , temperature: req.temperature
          , max_output_tokens: req.max_output_tokens
          , extra: &req.extra
        }
    }
}

// ===== Provider =====

/// Backend for the OpenAI Responses API
#[derive(Debug, Clone)]
pub struct OpenAiProvider
{   api_key: String
  , base_url: String
  , http_client: reqwest::Client
}

impl OpenAiProvider
{   /// Create a provider; falls back to `OPENAI_API_KEY` when no key is given
    pub fn new(
      api_key: Option<String>
    , base_url: Option<String>
    ) -> Result<Self>
    {   debug!("Creating OpenAiProvider");
        let api_key = match api_key
        {   Some(key) => key
          , None => std::env::var(API_KEY_ENV).map_err(|_| {
              error!("{} not set", API_KEY_ENV);
              Error::MissingApiKey("openai".to_string())
            })?
        };
        let base_url = base_url
          .unwrap_or_else(|| OPENAI_API_BASE.to_string())
          .trim_end_matches('/')
          .to_string();

        Ok(OpenAiProvider
        {   api_key
          , base_url
          , http_client: reqwest::Client::new()
        })
    }

    /// Build from environment only
    pub fn from_env() -> Result<Self>
    {   OpenAiProvider::new(None, None)
    }

    pub fn base_url(&self) -> &str
    {   &self.base_url
    }

    async fn send(
      &self
    , req: &Request
    , timeout: Duration
    ) -> std::result::Result<Value, (Error, Value)>
    {   let payload = ResponsesRequest::from(req);
        trace!("OpenAI request: {:?}", payload);

        let response = self.http_client
          .post(format!("{}/responses", self.base_url))
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .timeout(timeout)
          .json(&payload)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            let err = if e.is_timeout()
            {   Error::Timeout
            } else
            {   Error::HttpError(e.to_string())
            };
            let raw = json!({ "error": err.to_string() });
            (err, raw)
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        if !status.is_success()
        {   let body = response.text().await.ok();
            let err = Error::ApiError(format!("status {}", status));
            error!("OpenAI API error: {} {:?}", status, body);
            let raw = json!({ "error": err.to_string(), "body": body });
            return Err((err, raw));
        }

        response.json::<Value>().await.map_err(|e| {
          error!("Parse error: {}", e);
          let err = Error::ParseError(e.to_string());
          let raw = json!({ "error": err.to_string() });
          (err, raw)
        })
    }
}

#[async_trait]
impl Backend for OpenAiProvider
{   fn name(&self) -> &str
    {   "openai"
    }

    async fn complete(
      &self
    , req: &Request
    , timeout: Duration
    ) -> Result<Response>
    {   debug!("Handling complete for: {}", req.model);
        match self.send(req, timeout).await
        {   Ok(data) => {
              let content = extract_output_text(&data);
              let usage = extract_usage(&data);
              Ok(Response::new(self.name(), req.model.clone(), content)
                .with_usage(usage)
                .with_raw(data))
            }
          , Err((err, raw)) => {
              Ok(Response::failed(self.name(), req.model.clone(), err.to_string())
                .with_raw(raw))
            }
        }
    }
}

/// Concatenate the `output_text` parts of every `message` output item
pub fn extract_output_text(data: &Value) -> String
{   let mut text = String::new();
    let outputs = data.get("output")
      .and_then(Value::as_array)
      .map(Vec::as_slice)
      .unwrap_or_default();
    for out in outputs
    {   if out.get("type").and_then(Value::as_str) != Some("message")
        {   continue;
        }
        let parts = out.get("content")
          .and_then(Value::as_array)
          .map(Vec::as_slice)
          .unwrap_or_default();
        for part in parts
        {   if part.get("type").and_then(Value::as_str) == Some("output_text")
            {   text.push_str(
                  part.get("text").and_then(Value::as_str).unwrap_or_default()
                );
            }
        }
    }
    text.trim().to_string()
}

/// Read token counts; a missing or null `usage` leaves every count unknown
pub fn extract_usage(data: &Value) -> Usage
{   let usage = data.get("usage");
    let count = |key: &str| usage
      .and_then(|u| u.get(key))
      .and_then(Value::as_u64);
    Usage
    {   input_tokens: count("input_tokens")
      , output_tokens: count("output_tokens")
      , total_tokens: count("total_tokens")
    }
}
