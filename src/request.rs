//! Request and response value types shared by every backend

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

impl Role
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Role::System => "system"
          , Role::User => "user"
          , Role::Assistant => "assistant"
        }
    }
}

/// One role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message
{   pub role: Role
  , pub content: String
}

impl Message
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   Message
        {   role
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Message::new(Role::Assistant, content)
    }
}

/// Sampling options applied to every request built from a bare message list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions
{   /// Temperature for sampling
    pub temperature: f64
  , /// Max tokens to generate
    pub max_output_tokens: Option<u32>
  , /// Backend-specific options merged into the payload
    pub extra: Map<String, Value>
}

impl Default for RequestOptions
{   fn default() -> Self
    {   RequestOptions
        {   temperature: 0.7
          , max_output_tokens: None
          , extra: Map::new()
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request
{   /// Conversation to complete
    pub messages: Vec<Message>
  , /// Target model identifier
    pub model: String
  , /// Temperature for sampling
    pub temperature: f64
  , /// Max tokens to generate
    pub max_output_tokens: Option<u32>
  , /// Backend-specific options merged into the payload
    #[serde(default)]
    pub extra: Map<String, Value>
}

impl Request
{   pub fn new(
      messages: Vec<Message>
    , model: impl Into<String>
    ) -> Self
    {   Request::with_options(messages, model, &RequestOptions::default())
    }

    pub fn with_options(
      messages: Vec<Message>
    , model: impl Into<String>
    , options: &RequestOptions
    ) -> Self
    {   Request
        {   messages
          , model: model.into()
          , temperature: options.temperature
          , max_output_tokens: options.max_output_tokens
          , extra: options.extra.clone()
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self
    {   self.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, max: u32) -> Self
    {   self.max_output_tokens = Some(max);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self
    {   self.extra.insert(key.into(), value);
        self
    }
}

/// Token counts as reported by the backend; any of them may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   pub input_tokens: Option<u64>
  , pub output_tokens: Option<u64>
  , pub total_tokens: Option<u64>
}

/// Result of one logical request
///
/// `error` and non-empty `content` may coexist: a validator runs after
/// content is obtained and can mark a response as failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response
{   /// Backend that produced it
    pub provider: String
  , /// Model that produced it
    pub model: String
  , /// Generated text
    pub content: String
  , /// Untouched backend payload
    pub raw: Value
  , pub usage: Usage
  , pub error: Option<String>
}

impl Response
{   pub fn new(
      provider: impl Into<String>
    , model: impl Into<String>
    , content: impl Into<String>
    ) -> Self
    {   Response
        {   provider: provider.into()
          , model: model.into()
          , content: content.into()
          , raw: Value::Null
          , usage: Usage::default()
          , error: None
        }
    }

    /// Empty-content response carrying only an error description
    pub fn failed(
      provider: impl Into<String>
    , model: impl Into<String>
    , error: impl Into<String>
    ) -> Self
    {   let error = error.into();
        Response
        {   provider: provider.into()
          , model: model.into()
          , content: String::new()
          , raw: json!({ "error": error })
          , usage: Usage::default()
          , error: Some(error)
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self
    {   self.usage = usage;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self
    {   self.raw = raw;
        self
    }

    pub fn is_success(&self) -> bool
    {   self.error.is_none()
    }
}
