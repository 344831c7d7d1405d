use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::callback::StreamingCallback;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::providers::sse::{SseParser, DONE_MARKER};
use crate::providers::ProviderClient;
use crate::request::{GenerationKwargs, ProviderReply};

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct UnifyChatRequest<'a>
{   pub model: &'a str
  , pub messages: Vec<ChatMessage>
  , pub stream: bool
  , #[serde(flatten)]
    pub options: &'a GenerationKwargs
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnifyChatResponse
{   pub choices: Vec<Choice>
  , #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub usage: Option<Value>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnifyStreamChunk
{   #[serde(default)]
    pub choices: Vec<StreamChoice>
  , #[serde(default)]
    pub model: Option<String>
  , #[serde(default)]
    pub usage: Option<Value>
  , /// Set when the provider aborts the stream
    #[serde(default)]
    pub error: Option<Value>
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice
{   #[serde(default)]
    pub delta: Delta
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta
{   #[serde(default)]
    pub content: Option<String>
}

// ===== Unify Client =====

/// HTTP client for the Unify chat-completions API, bound to one model
pub struct UnifyClient
{   model: String
  , api_key: String
  , config: ClientConfig
  , http_client: reqwest::Client
}

impl UnifyClient
{   /// Create a client with the default configuration
    pub fn new(
      model: impl Into<String>
    , api_key: String
    ) -> Result<Self>
    {   Self::with_config(model, api_key, ClientConfig::default())
    }

    pub fn with_config(
      model: impl Into<String>
    , api_key: String
    , config: ClientConfig
    ) -> Result<Self>
    {   let model = model.into();
        debug!("Creating UnifyClient for model: {}", model);

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          Error::HttpError(e.to_string())
        })?;

        Ok(UnifyClient
        {   model
          , api_key
          , config
          , http_client
        })
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn config(&self) -> &ClientConfig
    {   &self.config
    }

    async fn post_chat(
      &self
    , prompt: &str
    , options: &GenerationKwargs
    , stream: bool
    ) -> Result<reqwest::Response>
    {   let request = UnifyChatRequest
        {   model: &self.model
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: prompt.to_string()
              }
            ]
          , stream
          , options
        };

        if self.config.verbose
        {   trace!("Unify request: {:?}", request);
        }

        let response = self.http_client
          .post(format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
          ))
          .bearer_auth(&self.api_key)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("Unify response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Unify API error ({}): {}", status, error_text);
            return Err(Error::ApiError(
              format!("Unify error ({}): {}", status, error_text)
            ));
        }

        Ok(response)
    }

    async fn handle_generate(
      &self
    , prompt: &str
    , options: &GenerationKwargs
    ) -> Result<ProviderReply>
    {   let response = self.post_chat(prompt, options, false).await?;

        let body = response.text().await.map_err(Error::from)?;
        if self.config.verbose
        {   trace!("Unify response body: {}", body);
        }

        let chat_response: UnifyChatResponse
          = serde_json::from_str(&body).map_err(|e| {
            error!("Parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        let choice = chat_response.choices.into_iter().next()
          .ok_or_else(|| {
            error!("No choices in response");
            Error::NoChoicesInResponse
          })?;

        let meta = build_meta(
          chat_response.model,
          choice.finish_reason,
          chat_response.usage
        );
        Ok(ProviderReply::new(choice.message.content).with_meta(meta))
    }

    async fn handle_stream(
      &self
    , prompt: &str
    , options: &GenerationKwargs
    , callback: &StreamingCallback
    ) -> Result<ProviderReply>
    {   let mut response = self.post_chat(prompt, options, true).await?;

        let mut parser = SseParser::new();
        let mut state = StreamState::default();
        // kept only until the first event, to report non-SSE bodies
        let mut unparsed = Vec::new();

        while let Some(bytes) = response.chunk().await.map_err(|e| {
          error!("Stream interrupted: {}", e);
          Error::from(e)
        })?
        {   if state.events == 0
            {   unparsed.extend_from_slice(&bytes);
            }
            for event in parser.push(&bytes)
            {   if state.apply(&event, callback)?
                {   return Ok(state.finish());
                }
            }
        }

        if let Some(event) = parser.finish()
        {   if state.apply(&event, callback)?
            {   return Ok(state.finish());
            }
        }

        if state.events == 0
        {   let body = String::from_utf8_lossy(&unparsed);
            error!("Unify stream carried no events: {}", body.trim());
            return Err(Error::ApiError(
              format!("Unify stream carried no events: {}", body.trim())
            ));
        }

        debug!("Stream ended without {}", DONE_MARKER);
        Ok(state.finish())
    }
}

#[async_trait]
impl ProviderClient for UnifyClient
{   async fn generate(
      &self
    , prompt: &str
    , options: &GenerationKwargs
    , streaming_callback: Option<&StreamingCallback>
    ) -> Result<ProviderReply>
    {   debug!(
          "Unify generate for model: {} (streaming: {})",
          self.model,
          streaming_callback.is_some()
        );
        match streaming_callback
        {   Some(callback) => {
              self.handle_stream(prompt, options, callback).await
            }
          , None => self.handle_generate(prompt, options).await
        }
    }
}

impl std::fmt::Debug for UnifyClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("UnifyClient")
          .field("model", &self.model)
          .field("config", &self.config)
          .finish_non_exhaustive()
    }
}

/// Running totals while consuming a stream
#[derive(Debug, Default)]
struct StreamState
{   events: usize
  , text: String
  , model: Option<String>
  , finish_reason: Option<String>
  , usage: Option<Value>
}

impl StreamState
{   /// Returns true once the done marker is seen
    fn apply(
      &mut self
    , event: &str
    , callback: &StreamingCallback
    ) -> Result<bool>
    {   self.events += 1;
        if event.trim() == DONE_MARKER
        {   return Ok(true);
        }

        let chunk: UnifyStreamChunk = serde_json::from_str(event)
          .map_err(|e| {
            error!("Stream chunk parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        if let Some(err) = chunk.error
        {   error!("Unify stream error: {}", err);
            return Err(Error::ApiError(
              format!("Unify stream error: {}", err)
            ));
        }

        if chunk.model.is_some()
        {   self.model = chunk.model;
        }
        if chunk.usage.is_some()
        {   self.usage = chunk.usage;
        }

        for choice in chunk.choices
        {   if let Some(content) = choice.delta.content
            {   if !content.is_empty()
                {   callback.call(&content);
                    self.text.push_str(&content);
                }
            }
            if choice.finish_reason.is_some()
            {   self.finish_reason = choice.finish_reason;
            }
        }
        Ok(false)
    }

    fn finish(self) -> ProviderReply
    {   let meta = build_meta(self.model, self.finish_reason, self.usage);
        ProviderReply::new(self.text).with_meta(meta)
    }
}

fn build_meta(
  model: Option<String>
, finish_reason: Option<String>
, usage: Option<Value>
) -> Map<String, Value>
{   let mut meta = Map::new();
    if let Some(model) = model
    {   meta.insert("model".to_string(), Value::String(model));
    }
    if let Some(reason) = finish_reason
    {   meta.insert("finish_reason".to_string(), Value::String(reason));
    }
    if let Some(usage) = usage
    {   meta.insert("usage".to_string(), usage);
    }
    meta
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn request_flattens_options()
    {   let options = json!({ "max_tokens": 16, "temperature": 0.1 })
          .as_object().cloned().unwrap();
        let request = UnifyChatRequest
        {   model: "m@p"
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: "hi".to_string()
              }
            ]
          , stream: false
          , options: &options
        };

        assert_eq!(
          serde_json::to_value(&request).unwrap(),
          json!({
            "model": "m@p",
            "messages": [{ "role": "user", "content": "hi" }],
            "stream": false,
            "max_tokens": 16,
            "temperature": 0.1
          })
        );
    }

    #[test]
    fn stream_state_collects_deltas_in_order()
    {   let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb = StreamingCallback::new("t", move |c| {
          sink.lock().unwrap().push(c.to_string());
        });

        let mut state = StreamState::default();
        let events = [
          r#"{"model":"m","choices":[{"delta":{"role":"assistant"}}]}"#,
          r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
          r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
        ];
        for e in events
        {   assert!(!state.apply(e, &cb).unwrap());
        }
        assert!(state.apply("[DONE]", &cb).unwrap());

        let reply = state.finish();
        assert_eq!(reply.text, "Hello");
        assert_eq!(*seen.lock().unwrap(), vec!["Hel", "lo"]);

        let meta = reply.meta.unwrap();
        assert_eq!(meta["model"], json!("m"));
        assert_eq!(meta["finish_reason"], json!("stop"));
    }

    #[test]
    fn stream_state_rejects_garbage()
    {   let cb = StreamingCallback::new("t", |_| {});
        let mut state = StreamState::default();
        assert!(matches!(
          state.apply("not json", &cb),
          Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn stream_state_surfaces_error_events()
    {   let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb = StreamingCallback::new("t", move |c| {
          sink.lock().unwrap().push(c.to_string());
        });

        let mut state = StreamState::default();
        assert!(!state
          .apply(r#"{"choices":[{"delta":{"content":"par"}}]}"#, &cb)
          .unwrap());

        match state.apply(
          r#"{"error":{"message":"model overloaded","code":503}}"#,
          &cb
        )
        {   Err(Error::ApiError(msg)) => {
              assert!(msg.contains("model overloaded"));
            }
          , other => panic!("expected ApiError, got {:?}", other)
        }
        assert_eq!(*seen.lock().unwrap(), vec!["par"]);
    }

    #[test]
    fn meta_omits_missing_fields()
    {   assert!(build_meta(None, None, None).is_empty());
    }
}
