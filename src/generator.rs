//! The Unify generator component

use log::{debug, error, info};
use serde_json::Value;

use crate::callback::{CallbackRegistry, StreamingCallback};
use crate::config::{ClientConfig, ComponentState, InitParameters, DEFAULT_MODEL};
use crate::error::{Error, Result};
use crate::providers::{ProviderClient, UnifyClient};
use crate::request::{
  filter_allowed, merge_generation_kwargs, GenerationKwargs, GeneratorOutput
};
use crate::secret::Secret;

/// Type name written into persisted state
pub const COMPONENT_TYPE: &str = "unify_generator.UnifyGenerator";

/// Text generator backed by a provider client (Unify by default).
///
/// The credential is resolved once, when the generator is built, and the
/// resulting client is held for the generator's lifetime.
#[derive(Debug)]
pub struct UnifyGenerator<C = UnifyClient>
{   api_key: Secret
  , model: String
  , generation_kwargs: GenerationKwargs
  , streaming_callback: Option<StreamingCallback>
  , client: C
}

impl UnifyGenerator<UnifyClient>
{   pub fn new(
      api_key: Secret
    , model: impl Into<String>
    , streaming_callback: Option<StreamingCallback>
    , generation_kwargs: Option<GenerationKwargs>
    ) -> Result<Self>
    {   Self::with_client_config(
          api_key,
          model,
          streaming_callback,
          generation_kwargs,
          ClientConfig::default()
        )
    }

    /// Same as [`new`](Self::new) with a custom HTTP configuration
    pub fn with_client_config(
      api_key: Secret
    , model: impl Into<String>
    , streaming_callback: Option<StreamingCallback>
    , generation_kwargs: Option<GenerationKwargs>
    , config: ClientConfig
    ) -> Result<Self>
    {   Self::build(
          api_key,
          model,
          streaming_callback,
          generation_kwargs,
          |model, key| UnifyClient::with_config(model, key, config)
        )
    }

    /// Key from `UNIFY_API_KEY`, default model, no options
    pub fn from_env() -> Result<Self>
    {   Self::new(Secret::default(), DEFAULT_MODEL, None, None)
    }

    /// Rebuild a generator from [`export_state`](Self::export_state) output
    pub fn import_state(
      state: &Value
    , callbacks: &CallbackRegistry
    ) -> Result<Self>
    {   Self::import_state_with(state, callbacks, |model, key| {
          UnifyClient::new(model, key)
        })
    }
}

impl<C: ProviderClient> UnifyGenerator<C>
{   /// Resolve the credential and hand it to `make_client`.
    ///
    /// `make_client` is not called when resolution fails.
    pub fn build<F>(
      api_key: Secret
    , model: impl Into<String>
    , streaming_callback: Option<StreamingCallback>
    , generation_kwargs: Option<GenerationKwargs>
    , make_client: F
    ) -> Result<Self>
    where
      F: FnOnce(&str, String) -> Result<C>
    {   let model = model.into();
        debug!("Building UnifyGenerator for model: {}", model);

        let key = api_key.resolve_value()?.ok_or_else(|| {
          error!("API key resolved to nothing");
          Error::MissingApiKey(format!("{:?}", api_key))
        })?;
        let client = make_client(&model, key)?;

        Ok(UnifyGenerator
        {   api_key
          , model
          , generation_kwargs: generation_kwargs.unwrap_or_default()
          , streaming_callback
          , client
        })
    }

    /// Generate one reply for `prompt`.
    ///
    /// Per-call options override the defaults, then anything outside
    /// `max_tokens`/`temperature` is dropped. Provider errors are
    /// returned as-is.
    pub async fn run(
      &self
    , prompt: &str
    , generation_kwargs: Option<&GenerationKwargs>
    ) -> Result<GeneratorOutput>
    {   let merged = merge_generation_kwargs(
          &self.generation_kwargs,
          generation_kwargs
        );
        let filtered = filter_allowed(merged);
        debug!(
          "Running prompt against {} with {} option(s)",
          self.model,
          filtered.len()
        );

        let reply = self.client
          .generate(prompt, &filtered, self.streaming_callback.as_ref())
          .await
          .map_err(|e| {
            error!("Generation failed: {}", e);
            e
          })?;

        Ok(GeneratorOutput::from(reply))
    }

    /// Serialize the configuration. Fails for inline token secrets.
    pub fn export_state(&self) -> Result<Value>
    {   let state = ComponentState
        {   type_name: COMPONENT_TYPE.to_string()
          , init_parameters: InitParameters
            {   api_key: self.api_key.to_value()?
              , model: self.model.clone()
              , streaming_callback: self.streaming_callback
                  .as_ref()
                  .map(|cb| cb.name().to_string())
              , generation_kwargs: self.generation_kwargs.clone()
            }
        };

        serde_json::to_value(state).map_err(|e| {
          Error::ParseError(e.to_string())
        })
    }

    /// Rebuild from persisted state with a custom client factory
    pub fn import_state_with<F>(
      state: &Value
    , callbacks: &CallbackRegistry
    , make_client: F
    ) -> Result<Self>
    where
      F: FnOnce(&str, String) -> Result<C>
    {   let state: ComponentState = serde_json::from_value(state.clone())
          .map_err(|e| {
            error!("Malformed generator state: {}", e);
            Error::InvalidConfiguration(
              format!("malformed generator state: {}", e)
            )
          })?;

        if state.type_name != COMPONENT_TYPE
        {   return Err(Error::InvalidConfiguration(
              format!(
                "expected type '{}', found '{}'",
                COMPONENT_TYPE,
                state.type_name
              )
            ));
        }

        let params = state.init_parameters;
        let api_key = Secret::from_value(&params.api_key)?;
        let streaming_callback = params.streaming_callback
          .as_deref()
          .map(|name| callbacks.resolve(name))
          .transpose()?;

        info!("Restoring UnifyGenerator for model: {}", params.model);
        Self::build(
          api_key,
          params.model,
          streaming_callback,
          Some(params.generation_kwargs),
          make_client
        )
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn generation_kwargs(&self) -> &GenerationKwargs
    {   &self.generation_kwargs
    }

    pub fn api_key(&self) -> &Secret
    {   &self.api_key
    }

    pub fn streaming_callback(&self) -> Option<&StreamingCallback>
    {   self.streaming_callback.as_ref()
    }

    pub fn client(&self) -> &C
    {   &self.client
    }
}
