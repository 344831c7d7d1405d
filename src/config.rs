//! Configuration for the Unify client and the persisted generator shape

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::GenerationKwargs;

/// Default Unify API base URL
pub const DEFAULT_API_BASE: &str = "https://api.unify.ai/v0";

/// Model used when none is given
pub const DEFAULT_MODEL: &str = "mistral-7b-instruct-v0.2@fireworks-ai";

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig
{   /// API base URL
    pub api_base: String
  , /// Request timeout in seconds; `None` leaves it to reqwest
    pub timeout_secs: Option<u64>
  , /// Log request/response bodies at trace level
    pub verbose: bool
}

impl Default for ClientConfig
{   fn default() -> Self
    {   ClientConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , timeout_secs: None
          , verbose: false
        }
    }
}

/// Constructor arguments as persisted under `init_parameters`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitParameters
{   /// Serialized secret reference
    pub api_key: Value
  , #[serde(default = "default_model")]
    pub model: String
  , /// Registered callback name
    #[serde(default)]
    pub streaming_callback: Option<String>
  , #[serde(default)]
    pub generation_kwargs: GenerationKwargs
}

fn default_model() -> String
{   DEFAULT_MODEL.to_string()
}

/// Full persisted component record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentState
{   #[serde(rename = "type")]
    pub type_name: String
  , pub init_parameters: InitParameters
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[test]
    fn init_parameters_fill_defaults()
    {   let params: InitParameters = serde_json::from_value(json!({
          "api_key": { "type": "env_var", "env_vars": ["K"], "strict": true }
        })).unwrap();

        assert_eq!(params.model, DEFAULT_MODEL);
        assert_eq!(params.streaming_callback, None);
        assert!(params.generation_kwargs.is_empty());
    }

    #[test]
    fn init_parameters_require_api_key()
    {   let res: Result<InitParameters, _> = serde_json::from_value(json!({
          "model": "m"
        }));
        assert!(res.is_err());
    }
}
