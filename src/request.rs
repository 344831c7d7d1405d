//! Generation options and the request/response shapes around a call

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Option names forwarded to the provider; everything else is dropped
pub const ALLOWED_PARAMS: [&str; 2] = ["max_tokens", "temperature"];

/// Generation options keyed by name
pub type GenerationKwargs = Map<String, Value>;

/// Merge defaults with per-call overrides; overrides win on collision
pub fn merge_generation_kwargs(
  defaults: &GenerationKwargs
, overrides: Option<&GenerationKwargs>
) -> GenerationKwargs
{   let mut merged = defaults.clone();
    if let Some(overrides) = overrides
    {   for (key, value) in overrides
        {   merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Keep only the allow-listed options
pub fn filter_allowed(kwargs: GenerationKwargs) -> GenerationKwargs
{   kwargs.into_iter()
      .filter(|(key, _)| {
        let keep = ALLOWED_PARAMS.contains(&key.as_str());
        if !keep
        {   trace!("Dropping generation option: {}", key);
        }
        keep
      })
      .collect()
}

/// What a provider client hands back for one prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply
{   /// Generated text
    pub text: String
  , /// Provider metadata (usage, finish reason, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>
}

impl ProviderReply
{   pub fn new(text: impl Into<String>) -> Self
    {   ProviderReply
        {   text: text.into()
          , meta: None
        }
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self
    {   self.meta = Some(meta);
        self
    }
}

/// Normalized generator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput
{   pub replies: Vec<String>
  , pub meta: Map<String, Value>
}

impl From<ProviderReply> for GeneratorOutput
{   fn from(reply: ProviderReply) -> Self
    {   GeneratorOutput
        {   replies: vec![reply.text]
          , meta: reply.meta.unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    fn kwargs(v: Value) -> GenerationKwargs
    {   v.as_object().cloned().unwrap()
    }

    #[test]
    fn overrides_win_on_collision()
    {   let defaults = kwargs(json!({ "temperature": 0.2, "max_tokens": 64 }));
        let overrides = kwargs(json!({ "temperature": 0.9 }));

        let merged = merge_generation_kwargs(&defaults, Some(&overrides));
        assert_eq!(merged["temperature"], json!(0.9));
        assert_eq!(merged["max_tokens"], json!(64));
    }

    #[test]
    fn merge_without_overrides_keeps_defaults()
    {   let defaults = kwargs(json!({ "max_tokens": 8 }));
        assert_eq!(merge_generation_kwargs(&defaults, None), defaults);
    }

    #[test]
    fn filter_drops_unknown_keys()
    {   let all = kwargs(json!({
          "max_tokens": 10,
          "temperature": 0.5,
          "top_p": 0.9,
          "stream": true,
          "temprature": 1.0
        }));

        let filtered = filter_allowed(all);
        let mut keys: Vec<_> = filtered.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["max_tokens", "temperature"]);
    }

    #[test]
    fn output_uses_empty_meta_when_absent()
    {   let out = GeneratorOutput::from(ProviderReply::new("hi"));
        assert_eq!(out.replies, vec!["hi"]);
        assert!(out.meta.is_empty());
    }
}
