//! Credential references
//!
//! A [`Secret`] is either an inline token or a pointer to one or more
//! environment variables. Only the environment-variable form has a
//! serialized representation, so persisted state never carries a raw key.

use std::fmt;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Environment variable read when no key is supplied
pub const DEFAULT_API_KEY_ENV: &str = "UNIFY_API_KEY";

#[derive(Clone, PartialEq, Eq)]
pub enum Secret
{   /// Key supplied directly; cannot be serialized
    Token(String)
  , /// Key read from the first set variable in `env_vars`
    EnvVar
    {   env_vars: Vec<String>
      , strict: bool
    }
}

/// Wire form of a secret reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SecretRef
{   EnvVar
    {   env_vars: Vec<String>
      , #[serde(default = "default_strict")]
        strict: bool
    }
  , Token
}

fn default_strict() -> bool
{   true
}

impl Secret
{   pub fn from_token(token: impl Into<String>) -> Self
    {   Secret::Token(token.into())
    }

    /// Strict reference to a single environment variable
    pub fn from_env_var(name: impl Into<String>) -> Self
    {   Secret::EnvVar
        {   env_vars: vec![name.into()]
          , strict: true
        }
    }

    /// Reference to several variables, tried in order
    pub fn from_env_vars(
      names: Vec<String>
    , strict: bool
    ) -> Self
    {   Secret::EnvVar
        {   env_vars: names
          , strict
        }
    }

    /// Resolve the secret to its value.
    ///
    /// A strict env-var secret with none of its variables set is an
    /// error; a non-strict one resolves to `None`.
    pub fn resolve_value(&self) -> Result<Option<String>>
    {   match self
        {   Secret::Token(token) => Ok(Some(token.clone()))
          , Secret::EnvVar { env_vars, strict } => {
              let found = env_vars.iter()
                .find_map(|name| std::env::var(name).ok());

              match found
              {   Some(value) => {
                    debug!("Resolved secret from environment");
                    Ok(Some(value))
                  }
                , None if *strict => {
                    error!(
                      "None of the environment variables are set: {:?}",
                      env_vars
                    );
                    Err(Error::MissingApiKey(
                      format!(
                        "none of the environment variables are set: {}",
                        env_vars.join(", ")
                      )
                    ))
                  }
                , None => Ok(None)
              }
            }
        }
    }

    /// Serialized reference form. Token secrets are refused.
    pub fn to_value(&self) -> Result<Value>
    {   match self
        {   Secret::Token(_) => {
              error!("Refusing to serialize a token secret");
              Err(Error::InvalidConfiguration(
                "cannot serialize token-based secret, \
                 use an environment variable instead".to_string()
              ))
            }
          , Secret::EnvVar { env_vars, strict } => {
              let repr = SecretRef::EnvVar
              {   env_vars: env_vars.clone()
                , strict: *strict
              };
              serde_json::to_value(repr).map_err(|e| {
                Error::ParseError(e.to_string())
              })
            }
        }
    }

    pub fn from_value(value: &Value) -> Result<Self>
    {   let repr: SecretRef = serde_json::from_value(value.clone())
          .map_err(|e| {
            error!("Malformed secret reference: {}", e);
            Error::InvalidConfiguration(
              format!("malformed secret reference: {}", e)
            )
          })?;

        match repr
        {   SecretRef::EnvVar { env_vars, strict } => {
              if env_vars.is_empty()
              {   return Err(Error::InvalidConfiguration(
                    "secret reference names no environment variables"
                      .to_string()
                  ));
              }
              Ok(Secret::EnvVar { env_vars, strict })
            }
          , SecretRef::Token => {
              Err(Error::InvalidConfiguration(
                "token-based secrets cannot be deserialized".to_string()
              ))
            }
        }
    }
}

impl Default for Secret
{   fn default() -> Self
    {   Secret::from_env_var(DEFAULT_API_KEY_ENV)
    }
}

impl fmt::Debug for Secret
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   Secret::Token(_) => f.write_str("Secret::Token(<redacted>)")
          , Secret::EnvVar { env_vars, strict } => {
              f.debug_struct("Secret::EnvVar")
                .field("env_vars", env_vars)
                .field("strict", strict)
                .finish()
            }
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn token_resolves_to_itself()
    {   let s = Secret::from_token("abc");
        assert_eq!(s.resolve_value().unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn token_is_redacted_in_debug()
    {   let s = Secret::from_token("super-secret");
        assert!(!format!("{:?}", s).contains("super-secret"));
    }

    #[test]
    fn token_cannot_be_serialized()
    {   let err = Secret::from_token("abc").to_value().unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    #[serial]
    fn env_var_picks_first_set_variable()
    {   std::env::remove_var("UG_TEST_KEY_A");
        std::env::set_var("UG_TEST_KEY_B", "from-b");

        let s = Secret::from_env_vars(
          vec!["UG_TEST_KEY_A".into(), "UG_TEST_KEY_B".into()],
          true
        );
        assert_eq!(s.resolve_value().unwrap(), Some("from-b".to_string()));

        std::env::remove_var("UG_TEST_KEY_B");
    }

    #[test]
    #[serial]
    fn strict_env_var_fails_when_unset()
    {   std::env::remove_var("UG_TEST_KEY_UNSET");
        let s = Secret::from_env_var("UG_TEST_KEY_UNSET");
        assert!(matches!(
          s.resolve_value(),
          Err(Error::MissingApiKey(_))
        ));

        let lenient = Secret::from_env_vars(
          vec!["UG_TEST_KEY_UNSET".into()],
          false
        );
        assert_eq!(lenient.resolve_value().unwrap(), None);
    }

    #[test]
    fn env_var_reference_round_trips()
    {   let s = Secret::from_env_var("UNIFY_API_KEY");
        let v = s.to_value().unwrap();
        assert_eq!(
          v,
          json!({
            "type": "env_var",
            "env_vars": ["UNIFY_API_KEY"],
            "strict": true
          })
        );
        assert_eq!(Secret::from_value(&v).unwrap(), s);
    }

    #[test]
    fn rejects_token_and_unknown_types()
    {   let token = json!({ "type": "token" });
        assert!(matches!(
          Secret::from_value(&token),
          Err(Error::InvalidConfiguration(_))
        ));

        let unknown = json!({ "type": "vault", "path": "x" });
        assert!(matches!(
          Secret::from_value(&unknown),
          Err(Error::InvalidConfiguration(_))
        ));

        let empty = json!({ "type": "env_var", "env_vars": [] });
        assert!(Secret::from_value(&empty).is_err());
    }
}
