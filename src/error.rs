use std::fmt;

/// Result alias used throughout the generator
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error type for generator operations
/// Implements Clone so callers can keep a failed reply around
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Credential could not be resolved
    MissingApiKey(String)
  , /// Invalid or malformed configuration / persisted state
    InvalidConfiguration(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// No choices in API response
    NoChoicesInResponse
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(source) => {
              write!(f, "Missing API key: {}", source)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
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
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
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

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn display_includes_context()
    {   let e = Error::MissingApiKey("UNIFY_API_KEY".to_string());
        assert_eq!(e.to_string(), "Missing API key: UNIFY_API_KEY");

        let e = Error::InvalidConfiguration("no api_key".into());
        assert_eq!(e.to_string(), "Invalid configuration: no api_key");
    }

    #[test]
    fn string_conversions_become_other()
    {   assert_eq!(Error::from("boom"), Error::Other("boom".into()));
        assert_eq!(
          Error::from("boom".to_string()),
          Error::Other("boom".into())
        );
    }
}
