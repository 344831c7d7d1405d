//! Provider clients the generator can drive

pub mod sse;
pub mod unify;

use async_trait::async_trait;

use crate::callback::StreamingCallback;
use crate::error::Result;
use crate::request::{GenerationKwargs, ProviderReply};

// Re-export for convenience
pub use unify::UnifyClient;

/// A client that turns one prompt into one reply.
///
/// `options` has already been reduced to the allowed names. When a
/// callback is given the client streams and calls it once per text
/// chunk, in arrival order, before returning.
#[async_trait]
pub trait ProviderClient: Send + Sync
{   async fn generate(
      &self
    , prompt: &str
    , options: &GenerationKwargs
    , streaming_callback: Option<&StreamingCallback>
    ) -> Result<ProviderReply>;
}
