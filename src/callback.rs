//! Named streaming callbacks
//!
//! Callbacks are persisted by name only. A [`CallbackRegistry`] maps
//! those names back to callables when a generator is rebuilt from state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error};

use crate::error::{Error, Result};

type CallbackFn = dyn Fn(&str) + Send + Sync;

/// Receives streamed text chunks in arrival order
#[derive(Clone)]
pub struct StreamingCallback
{   name: String
  , func: Arc<CallbackFn>
}

impl StreamingCallback
{   pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
      F: Fn(&str) + Send + Sync + 'static
    {   StreamingCallback
        {   name: name.into()
          , func: Arc::new(func)
        }
    }

    /// Serializable reference for this callback
    pub fn name(&self) -> &str
    {   &self.name
    }

    pub fn call(&self, chunk: &str)
    {   (self.func)(chunk)
    }
}

impl fmt::Debug for StreamingCallback
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("StreamingCallback")
          .field("name", &self.name)
          .finish_non_exhaustive()
    }
}

/// Lookup table used when deserializing generators
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry
{   callbacks: HashMap<String, StreamingCallback>
}

impl CallbackRegistry
{   pub fn new() -> Self
    {   Self::default()
    }

    /// Register a callback under its own name, replacing any previous one
    pub fn register(&mut self, callback: StreamingCallback)
    {   debug!("Registering streaming callback: {}", callback.name);
        self.callbacks.insert(callback.name.clone(), callback);
    }

    pub fn get(&self, name: &str) -> Option<&StreamingCallback>
    {   self.callbacks.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<StreamingCallback>
    {   self.get(name).cloned().ok_or_else(|| {
          error!("Unknown streaming callback: {}", name);
          Error::InvalidConfiguration(
            format!("streaming callback '{}' is not registered", name)
          )
        })
    }
}
