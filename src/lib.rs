pub mod error;
pub mod config;
pub mod secret;
pub mod callback;
pub mod request;
pub mod providers;
pub mod generator;

/*

unify-generator exposes the Unify LLM API as a single generator
component: hand it a prompt (and maybe some options), get back
`{ replies: [text], meta: {...} }`.

unify-generator/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error type
│   ├── config.rs       # Client config + persisted shape
│   ├── secret.rs       # Credential references (env var / token)
│   ├── callback.rs     # Named streaming callbacks
│   ├── request.rs      # Option merging, allow-list, reply types
│   ├── generator.rs    # The component itself
│   └── providers/
│       ├── mod.rs      # ProviderClient trait
│       ├── unify.rs    # Unify HTTP client
│       └── sse.rs      # Server-sent events reader
└── tests/

*/

pub use callback::{CallbackRegistry, StreamingCallback};
pub use config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use error::{Error, Result};
pub use generator::{UnifyGenerator, COMPONENT_TYPE};
pub use providers::{ProviderClient, UnifyClient};
pub use request::{
  GenerationKwargs, GeneratorOutput, ProviderReply, ALLOWED_PARAMS
};
pub use secret::{Secret, DEFAULT_API_KEY_ENV};
