pub mod error;
pub mod loader;
pub mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AgentConfig, CommentSource, GeneratorConfig, GeneratorKind, InboxConfig, TimeoutConfig};
