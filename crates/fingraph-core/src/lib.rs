//! fingraph core - graph model, type registry, configuration, and error handling

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{
    BindMode, ConversationConfig, FingraphConfig, ModelConfig, ProviderKind, ServerConfig,
    StorageConfig, ValidationConfig, ValidationMode,
};
pub use error::{Error, Result, Stage};
pub use registry::AllowedTypes;
pub use types::*;
