//! fingraph LLM - provider adapters behind one request/response contract

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use mock::{MockBehavior, MockProvider};
pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::*;
