//! MockProvider: deterministic LLM responses for testing and offline runs
//!
//! Each call to `complete` pops the next scripted behavior and records the
//! request, so tests can assert on both the answer path and the exact
//! prompt that was sent.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{LlmCompletion, LlmRequest};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type MockHandler = Arc<dyn Fn(&LlmRequest) -> LlmResult<String> + Send + Sync>;

/// Mock behavior configuration
#[derive(Clone)]
pub enum MockBehavior {
    /// Return a text response
    Text(String),
    /// Fail as if the provider could not be reached
    Unavailable(String),
    /// Fail as if the provider sent back something unusable
    Invalid(String),
    /// Compute the response from the request
    Handler(MockHandler),
}

impl std::fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Unavailable(m) => f.debug_tuple("Unavailable").field(m).finish(),
            Self::Invalid(m) => f.debug_tuple("Invalid").field(m).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl MockBehavior {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn handler(f: impl Fn(&LlmRequest) -> LlmResult<String> + Send + Sync + 'static) -> Self {
        Self::Handler(Arc::new(f))
    }
}

/// A sequence of behaviors. Each call pops the next one.
/// If the sequence is exhausted, the default behavior is used.
pub struct MockProvider {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    /// Create a mock that always returns the same behavior
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock with a sequence of behaviors (consumed in order)
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors),
            default_behavior: MockBehavior::Unavailable("mock: sequence exhausted".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a sequence of plain text responses
    pub fn texts<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::sequence(responses.into_iter().map(|s| MockBehavior::Text(s.into())).collect())
    }

    /// Get the number of calls made
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every request received so far, oldest first
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().await.last().cloned()
    }

    async fn next_behavior(&self) -> MockBehavior {
        let mut behaviors = self.behaviors.lock().await;
        if behaviors.is_empty() {
            self.default_behavior.clone()
        } else {
            behaviors.remove(0)
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: LlmRequest) -> LlmResult<LlmCompletion> {
        self.requests.lock().await.push(request.clone());

        let content = match self.next_behavior().await {
            MockBehavior::Text(text) => text,
            MockBehavior::Unavailable(msg) => return Err(LlmError::RequestFailed(msg)),
            MockBehavior::Invalid(msg) => return Err(LlmError::InvalidResponse(msg)),
            MockBehavior::Handler(f) => f(&request)?,
        };

        Ok(LlmCompletion {
            content,
            model: request.model,
            stop_reason: Some("stop".into()),
            usage: None,
        })
    }
}
