//! The single model exchange every stage goes through

use fingraph_core::{Error, ModelConfig, Result, Stage};
use fingraph_llm::{LlmError, LlmMessage, LlmProvider, LlmRequest};
use std::sync::Arc;
use tracing::{debug, error};

/// Model identifier and sampling parameters for one stage.
#[derive(Clone, Debug)]
pub struct ModelCall {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelCall {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    /// Settings for extraction and resolution.
    pub fn extraction(config: &ModelConfig) -> Self {
        Self {
            model: config.extraction_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Settings for query answering.
    pub fn query(config: &ModelConfig) -> Self {
        Self {
            model: config.query_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Send one request and return the completion text. No retries.
pub async fn invoke(
    provider: &Arc<dyn LlmProvider>,
    stage: Stage,
    call: &ModelCall,
    messages: Vec<LlmMessage>,
) -> Result<String> {
    let request = LlmRequest::new(&call.model, messages)
        .with_temperature(call.temperature)
        .with_max_tokens(call.max_tokens);

    debug!(
        "{} call: provider={} model={} turns={}",
        stage,
        provider.name(),
        call.model,
        request.messages.len()
    );

    match provider.complete(request).await {
        Ok(completion) => Ok(completion.content),
        Err(e) => {
            error!("{} call failed: {}", stage, e);
            Err(map_llm_error(stage, e))
        }
    }
}

/// Unusable responses are output errors; everything else means the model
/// could not be reached.
pub fn map_llm_error(stage: Stage, e: LlmError) -> Error {
    match e {
        LlmError::InvalidResponse(reason) => Error::output_invalid(stage, reason),
        other => Error::model_unavailable(stage, other.to_string()),
    }
}
