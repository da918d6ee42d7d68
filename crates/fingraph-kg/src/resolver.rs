//! Structured graph → readable triplet text

use crate::invoke::{invoke, ModelCall};
use crate::prompts::{resolution_prompt, RESOLUTION_USER_TURN};
use crate::validate::{check_triplets, TripletFinding};
use fingraph_core::{Error, KnowledgeGraph, Result, Stage, ValidationMode};
use fingraph_llm::{LlmMessage, LlmProvider};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Resolution {
    /// Raw model text, stored verbatim.
    pub triplets: String,
    pub findings: Vec<TripletFinding>,
}

pub struct TripletResolver {
    provider: Arc<dyn LlmProvider>,
    call: ModelCall,
    mode: ValidationMode,
}

impl TripletResolver {
    pub fn new(provider: Arc<dyn LlmProvider>, call: ModelCall, mode: ValidationMode) -> Self {
        Self {
            provider,
            call,
            mode,
        }
    }

    pub async fn resolve(&self, graph: &KnowledgeGraph) -> Result<Resolution> {
        let graph_json = serde_json::to_string_pretty(graph)?;
        let messages = vec![
            LlmMessage::system(resolution_prompt(&graph_json)),
            LlmMessage::user(RESOLUTION_USER_TURN),
        ];
        let triplets = invoke(&self.provider, Stage::Resolution, &self.call, messages).await?;

        let findings = check_triplets(&triplets);
        if !findings.is_empty() {
            let summary = findings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            match self.mode {
                ValidationMode::Strict => {
                    return Err(Error::output_invalid(Stage::Resolution, summary));
                }
                ValidationMode::Permissive => {
                    warn!("Resolution produced {} findings: {}", findings.len(), summary);
                }
            }
        }

        info!("Resolved {} triplet lines", triplets.lines().count());
        Ok(Resolution { triplets, findings })
    }
}
