//! Text → structured graph

use crate::invoke::{invoke, ModelCall};
use crate::prompts::{extraction_prompt, EXTRACTION_USER_TURN};
use crate::prune::{prune_isolated_nodes, Pruned};
use crate::validate::{parse_graph, validate_graph, ValidationReport};
use fingraph_core::{Error, Result, Stage, ValidationMode};
use fingraph_llm::{LlmMessage, LlmProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Output of one extraction: the pruned graph plus what validation saw.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub pruned: Pruned,
    pub report: ValidationReport,
}

pub struct Extractor {
    provider: Arc<dyn LlmProvider>,
    call: ModelCall,
    mode: ValidationMode,
}

impl Extractor {
    pub fn new(provider: Arc<dyn LlmProvider>, call: ModelCall, mode: ValidationMode) -> Self {
        Self {
            provider,
            call,
            mode,
        }
    }

    pub async fn extract(&self, text: &str) -> Result<Extraction> {
        let messages = vec![
            LlmMessage::system(extraction_prompt(text)),
            LlmMessage::user(EXTRACTION_USER_TURN),
        ];
        let raw = invoke(&self.provider, Stage::Extraction, &self.call, messages).await?;

        let parsed = parse_graph(&raw)?;
        let report = validate_graph(&parsed);
        if !report.is_clean() {
            match self.mode {
                ValidationMode::Strict => {
                    return Err(Error::output_invalid(Stage::Extraction, report.summary()));
                }
                ValidationMode::Permissive => {
                    warn!("Extraction produced {} findings: {}", report.len(), report.summary());
                }
            }
        }

        let pruned = prune_isolated_nodes(parsed.graph);
        info!(
            "Extracted {} entities, {} measurements, {} facts ({} isolated removed)",
            pruned.graph.entities.len(),
            pruned.graph.measurements.len(),
            pruned.graph.facts.len(),
            pruned.removed_count()
        );

        Ok(Extraction { pruned, report })
    }
}
