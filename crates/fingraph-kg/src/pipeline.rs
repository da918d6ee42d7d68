//! End-to-end composition: extract → visualize → resolve → persist, and query

use crate::extractor::Extractor;
use crate::invoke::ModelCall;
use crate::query::QueryEngine;
use crate::resolver::TripletResolver;
use crate::store::{CachedGraph, FileCache, GraphStore};
use crate::visual::build_visual_graph;
use fingraph_core::{AllowedTypes, ConversationTurn, Error, FingraphConfig, Result};
use fingraph_llm::LlmProvider;
use std::sync::Arc;
use tracing::info;

struct Engines {
    extractor: Extractor,
    resolver: TripletResolver,
    query: QueryEngine,
}

/// The request surface behind the HTTP routes and the CLI.
///
/// Built without a provider it still serves the cached record, the
/// conversation and the registry; model-backed operations fail with
/// `Configuration`.
pub struct KnowledgePipeline {
    store: Arc<GraphStore>,
    engines: Option<Engines>,
}

impl KnowledgePipeline {
    pub fn new(config: &FingraphConfig, provider: Option<Arc<dyn LlmProvider>>, store: Arc<GraphStore>) -> Self {
        let mode = config.validation.mode;
        let engines = provider.map(|p| Engines {
            extractor: Extractor::new(p.clone(), ModelCall::extraction(&config.model), mode),
            resolver: TripletResolver::new(p.clone(), ModelCall::extraction(&config.model), mode),
            query: QueryEngine::new(p, ModelCall::query(&config.model)),
        });
        Self { store, engines }
    }

    /// Store backed by the configured cache file.
    pub fn from_config(config: &FingraphConfig, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        let store = GraphStore::new(
            FileCache::new(&config.storage.cache_path),
            config.conversation.max_turns,
        );
        Self::new(config, provider, Arc::new(store))
    }

    pub fn model_ready(&self) -> bool {
        self.engines.is_some()
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    fn engines(&self) -> Result<&Engines> {
        self.engines.as_ref().ok_or_else(Error::not_configured)
    }

    /// Extract, resolve and cache a new graph. Resets the conversation.
    pub async fn generate(&self, text: &str) -> Result<CachedGraph> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text is empty".into()));
        }
        let engines = self.engines()?;

        let extraction = engines.extractor.extract(text).await?;
        let graph = extraction.pruned.graph;
        let visual = build_visual_graph(&graph);
        let resolution = engines.resolver.resolve(&graph).await?;

        let record = CachedGraph::new(graph, visual, resolution.triplets);
        self.store.replace_graph(&record).await?;
        info!(
            "Generated graph: {} nodes, {} facts",
            record.kg.node_count(),
            record.kg.facts.len()
        );
        Ok(record)
    }

    pub async fn query(&self, query: &str) -> Result<String> {
        let engines = self.engines()?;
        engines.query.answer(&self.store, query).await
    }

    pub async fn clear_conversation(&self) {
        self.store.reset_conversation().await;
        info!("Conversation cleared");
    }

    pub async fn conversation(&self) -> Vec<ConversationTurn> {
        self.store.read_conversation().await
    }

    pub async fn last_graph(&self) -> Result<Option<CachedGraph>> {
        self.store.read().await
    }

    pub fn allowed_types(&self) -> AllowedTypes {
        AllowedTypes::current()
    }
}
