//! Graph store: the single cached record plus the query conversation
//!
//! The record is durable through a [`CacheBackend`]; the conversation lives
//! only as long as the process. Every mutation goes through one lock.

use crate::visual::VisualGraph;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fingraph_core::{ConversationTurn, Error, KnowledgeGraph, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The persisted record for the most recent generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedGraph {
    #[serde(default)]
    pub kg: KnowledgeGraph,
    #[serde(default)]
    pub visual_graph_nodes: VisualGraph,
    #[serde(default)]
    pub factual_triples: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl CachedGraph {
    pub fn new(kg: KnowledgeGraph, visual_graph_nodes: VisualGraph, factual_triples: impl Into<String>) -> Self {
        Self {
            kg,
            visual_graph_nodes,
            factual_triples: factual_triples.into(),
            generated_at: Some(Utc::now()),
        }
    }
}

/// Durable storage for one [`CachedGraph`]. A missing record is `Ok(None)`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self) -> Result<Option<CachedGraph>>;
    async fn save(&self, record: &CachedGraph) -> Result<()>;
}

/// JSON file on disk, replaced atomically on save.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "last_kg.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn load(&self) -> Result<Option<CachedGraph>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::cache_io(&self.path, e)),
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| Error::cache_io(&self.path, e))?;
        Ok(Some(record))
    }

    async fn save(&self, record: &CachedGraph) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::cache_io(dir, e))?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::cache_io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::cache_io(&self.path, e))?;
        debug!("Cached graph written to {}", self.path.display());
        Ok(())
    }
}

/// Process-local backend for tests and the offline CLI.
#[derive(Default)]
pub struct MemoryCache {
    record: std::sync::Mutex<Option<CachedGraph>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot holds a whole record or none, so a panic elsewhere cannot
    /// leave it half-written and a poisoned lock is safe to reuse.
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CachedGraph>> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn load(&self) -> Result<Option<CachedGraph>> {
        Ok(self.slot().clone())
    }

    async fn save(&self, record: &CachedGraph) -> Result<()> {
        *self.slot() = Some(record.clone());
        Ok(())
    }
}

// ============================================================
// GraphStore
// ============================================================

struct StoreState {
    conversation: Vec<ConversationTurn>,
    generation: u64,
}

/// What a query needs: the triplets, a copy of the conversation, and the
/// generation they were read under.
#[derive(Clone, Debug)]
pub struct QueryContext {
    pub triplets: String,
    pub conversation: Vec<ConversationTurn>,
    pub generation: u64,
}

pub struct GraphStore {
    backend: Box<dyn CacheBackend>,
    state: Mutex<StoreState>,
    max_turns: usize,
}

impl GraphStore {
    /// `max_turns == 0` leaves the conversation unbounded. An odd bound is
    /// rounded up so at least one whole exchange always fits.
    pub fn new(backend: impl CacheBackend + 'static, max_turns: usize) -> Self {
        let max_turns = if max_turns % 2 == 1 {
            warn!(
                "conversation.max_turns = {} is odd, using {}",
                max_turns,
                max_turns + 1
            );
            max_turns + 1
        } else {
            max_turns
        };
        Self {
            backend: Box::new(backend),
            state: Mutex::new(StoreState {
                conversation: Vec::new(),
                generation: 0,
            }),
            max_turns,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryCache::new(), 0)
    }

    pub async fn read(&self) -> Result<Option<CachedGraph>> {
        let _state = self.state.lock().await;
        self.backend.load().await
    }

    /// Replace the record wholesale. Last write wins.
    pub async fn write(&self, record: &CachedGraph) -> Result<()> {
        let mut state = self.state.lock().await;
        self.backend.save(record).await?;
        state.generation += 1;
        Ok(())
    }

    /// Write a new record and clear the conversation under the same lock.
    pub async fn replace_graph(&self, record: &CachedGraph) -> Result<()> {
        let mut state = self.state.lock().await;
        self.backend.save(record).await?;
        state.generation += 1;
        state.conversation.clear();
        info!(
            "Cached graph replaced (generation {}), conversation reset",
            state.generation
        );
        Ok(())
    }

    pub async fn reset_conversation(&self) {
        self.state.lock().await.conversation.clear();
    }

    pub async fn append_conversation(&self, turns: impl IntoIterator<Item = ConversationTurn>) {
        let mut state = self.state.lock().await;
        state.conversation.extend(turns);
        self.enforce_bound(&mut state.conversation);
    }

    /// A copy. Mutating it does not touch stored state.
    pub async fn read_conversation(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.conversation.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Fails with `NoGraph` when nothing has been generated.
    pub async fn query_context(&self) -> Result<QueryContext> {
        let state = self.state.lock().await;
        let record = self.backend.load().await?.ok_or(Error::NoGraph)?;
        Ok(QueryContext {
            triplets: record.factual_triples,
            conversation: state.conversation.clone(),
            generation: state.generation,
        })
    }

    /// Append one user/assistant exchange if the graph it answered is still
    /// current. Returns whether it was appended.
    pub async fn append_exchange(&self, generation: u64, user: ConversationTurn, assistant: ConversationTurn) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                "Dropping exchange from generation {} (current {})",
                generation, state.generation
            );
            return false;
        }
        state.conversation.push(user);
        state.conversation.push(assistant);
        self.enforce_bound(&mut state.conversation);
        true
    }

    fn enforce_bound(&self, conversation: &mut Vec<ConversationTurn>) {
        if self.max_turns == 0 || conversation.len() <= self.max_turns {
            return;
        }
        let excess = conversation.len() - self.max_turns;
        // whole pairs only, so the front stays a user turn
        let drop = (excess + 1) / 2 * 2;
        conversation.drain(..drop.min(conversation.len()));
    }
}
