//! fingraph configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists, then environment
//! variables override individual fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FingraphConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub conversation: ConversationConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: BindMode,
}

/// Bind mode for the HTTP server
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
            _ => BindMode::Lan,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    /// Scripted offline provider; answers from a fixed script.
    Mock,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "mock" => Some(ProviderKind::Mock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    /// Model used for extraction and triplet resolution.
    pub extraction_model: String,
    /// Model used for query answering.
    pub query_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Provider endpoint override. Empty means the provider default.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-call deadline for one model exchange.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable record of the last generated graph.
    pub cache_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Maximum stored turns. 0 = unbounded.
    pub max_turns: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
}

/// What to do when model output breaks the structural contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Log findings and continue.
    #[default]
    Permissive,
    /// Reject the output as `ModelOutputInvalid`.
    Strict,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5050,
            bind: BindMode::Lan,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            extraction_model: "gpt-4o".into(),
            query_model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: 4096,
            base_url: String::new(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("data/last_kg.json"),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { max_turns: 40 }
    }
}

// ============================================================
// Loading
// ============================================================

impl FingraphConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Apply `FINGRAPH_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, so tests need not touch
    /// the process environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("FINGRAPH_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(provider) = lookup("FINGRAPH_PROVIDER") {
            match ProviderKind::parse(&provider) {
                Some(kind) => self.model.provider = kind,
                None => tracing::warn!("Unknown FINGRAPH_PROVIDER '{}', keeping {:?}", provider, self.model.provider),
            }
        }
        if let Some(model) = lookup("FINGRAPH_EXTRACTION_MODEL") {
            self.model.extraction_model = model;
        }
        if let Some(model) = lookup("FINGRAPH_QUERY_MODEL") {
            self.model.query_model = model;
        }
        if let Some(path) = lookup("FINGRAPH_CACHE_PATH") {
            self.storage.cache_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("FINGRAPH_BASE_URL") {
            self.model.base_url = url;
        }
    }

    /// The API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.model.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
