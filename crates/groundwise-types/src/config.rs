//! Global configuration types for Groundwise.
//!
//! `GlobalConfig` represents the top-level `config.toml` that selects the
//! generator backend, the evidence index, agent limits, and session storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.groundwise/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub agents: AgentLimits,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl GlobalConfig {
    /// Clamp limits that would make the pipeline degenerate.
    ///
    /// Returns a description of every adjustment made.
    pub fn validate(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        if self.agents.max_subqueries == 0 {
            self.agents.max_subqueries = 1;
            fixes.push("agents.max_subqueries was 0, using 1".to_string());
        }
        if self.index.top_k == 0 {
            self.index.top_k = 1;
            fixes.push("index.top_k was 0, using 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            let clamped = self.generator.temperature.clamp(0.0, 2.0);
            fixes.push(format!(
                "generator.temperature {} out of range, using {clamped}",
                self.generator.temperature
            ));
            self.generator.temperature = clamped;
        }
        fixes
    }
}

/// Which OpenAI-compatible backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!("invalid provider: '{other}'")),
        }
    }
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key (ignored for Ollama).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// LanceDB directory; relative paths resolve against the data dir.
    #[serde(default = "default_index_path")]
    pub path: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Where fastembed caches model files; defaults to `{data_dir}/models`.
    #[serde(default)]
    pub model_cache_dir: Option<String>,
}

fn default_index_path() -> String {
    "index".to_string()
}

fn default_table() -> String {
    "chunks".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            table: default_table(),
            top_k: default_top_k(),
            model_cache_dir: None,
        }
    }
}

/// `[agents]` section: the bounds every agent respects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLimits {
    #[serde(default = "default_max_subqueries")]
    pub max_subqueries: usize,
    #[serde(default = "default_max_extra")]
    pub max_extra: usize,
    /// Recent turns replayed into the drafting prompt.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

fn default_max_subqueries() -> usize {
    5
}

fn default_max_extra() -> usize {
    4
}

fn default_history_turns() -> usize {
    6
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_subqueries: default_max_subqueries(),
            max_extra: default_max_extra(),
            history_turns: default_history_turns(),
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}
