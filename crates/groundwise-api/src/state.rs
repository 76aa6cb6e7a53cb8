//! Application state wiring the adapters together.
//!
//! `AppState` holds what every command needs (data dir, config, session
//! store). The generator and evidence index are only built by the commands
//! that answer questions, so `session` and `check` work without a model.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use groundwise_core::agent::orchestrator::{Orchestrator, TurnError};
use groundwise_core::memory::session::SessionMemory;
use groundwise_core::memory::store::BoxSessionStore;
use groundwise_core::retrieval::box_index::BoxVectorIndex;
use groundwise_core::retrieval::retriever::EvidenceRetriever;
use groundwise_infra::config::load_global_config;
use groundwise_infra::filesystem::resolve_data_dir;
use groundwise_infra::llm::create_generator;
use groundwise_infra::session::open_session_store;
use groundwise_infra::vector::open_evidence_index;
use groundwise_types::config::GlobalConfig;
use groundwise_types::session::SessionId;

/// Shared application state.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
    pub store: Arc<BoxSessionStore>,
}

impl AppState {
    /// Resolve the data dir, load config and open the session store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let store = open_session_store(&data_dir, &config.storage)
            .await
            .context("failed to open session store")?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            store = %store.name(),
            "application state ready"
        );

        Ok(Self {
            data_dir,
            config,
            store: Arc::new(store),
        })
    }

    /// Open (or create) the session `id` for exclusive use by one command.
    pub async fn open_session(&self, id: SessionId) -> anyhow::Result<SessionMemory> {
        let label = id.to_string();
        SessionMemory::open(Arc::clone(&self.store), id)
            .await
            .with_context(|| format!("failed to open session '{label}'"))
    }

    /// Build the turn pipeline: generator, evidence index and agents.
    pub async fn build_orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let generator = create_generator(&self.config.generator)
            .map_err(|e| with_hint(e.to_string(), e.remediation()))?;

        let index = open_evidence_index(&self.data_dir, &self.config.index)
            .await
            .map_err(|e| with_hint(e.to_string(), e.remediation().map(str::to_string)))?;

        let retriever = EvidenceRetriever::new(Arc::new(BoxVectorIndex::new(index)))
            .with_top_k(self.config.index.top_k);

        tracing::info!(
            provider = %generator.provider_name(),
            model = %generator.model(),
            top_k = retriever.top_k(),
            "pipeline ready"
        );

        Ok(Orchestrator::new(generator, retriever, &self.config.agents))
    }
}

/// Parse a user-supplied session id.
pub fn parse_session_id(raw: &str) -> anyhow::Result<SessionId> {
    SessionId::new(raw).map_err(|e| anyhow::anyhow!("invalid session id '{raw}': {e}"))
}

/// Turn a failed turn into an error that carries its remediation hint.
pub fn turn_error(err: TurnError) -> anyhow::Error {
    let hint = err.remediation();
    with_hint(err.to_string(), hint)
}

fn with_hint(message: String, hint: Option<String>) -> anyhow::Error {
    match hint {
        Some(hint) => anyhow::anyhow!("{message}\n  hint: {hint}"),
        None => anyhow::anyhow!(message),
    }
}
