//! Health check command: `groundwise check`.
//!
//! Probes each external dependency in turn and reports what is wrong with a
//! remediation hint, instead of failing on the first problem.

use anyhow::Result;
use console::style;
use serde::Serialize;

use groundwise_core::retrieval::box_index::BoxVectorIndex;
use groundwise_infra::filesystem::resolve_index_path;
use groundwise_infra::llm::{create_provider, test_provider_connection};
use groundwise_infra::vector::open_evidence_index;
use groundwise_types::error::RetrievalError;
use groundwise_types::llm::GenerationError;

use super::ui;
use crate::state::AppState;

/// Outcome of one probe.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
            hint,
        }
    }
}

/// Run every probe and print the report. Fails when any probe failed.
pub async fn check(state: &AppState, json: bool) -> Result<()> {
    let spinner = ui::spinner("checking...", json);
    let results = vec![
        check_config(state),
        check_generator(state).await,
        check_index(state).await,
        check_store(state).await,
    ];
    spinner.finish_and_clear();

    let failed = results.iter().filter(|r| !r.ok).count();

    if json {
        let report = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "healthy": failed == 0,
            "checks": results,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} Groundwise v{}",
            style("🔍").bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!();
        for result in &results {
            println!(
                "  {} {:<10} {}",
                ui::check_mark(result.ok),
                style(result.name).bold(),
                result.detail
            );
            if let Some(hint) = &result.hint {
                println!("    {} {}", style("hint:").yellow(), style(hint).dim());
            }
        }
        println!();
    }

    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn check_config(state: &AppState) -> CheckResult {
    let path = state.data_dir.join("config.toml");
    let config = &state.config;
    let detail = format!(
        "{} ({} / {}, {} store)",
        if path.exists() {
            path.display().to_string()
        } else {
            "defaults (no config.toml)".to_string()
        },
        config.generator.provider,
        config.generator.model,
        state.store.name()
    );
    CheckResult::pass("config", detail)
}

async fn check_generator(state: &AppState) -> CheckResult {
    let provider = match create_provider(&state.config.generator) {
        Ok(provider) => provider,
        Err(e) => return generator_failure(e),
    };
    match test_provider_connection(&provider).await {
        Ok(()) => CheckResult::pass(
            "generator",
            format!("{} answered with model {}", provider.name(), provider.model()),
        ),
        Err(e) => generator_failure(e),
    }
}

fn generator_failure(e: GenerationError) -> CheckResult {
    let hint = e.remediation();
    CheckResult::fail("generator", e.to_string(), hint)
}

async fn check_index(state: &AppState) -> CheckResult {
    let path = resolve_index_path(&state.data_dir, &state.config.index);
    let index = match open_evidence_index(&state.data_dir, &state.config.index).await {
        Ok(index) => BoxVectorIndex::new(index),
        Err(e) => return index_failure(e),
    };
    match index.count().await {
        Ok(0) => CheckResult::fail(
            "index",
            format!("table '{}' at {} is empty", state.config.index.table, path.display()),
            Some("load evidence chunks into the table before asking questions".to_string()),
        ),
        Ok(n) => CheckResult::pass("index", format!("{} ({n} chunks)", index.name())),
        Err(e) => index_failure(e),
    }
}

fn index_failure(e: RetrievalError) -> CheckResult {
    let hint = e.remediation().map(str::to_string);
    CheckResult::fail("index", e.to_string(), hint)
}

async fn check_store(state: &AppState) -> CheckResult {
    match state.store.list().await {
        Ok(ids) => CheckResult::pass(
            "sessions",
            format!("{} store, {} session(s)", state.store.name(), ids.len()),
        ),
        Err(e) => CheckResult::fail(
            "sessions",
            e.to_string(),
            Some(format!("check permissions on {}", state.data_dir.display())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_hint() {
        let result = index_failure(RetrievalError::NotConfigured("no index".to_string()));
        assert!(!result.ok);
        assert!(result.hint.is_some());
    }

    #[test]
    fn test_generator_failure_hint() {
        let result = generator_failure(GenerationError::ModelNotFound("llama3.2:3b".to_string()));
        assert!(!result.ok);
        assert!(result.hint.unwrap().contains("ollama pull llama3.2:3b"));
    }

    #[test]
    fn test_pass_serializes_without_hint() {
        let value = serde_json::to_value(CheckResult::pass("config", "defaults")).unwrap();
        assert_eq!(value["ok"], true);
        assert!(value.get("hint").is_none());
    }
}
