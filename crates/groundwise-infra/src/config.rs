//! Global configuration loader for Groundwise.
//!
//! Reads `config.toml` from the data directory (`~/.groundwise/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use groundwise_types::config::GlobalConfig;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config after [`GlobalConfig::validate`],
///   logging each adjustment.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    let mut config = match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return GlobalConfig::default();
        }
    };

    for fix in config.validate() {
        tracing::warn!(path = %config_path.display(), "{fix}");
    }
    config
}

/// Write `config` to `{data_dir}/config.toml`, creating the directory.
pub async fn save_global_config(data_dir: &Path, config: &GlobalConfig) -> std::io::Result<()> {
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    tokio::fs::create_dir_all(data_dir).await?;
    tokio::fs::write(data_dir.join("config.toml"), content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwise_types::config::{ProviderKind, StorageBackend};
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.generator.provider, ProviderKind::Ollama);
        assert_eq!(config.generator.model, "llama3.2:3b");
        assert_eq!(config.agents.max_subqueries, 5);
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[generator]
provider = "openai"
model = "gpt-4o-mini"

[index]
top_k = 8

[storage]
backend = "sqlite"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.generator.provider, ProviderKind::OpenAi);
        assert_eq!(config.generator.model, "gpt-4o-mini");
        assert_eq!(config.index.top_k, 8);
        assert_eq!(config.index.table, "chunks");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.generator.model, "llama3.2:3b");
    }

    #[tokio::test]
    async fn load_global_config_clamps_degenerate_limits() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            "[agents]\nmax_subqueries = 0\n\n[generator]\ntemperature = 7.5\n",
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.agents.max_subqueries, 1);
        assert!((config.generator.temperature - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn save_then_load_preserves_settings() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested");
        let mut config = GlobalConfig::default();
        config.agents.max_extra = 2;
        config.storage.backend = StorageBackend::Sqlite;

        save_global_config(&dir, &config).await.unwrap();
        let loaded = load_global_config(&dir).await;
        assert_eq!(loaded.agents.max_extra, 2);
        assert_eq!(loaded.storage.backend, StorageBackend::Sqlite);
    }
}
