use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DocuflowError, Result};

/// Top-level configuration for the docuflow service.
///
/// Loaded from `docuflow.toml` by default (path overridable via the
/// `DOCUFLOW_CONFIG` environment variable). Secrets never live in the file:
/// the LLM API key is read from the environment variable named by
/// `llm.api_key_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocuflowConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for DocuflowConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            blob: BlobConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl DocuflowConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DocuflowConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DocuflowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port. Overridable via `DOCUFLOW_PORT`.
    pub port: u16,
    /// Data directory for the SQLite file and file-backed blob storage.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: "data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file, relative to `server.data_dir` unless absolute.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "docuflow.db".to_string(),
        }
    }
}

/// Chat-completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base endpoint, e.g. `https://myresource.openai.azure.com`.
    pub endpoint: String,
    /// Deployment (model) name.
    pub deployment: String,
    /// API version query parameter.
    pub api_version: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-02-01".to_string(),
            api_key_env: "DOCUFLOW_LLM_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Store URL: `file:///abs/path` or `memory:///` (tests).
    pub url: String,
    /// Prefix for template/prompt-config blobs.
    pub templates_prefix: String,
    /// Prefix for generated document artifacts.
    pub documents_prefix: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            url: "file://data/blobs".to_string(),
            templates_prefix: "templates".to_string(),
            documents_prefix: "documents".to_string(),
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hours before an idle session expires.
    pub ttl_hours: u32,
    /// How many questions to surface per conversation step.
    pub questions_per_step: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            questions_per_step: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DocuflowConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.deployment, "gpt-4o");
        assert_eq!(config.llm.api_version, "2024-02-01");
        assert_eq!(config.llm.api_key_env, "DOCUFLOW_LLM_API_KEY");
        assert_eq!(config.session.ttl_hours, 24);
        assert_eq!(config.session.questions_per_step, 1);
        assert_eq!(config.blob.templates_prefix, "templates");
        assert_eq!(config.blob.documents_prefix, "documents");
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml_str = r#"
            [server]
            port = 9090

            [llm]
            endpoint = "https://example.openai.azure.com"
        "#;
        let config: DocuflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9090);
        // Unset fields in a present section fall back too.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.llm.deployment, "gpt-4o");
        // Absent sections are fully defaulted.
        assert_eq!(config.database.path, "docuflow.db");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: DocuflowConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, DocuflowConfig::default().server.port);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docuflow.toml");

        let mut config = DocuflowConfig::default();
        config.server.port = 8123;
        config.llm.deployment = "gpt-4o-mini".to_string();
        config.save(&path).unwrap();

        let loaded = DocuflowConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 8123);
        assert_eq!(loaded.llm.deployment, "gpt-4o-mini");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = DocuflowConfig::load(Path::new("/nonexistent/docuflow.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DocuflowConfig::load_or_default(Path::new("/nonexistent/docuflow.toml"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_or_default_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not [ toml").unwrap();

        let config = DocuflowConfig::load_or_default(&path);
        assert_eq!(config.server.port, 8000);
    }
}
