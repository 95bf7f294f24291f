//! Configuration settings for Scout.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub retry: RetrySettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Hosted language model settings (any OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the chat completions API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature. Agents want 0.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Embedding API settings (any OpenAI-compatible embeddings endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of the embeddings API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Embedding model to use.
    pub model: String,
    /// Requested embedding dimensions. None lets the provider decide.
    pub dimensions: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.cohere.ai/compatibility/v1".to_string(),
            api_key_env: "COHERE_API_KEY".to_string(),
            model: "embed-english-v3.0".to_string(),
            dimensions: None,
            timeout_secs: 30,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to the SQLite document index (opened read-only).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.scout/index.db".to_string(),
        }
    }
}

/// Document retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks returned by the document search tool.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Reasoning loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum decision rounds per request.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// DuckDuckGo HTML endpoint.
    pub endpoint: String,
    /// Maximum number of results handed to the model.
    pub max_results: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 5,
            timeout_secs: 15,
        }
    }
}

/// Retry settings for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff in milliseconds, doubled on each retry.
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
        }
    }
}

/// Chat web UI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Chat sessions idle for longer than this are dropped.
    pub session_idle_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_idle_secs: 3600,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scout")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded SQLite index path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

/// API secrets, read once from the environment at startup.
#[derive(Clone)]
pub struct Credentials {
    /// Key for the language model provider.
    pub llm_api_key: String,
    /// Key for the embedding provider, present when document search is enabled.
    pub embedding_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &"<redacted>")
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    ///
    /// Fails fast when a required key is missing or empty; the embedding key
    /// is only required when `require_embedding` is set.
    pub fn from_env(settings: &Settings, require_embedding: bool) -> Result<Self> {
        Self::from_lookup(settings, require_embedding, |name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup function.
    pub fn from_lookup<F>(settings: &Settings, require_embedding: bool, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_api_key = require_var(&settings.llm.api_key_env, &lookup)?;
        let embedding_api_key = if require_embedding {
            Some(require_var(&settings.embedding.api_key_env, &lookup)?)
        } else {
            lookup(&settings.embedding.api_key_env).filter(|k| !k.trim().is_empty())
        };

        Ok(Self {
            llm_api_key,
            embedding_api_key,
        })
    }

    /// Read only the embedding key, for commands that never call the model.
    pub fn embedding_key_from_env(settings: &Settings) -> Result<String> {
        require_var(&settings.embedding.api_key_env, &|name: &str| {
            std::env::var(name).ok()
        })
    }
}

fn require_var<F>(name: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ScoutError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        None => Err(ScoutError::Config(format!(
            "{} not set. Set it with: export {}='...' (or add it to .env)",
            name, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.agent.max_iterations, 5);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.llm.temperature, 0.0);
        assert_eq!(settings.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(settings.embedding.api_key_env, "COHERE_API_KEY");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [general]
            log_level = "debug"

            [agent]
            max_iterations = 8

            [llm]
            model = "llama-3.1-8b-instant"
            "#,
        )
        .unwrap();

        assert_eq!(settings.general.log_level, "debug");
        assert_eq!(settings.agent.max_iterations, 8);
        assert_eq!(settings.llm.model, "llama-3.1-8b-instant");
        assert_eq!(settings.llm.api_base, "https://api.groq.com/openai/v1");
        assert_eq!(settings.server.port, 8501);
        assert_eq!(settings.server.session_idle_secs, 3600);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.search.max_results = 3;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.search.max_results, 3);
    }

    #[test]
    fn test_credentials_missing_llm_key_fails_fast() {
        let settings = Settings::default();
        let err = Credentials::from_lookup(&settings, false, lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ScoutError::Config(ref msg) if msg.contains("GROQ_API_KEY")));
    }

    #[test]
    fn test_credentials_empty_key_rejected() {
        let settings = Settings::default();
        let err = Credentials::from_lookup(&settings, false, lookup_from(&[("GROQ_API_KEY", " ")]))
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_credentials_embedding_key_only_required_on_demand() {
        let settings = Settings::default();

        let creds =
            Credentials::from_lookup(&settings, false, lookup_from(&[("GROQ_API_KEY", "gsk_1")]))
                .unwrap();
        assert!(creds.embedding_api_key.is_none());

        let err =
            Credentials::from_lookup(&settings, true, lookup_from(&[("GROQ_API_KEY", "gsk_1")]))
                .unwrap_err();
        assert!(err.to_string().contains("COHERE_API_KEY"));

        let creds = Credentials::from_lookup(
            &settings,
            true,
            lookup_from(&[("GROQ_API_KEY", "gsk_1"), ("COHERE_API_KEY", "co_2")]),
        )
        .unwrap();
        assert_eq!(creds.embedding_api_key.as_deref(), Some("co_2"));
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials {
            llm_api_key: "gsk_secret".to_string(),
            embedding_api_key: Some("co_secret".to_string()),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }
}
