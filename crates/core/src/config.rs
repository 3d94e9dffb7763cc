//! Configuration management for Explainer.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (`.explainer/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths (documents, store,
//! query log) resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["claude", "ollama"];

/// Default model used for answer synthesis.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

/// Environment variable the Anthropic key is read from when nothing else is configured.
pub const DEFAULT_CLAUDE_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .explainer/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider used for answer synthesis ("claude", "ollama")
    pub provider: String,

    /// Model identifier used for answer synthesis
    pub model: String,

    /// API key override for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Retrieval pipeline settings
    pub rag: RagSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Per-session query limits
    pub limits: LimitSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

/// Retrieval pipeline settings (`rag:` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Words per chunk window
    pub chunk_size: u32,

    /// Words shared by consecutive windows
    pub chunk_overlap: u32,

    /// Chunks retrieved per question
    pub top_k: u32,

    /// Output token cap for answer synthesis
    pub max_tokens: u32,

    /// Generation timeout in seconds
    pub timeout_secs: u64,

    /// Directory scanned for `.pdf` files
    pub documents_dir: PathBuf,

    /// Persisted embedding store
    pub store_path: PathBuf,

    /// SQLite query log
    pub log_db_path: PathBuf,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            chunk_overlap: 50,
            top_k: 5,
            max_tokens: 1500,
            timeout_secs: 60,
            documents_dir: PathBuf::from("data"),
            store_path: PathBuf::from(".explainer/embedding_store.json"),
            log_db_path: PathBuf::from(".explainer/query_logs.db"),
        }
    }
}

/// Embedding model settings (`embedding:` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" (offline) or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint for HTTP providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Per-session query limits (`limits:` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitSettings {
    /// Questions allowed per session
    pub max_queries: u32,

    /// Maximum characters in a question
    pub max_input_length: usize,

    /// Environment variable holding the SHA-256 hex of the admin password
    pub admin_password_hash_env: String,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_queries: 5,
            max_input_length: 500,
            admin_password_hash_env: "EXPLAINER_ADMIN_PASSWORD_HASH".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagSettings>,
    embedding: Option<EmbeddingSettings>,
    limits: Option<LimitSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "claude".to_string(),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagSettings::default(),
            embedding: EmbeddingSettings::default(),
            limits: LimitSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `EXPLAINER_WORKSPACE`: Override workspace path
    /// - `EXPLAINER_CONFIG`: Path to config file
    /// - `EXPLAINER_PROVIDER`: LLM provider
    /// - `EXPLAINER_MODEL`: Model identifier
    /// - `EXPLAINER_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use explainer_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with a workspace and config file chosen on
    /// the command line. Either one wins over its environment variable and
    /// is in place before the YAML file is located and merged.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("EXPLAINER_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        match config_file {
            Some(config_file) => config.config_file = Some(config_file),
            None => {
                if let Ok(config_file) = std::env::var("EXPLAINER_CONFIG") {
                    config.config_file = Some(PathBuf::from(config_file));
                }
            }
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match config.config_file.clone() {
            // An explicit file must exist
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let path = config.explainer_dir().join("config.yaml");
                if path.exists() {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("EXPLAINER_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("EXPLAINER_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("EXPLAINER_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(limits) = config_file.limits {
            result.limits = limits;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file. Workspace and config file are chosen earlier, in
    /// [`AppConfig::load_from`].
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .explainer directory.
    pub fn explainer_dir(&self) -> PathBuf {
        self.workspace.join(".explainer")
    }

    /// Ensure the .explainer directory exists.
    pub fn ensure_explainer_dir(&self) -> AppResult<()> {
        let dir = self.explainer_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .explainer directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve a configured path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Directory scanned for PDFs.
    pub fn documents_dir(&self) -> PathBuf {
        self.resolve_path(&self.rag.documents_dir)
    }

    /// Location of the persisted embedding store.
    pub fn store_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.store_path)
    }

    /// Location of the SQLite query log.
    pub fn log_db_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.log_db_path)
    }

    /// Get the configuration of a provider, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Environment variable holding the provider's API key, or `None` for
    /// providers that need no key.
    pub fn api_key_env(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::Claude { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider == "claude" => Some(DEFAULT_CLAUDE_KEY_ENV.to_string()),
            None => None,
        }
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: `EXPLAINER_API_KEY`, then the provider's `apiKeyEnv`
    /// (`ANTHROPIC_API_KEY` for Claude when none is configured).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env(provider)
            .and_then(|var| std::env::var(var).ok())
    }

    /// Resolve a custom endpoint for a provider.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Claude { endpoint, .. } => endpoint.clone(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.clone()),
        }
    }

    /// `anthropic-version` override for Claude.
    pub fn resolve_api_version(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Claude { api_version, .. } => api_version.clone(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Generation timeout in seconds; the provider's own setting wins.
    pub fn resolve_timeout(&self, provider: &str) -> u64 {
        let provider_timeout = match self.get_provider_config(provider) {
            Some(ProviderConfig::Claude { timeout, .. }) => *timeout,
            Some(ProviderConfig::Ollama { timeout, .. }) => *timeout,
            None => None,
        };
        provider_timeout.unwrap_or(self.rag.timeout_secs)
    }

    /// Admin password hash for the session rate limiter, if configured.
    pub fn admin_password_hash(&self) -> Option<String> {
        std::env::var(&self.limits.admin_password_hash_env).ok()
    }

    /// Validate retrieval settings.
    ///
    /// These are needed by every command, including the offline ones.
    pub fn validate_rag(&self) -> AppResult<()> {
        if self.rag.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_rag()?;

        let provider = self.provider.as_str();
        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(env_var) = self.api_key_env(provider) {
            if self.resolve_api_key(provider).is_none() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_var
                )));
            }
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Model name for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::Claude { model, .. } => model,
            Self::Ollama { model, .. } => model,
        }
    }
}
