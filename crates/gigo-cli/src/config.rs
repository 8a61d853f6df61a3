//! Configuration for the `gigo` CLI.
//!
//! Provides the [`GigoConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `GIGO_CONFIG` environment variable
//! 3. XDG default: `~/.config/gigo/config.toml`
//! 4. Built-in defaults
//!
//! `GIGO_<SECTION>_<KEY>` environment variables overlay string-valued keys.

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use gigo_core::util::paths::expand_path;
use gigo_core::{Error, Result};
use gigo_retrieval::RetrievalConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GIGO_CONFIG";

const ENV_PREFIX: &str = "GIGO";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the `gigo` CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GigoConfig {
    /// Retrieval settings.
    pub retrieval: RetrievalConfig,

    /// Vector search service.
    pub qdrant: QdrantConfig,

    /// Query embedding backends.
    pub embeddings: EmbeddingsConfig,

    /// Chat-completion backend.
    pub llm: LlmConfig,

    /// Reference resolution.
    pub references: ReferencesConfig,
}

/// Vector search service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Base URL of the Qdrant HTTP API.
    pub url: String,

    /// API key, if the service requires one.
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Query embedding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Local dense model (requires the `fastembed` feature).
    pub dense_model: String,

    /// Local sparse model (requires the `fastembed` feature).
    pub sparse_model: Option<String>,

    /// Model cache directory.
    pub cache_path: Option<String>,

    /// Small-resolution model name.
    pub small_model: String,

    /// Small-resolution dimensions.
    pub small_dimensions: usize,

    /// Large-resolution model name.
    pub large_model: String,

    /// Large-resolution dimensions.
    pub large_dimensions: usize,

    /// OpenAI API key; falls back to `OPENAI_API_KEY`.
    pub openai_api_key: Option<String>,

    /// When set, a deterministic mock of this dimension serves every kind no
    /// other backend covers. Intended for offline runs.
    pub mock_dimension: Option<usize>,
}

/// Chat-completion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier.
    pub model: String,

    /// API key; falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,

    /// Override of the API base URL.
    pub base_url: Option<String>,

    /// Answer generation budget.
    pub max_tokens: u32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Decompose questions before retrieval.
    pub decompose: bool,

    /// Upper bound on sub-questions.
    pub max_sub_questions: usize,

    /// JSON file holding the document outline used for decomposition.
    pub outline_path: Option<String>,
}

/// Reference resolution configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencesConfig {
    /// Directory holding per-page rendered tables and images.
    pub scratch_path: Option<String>,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            dense_model: "bge-small-en-v1.5".to_string(),
            sparse_model: Some("splade-pp-en-v1".to_string()),
            cache_path: None,
            small_model: "text-embedding-3-small".to_string(),
            small_dimensions: 128,
            large_model: "text-embedding-3-large".to_string(),
            large_dimensions: 1024,
            openai_api_key: None,
            mock_dimension: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: gigo_service::llm::DEFAULT_CLAUDE_MODEL.to_string(),
            api_key: None,
            base_url: None,
            max_tokens: gigo_service::answer::DEFAULT_ANSWER_MAX_TOKENS,
            timeout_secs: 120,
            decompose: true,
            max_sub_questions: gigo_service::decompose::DEFAULT_MAX_SUB_QUESTIONS,
            outline_path: None,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl GigoConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
        for section in ["retrieval", "qdrant", "embeddings", "llm", "references"] {
            env_opts.add_section(section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(expand_path(path));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(expand_path(&path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gigo").join("config.toml"))
    }

    /// Scratch directory for file correlation, defaulting to `./scratch`.
    pub fn scratch_path(&self) -> PathBuf {
        self.references
            .scratch_path
            .as_deref()
            .map_or_else(|| PathBuf::from("scratch"), expand_path)
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `GIGO_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, ENV_PREFIX, &mut vars);
        Ok(vars)
    }
}

/// First non-empty value of an optional config entry or an environment variable.
pub fn secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Helper: flatten TOML to env vars
// ============================================================================

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
