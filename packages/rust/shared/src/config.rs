//! Application configuration for ConceptLens.
//!
//! User config lives at `~/.conceptlens/conceptlens.toml`.
//! CLI flags override config file values, which override defaults.
//! The resolved config is passed explicitly to every component; nothing is
//! written into process-wide state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConceptLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "conceptlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".conceptlens";

// ---------------------------------------------------------------------------
// Config structs (matching conceptlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Pipeline fan-out and deadlines.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Optional prompt template overrides.
    #[serde(default)]
    pub prompts: PromptsConfig,
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Fallback JSON credentials file of the form `{"api_key": "..."}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Chat model used for every prompt.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on generated tokens per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            credentials_file: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl CompletionConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> Url {
    Url::parse("https://api.openai.com/v1").expect("static URL is valid")
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    200
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[completion.retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Cap on the exponentially growing delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8_000
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of concepts enriched at the same time.
    #[serde(default = "default_max_concurrent_concepts")]
    pub max_concurrent_concepts: usize,

    /// Deadline for a whole request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_concepts: default_max_concurrent_concepts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    /// Request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_max_concurrent_concepts() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8001".into()
}

/// `[prompts]` section: replaces built-in templates per purpose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonym: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_match: Option<String>,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A completion-service API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    api_key: String,
}

/// Resolve the API key: the configured env var first, then the credentials file.
pub fn resolve_api_key(config: &CompletionConfig) -> Result<ApiKey> {
    let var_name = &config.api_key_env;
    if let Ok(val) = std::env::var(var_name) {
        if !val.trim().is_empty() {
            return Ok(ApiKey::new(val.trim()));
        }
    }

    if let Some(path) = &config.credentials_file {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConceptLensError::io(path, e))?;
        let creds: CredentialsFile = serde_json::from_str(&content).map_err(|e| {
            ConceptLensError::config(format!(
                "failed to decode credentials file {}: {e}",
                path.display()
            ))
        })?;
        if creds.api_key.trim().is_empty() {
            return Err(ConceptLensError::config(format!(
                "credentials file {} has an empty api_key",
                path.display()
            )));
        }
        return Ok(ApiKey::new(creds.api_key.trim()));
    }

    Err(ConceptLensError::config(format!(
        "completion API key not found. Set the {var_name} environment variable \
         or point completion.credentials_file at a JSON file with an \"api_key\" field."
    )))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.conceptlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ConceptLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.conceptlens/conceptlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConceptLensError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ConceptLensError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ConceptLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ConceptLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConceptLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.completion.retry.max_attempts == 0 {
        return Err(ConceptLensError::config(
            "completion.retry.max_attempts must be at least 1",
        ));
    }
    if config.pipeline.max_concurrent_concepts == 0 {
        return Err(ConceptLensError::config(
            "pipeline.max_concurrent_concepts must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("bind_addr"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[completion]
model = "gpt-4o-mini"

[completion.retry]
max_attempts = 5

[prompts]
definition = "Define {concept} briefly."
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.max_tokens, 200);
        assert_eq!(config.completion.retry.max_attempts, 5);
        assert_eq!(config.completion.retry.initial_backoff_ms, 500);
        assert_eq!(config.pipeline.max_concurrent_concepts, 4);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8001");
        assert_eq!(
            config.prompts.definition.as_deref(),
            Some("Define {concept} briefly.")
        );
        assert!(config.prompts.synonym.is_none());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = std::env::temp_dir().join(format!("cl-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("conceptlens.toml");
        std::fs::write(&path, "[pipeline]\nmax_concurrent_concepts = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_concurrent_concepts"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_missing() {
        let mut config = CompletionConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api_key_env = "CL_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn api_key_from_credentials_file() {
        let dir = std::env::temp_dir().join(format!("cl-creds-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials_private.json");
        std::fs::write(&path, r#"{"api_key": "sk-test-123"}"#).unwrap();

        let config = CompletionConfig {
            api_key_env: "CL_TEST_NONEXISTENT_KEY_67890".into(),
            credentials_file: Some(path),
            ..Default::default()
        };
        let key = resolve_api_key(&config).expect("key from file");
        assert_eq!(key.expose(), "sk-test-123");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_credentials_file_is_config_error() {
        let dir = std::env::temp_dir().join(format!("cl-creds-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials_private.json");
        std::fs::write(&path, "not json").unwrap();

        let config = CompletionConfig {
            api_key_env: "CL_TEST_NONEXISTENT_KEY_24680".into(),
            credentials_file: Some(path),
            ..Default::default()
        };
        let err = resolve_api_key(&config).unwrap_err();
        assert!(matches!(err, ConceptLensError::Config { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
