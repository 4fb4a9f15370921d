//! Configuration management.
//!
//! Settings come from a TOML file (see [`find_config_file`]) layered with
//! `LCA_SCOUT_*` environment variables, e.g. `LCA_SCOUT_WORKFLOW__YEARS=3`.

mod file_config;

pub use file_config::{default_config_path, find_config_file, ConfigFileError, LOCAL_CONFIG_FILE};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{DEFAULT_DEEP_RESEARCH_MODEL, OPENAI_API_BASE};
use crate::sources::{OPENALEX_API_BASE, SEMANTIC_API_BASE};
use crate::utils::{RetryConfig, DEFAULT_CHART_ENDPOINT};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "LCA_SCOUT";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    #[serde(default)]
    pub openalex: OpenAlexConfig,

    #[serde(default)]
    pub semantic_scholar: SemanticScholarConfig,

    /// Chart server settings
    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Workflow defaults, overridable per command
    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_semantic_scholar_key() -> Option<String> {
    env_var("SEMANTIC_SCHOLAR_API_KEY")
}

fn env_openai_key() -> Option<String> {
    env_var("OPENAI_API_KEY")
}

fn env_openalex_email() -> Option<String> {
    env_var("OPENALEX_EMAIL")
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default = "env_semantic_scholar_key")]
    pub semantic_scholar: Option<String>,

    /// OpenAI API key, required for Deep Research
    #[serde(default = "env_openai_key")]
    pub openai: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            semantic_scholar: env_semantic_scholar_key(),
            openai: env_openai_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAlexConfig {
    #[serde(default = "default_openalex_url")]
    pub base_url: String,

    /// Contact email for the polite pool
    #[serde(default = "env_openalex_email")]
    pub mailto: Option<String>,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: default_openalex_url(),
            mailto: env_openalex_email(),
        }
    }
}

fn default_openalex_url() -> String {
    OPENALEX_API_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticScholarConfig {
    /// Enrich the most cited papers through Semantic Scholar
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_semantic_url")]
    pub base_url: String,

    /// Client-side request rate; zero disables throttling
    #[serde(default = "default_semantic_rps")]
    pub requests_per_second: f32,
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_semantic_url(),
            requests_per_second: default_semantic_rps(),
        }
    }
}

fn default_semantic_url() -> String {
    SEMANTIC_API_BASE.to_string()
}

fn default_semantic_rps() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// MCP endpoint of the chart server
    #[serde(default = "default_chart_endpoint")]
    pub endpoint: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_chart_endpoint(),
        }
    }
}

fn default_chart_endpoint() -> String {
    DEFAULT_CHART_ENDPOINT.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_deep_research_model")]
    pub deep_research_model: String,

    /// `reasoning.effort` sent with each request; empty omits it
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_url(),
            deep_research_model: default_deep_research_model(),
            reasoning_effort: default_reasoning_effort(),
        }
    }
}

fn default_openai_url() -> String {
    OPENAI_API_BASE.to_string()
}

fn default_deep_research_model() -> String {
    DEFAULT_DEEP_RESEARCH_MODEL.to_string()
}

fn default_reasoning_effort() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Rolling window length in years
    #[serde(default = "default_years")]
    pub years: u32,

    #[serde(default = "default_max_records")]
    pub max_records: usize,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Most cited papers sent for enrichment
    #[serde(default = "default_enrich_limit")]
    pub enrich_limit: usize,

    /// Extra keywords appended to the profile defaults
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Where artefacts are written when no path is given
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            years: default_years(),
            max_records: default_max_records(),
            max_pages: default_max_pages(),
            enrich_limit: default_enrich_limit(),
            keywords: Vec::new(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_years() -> u32 {
    5
}

fn default_max_records() -> usize {
    300
}

fn default_max_pages() -> usize {
    10
}

fn default_enrich_limit() -> usize {
    15
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::default().max_attempts(self.max_attempts)
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `plain` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

fn default_true() -> bool {
    true
}

/// Invalid values found after loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid URL for {field}: {message}")]
    InvalidUrl { field: &'static str, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl Config {
    /// Check URLs and numeric bounds
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let urls = [
            ("openalex.base_url", &self.openalex.base_url),
            ("semantic_scholar.base_url", &self.semantic_scholar.base_url),
            ("chart.endpoint", &self.chart.endpoint),
            ("openai.base_url", &self.openai.base_url),
        ];
        for (field, value) in urls {
            let parsed = url::Url::parse(value).map_err(|e| ConfigValidationError::InvalidUrl {
                field,
                message: format!("{} ({})", value, e),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigValidationError::InvalidUrl {
                    field,
                    message: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }
        if self.workflow.max_records == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "workflow.max_records",
                message: "must be at least 1".to_string(),
            });
        }
        let rps = self.semantic_scholar.requests_per_second;
        if !rps.is_finite() || rps < 0.0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "semantic_scholar.requests_per_second",
                message: format!("expected a non-negative number, got {}", rps),
            });
        }
        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "plain" | "json") {
            return Err(ConfigValidationError::InvalidValue {
                field: "logging.format",
                message: format!("expected 'plain' or 'json', got '{}'", self.logging.format),
            });
        }
        Ok(())
    }
}

/// Load configuration from an optional file layered with environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}
