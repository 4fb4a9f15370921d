//! Configuration file support for lca-scout.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! semantic_scholar = "your-api-key"
//! openai = "sk-..."
//!
//! [openalex]
//! base_url = "https://api.openalex.org"
//! mailto = "you@example.org"
//!
//! [semantic_scholar]
//! enabled = true
//! requests_per_second = 1.0
//!
//! [chart]
//! enabled = true
//! endpoint = "http://127.0.0.1:1122/mcp"
//!
//! [openai]
//! deep_research_model = "o4-mini-deep-research"
//! reasoning_effort = "medium"
//!
//! [workflow]
//! years = 5
//! max_records = 300
//! keywords = ["circular economy"]
//! output_dir = "./output"
//!
//! [http]
//! timeout_secs = 20
//! max_attempts = 3
//!
//! [logging]
//! level = "info"
//! format = "plain"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "lca-scout.toml";

/// `<config dir>/lca-scout/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lca-scout").join("config.toml"))
}

/// First existing config file: `./lca-scout.toml`, then [`default_config_path`]
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

impl Config {
    /// Load configuration from a TOML file, without environment overrides
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }

    /// Defaults with secrets stripped, suitable for `config init`
    pub fn template() -> Self {
        let mut config = Self::default();
        config.api_keys.semantic_scholar = None;
        config.api_keys.openai = None;
        config.openalex.mailto = None;
        config
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[api_keys]
semantic_scholar = "test-key"
openai = "sk-test"

[semantic_scholar]
requests_per_second = 0.5

[workflow]
years = 10
max_records = 50

[http]
max_attempts = 1
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = Config::from_toml_file(&path).unwrap();

        assert_eq!(config.api_keys.semantic_scholar, Some("test-key".to_string()));
        assert_eq!(config.api_keys.openai, Some("sk-test".to_string()));
        assert_eq!(config.semantic_scholar.requests_per_second, 0.5);
        assert_eq!(config.workflow.years, 10);
        assert_eq!(config.workflow.max_records, 50);
        assert_eq!(config.http.retry().max_attempts, 1);
        assert_eq!(config.chart.endpoint, "http://127.0.0.1:1122/mcp");
    }

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::template();
        config.workflow.keywords = vec!["circular economy".to_string()];
        config.chart.enabled = false;
        config.save(&path).unwrap();

        let loaded = Config::from_toml_file(&path).unwrap();
        assert_eq!(loaded.workflow.keywords, vec!["circular economy"]);
        assert!(!loaded.chart.enabled);
        assert_eq!(loaded.openai.deep_research_model, config.openai.deep_research_model);
    }

    #[test]
    fn test_template_has_no_secrets() {
        let rendered = Config::template().to_toml().unwrap();
        assert!(!rendered.contains("semantic_scholar = "));
        assert!(!rendered.contains("openai = "));
        assert!(rendered.contains("[workflow]"));
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = Config::from_toml_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigFileError::Io(_))));
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        let result = Config::from_toml_file(&path);
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("lca-scout/config.toml"));
        }
    }
}
