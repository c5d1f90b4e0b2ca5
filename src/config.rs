//! Layered configuration: built-in defaults, then `.ai-context/config.toml`,
//! then command-line flags and environment variables.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "codellama:7b-instruct-q4_0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    pub inference: InferenceConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 200,
            timeout_secs: 300,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Minimum gap between two accepted modified events
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 1000 }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Values given on the command line; `None` leaves the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl AssistantConfig {
    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)
                .map_err(|e| AssistantError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.inference.endpoint = endpoint;
        }
        if let Some(model) = overrides.model {
            self.inference.model = model;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.inference.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.inference.model, DEFAULT_MODEL);
        assert_eq!(config.inference.temperature, 0.1);
        assert_eq!(config.inference.top_p, 0.9);
        assert_eq!(config.inference.num_predict, 200);
        assert_eq!(config.watch.debounce(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AssistantConfig::parse(
            r#"
[inference]
model = "llama3:8b"
num_predict = 512
"#,
        )
        .unwrap();

        assert_eq!(config.inference.model, "llama3:8b");
        assert_eq!(config.inference.num_predict, 512);
        assert_eq!(config.inference.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.watch.debounce_ms, 1000);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(AssistantConfig::parse("[inference]\nmodle = \"x\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AssistantConfig::load(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AssistantConfig::default());
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[watch]\ndebounce_ms = \"soon\"\n").unwrap();

        let err = AssistantConfig::load(&path).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let config = AssistantConfig::default().with_overrides(ConfigOverrides {
            endpoint: Some("http://gpu-box:11434/api/generate".to_string()),
            model: None,
        });
        assert_eq!(config.inference.endpoint, "http://gpu-box:11434/api/generate");
        assert_eq!(config.inference.model, DEFAULT_MODEL);
    }
}
