use lorewise_engine::editing::Bias;
use lorewise_engine::suggest::{AnchorOptions, RemapOptions, SessionContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub suggestions: SuggestionConfig,
}

/// Connection to an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Reference materials are cut to this many characters each
    pub max_reference_chars: usize,
    pub temperature: f32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "LOREWISE_API_KEY".to_string(),
            timeout_secs: 60,
            max_reference_chars: 4000,
            temperature: 0.3,
        }
    }
}

/// How pending suggestions are anchored and carried through edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub start_bias: Bias,
    pub end_bias: Bias,
    pub point_bias: Bias,
    pub prefer_offset_hint: bool,
    pub history_limit: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        let remap = RemapOptions::default();
        Self {
            start_bias: remap.start_bias,
            end_bias: remap.end_bias,
            point_bias: remap.point_bias,
            prefer_offset_hint: AnchorOptions::default().prefer_offset_hint,
            history_limit: SessionContext::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SuggestionConfig {
    /// Build the context for a newly opened editor
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new()
            .with_remap(RemapOptions {
                start_bias: self.start_bias,
                end_bias: self.end_bias,
                point_bias: self.point_bias,
            })
            .with_anchor(AnchorOptions {
                prefer_offset_hint: self.prefer_offset_hint,
            })
            .with_history_limit(self.history_limit)
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Allow "$PROXY_URL/v1/chat/completions" style endpoints
        config.assistant.endpoint =
            Self::expand(&config.assistant.endpoint).unwrap_or(config.assistant.endpoint);

        Ok(Some(config))
    }

    /// Load the user's config, falling back to defaults when there is none
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        Ok(Self::load_from_path(&config_path)?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/lorewise");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn session_context(&self) -> SessionContext {
        self.suggestions.session_context()
    }

    fn expand(value: &str) -> Option<String> {
        shellexpand::full(value).ok().map(|expanded| expanded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/lorewise/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.suggestions.history_limit, 64);
        assert_eq!(config.suggestions.start_bias, Bias::After);
        assert_eq!(config.suggestions.end_bias, Bias::Before);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config_content = r#"
[assistant]
model = "local-llama"

[suggestions]
point_bias = "before"
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.assistant.model, "local-llama");
        assert_eq!(config.assistant.timeout_secs, 60);
        assert_eq!(config.suggestions.point_bias, Bias::Before);
        assert!(config.suggestions.prefer_offset_hint);
    }

    #[test]
    fn test_session_context_uses_suggestion_settings() {
        let config = Config {
            suggestions: SuggestionConfig {
                start_bias: Bias::Before,
                prefer_offset_hint: false,
                history_limit: 8,
                ..SuggestionConfig::default()
            },
            ..Config::default()
        };

        let ctx = config.session_context();

        assert_eq!(ctx.remap.start_bias, Bias::Before);
        assert_eq!(ctx.remap.end_bias, Bias::Before);
        assert!(!ctx.anchor.prefer_offset_hint);
        assert_eq!(ctx.history_limit, 8);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[assistant\nmodel = ").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.assistant.endpoint = "http://localhost:8080/v1/chat/completions".to_string();
        test_config.suggestions.history_limit = 16;

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_endpoint_with_env_var_is_expanded() {
        unsafe {
            env::set_var("LOREWISE_TEST_PROXY", "http://proxy.local:9000");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "[assistant]\nendpoint = \"$LOREWISE_TEST_PROXY/v1/chat/completions\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.assistant.endpoint,
            "http://proxy.local:9000/v1/chat/completions"
        );

        unsafe {
            env::remove_var("LOREWISE_TEST_PROXY");
        }
    }
}
