use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub llm: LlmConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the history and user records.
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// oEmbed endpoint used to resolve title, author and thumbnail.
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Azure OpenAI resource endpoint.
    pub endpoint: String,
    /// API key (or set TUBESCRIBE_LLM_KEY environment variable).
    pub api_key: String,
    /// Chat completions deployment name (e.g. "gpt-4o").
    pub deployment: String,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Retries for 5xx responses and transient network errors.
    pub max_retries: u32,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Seconds a notification stays visible before it is dismissed.
    pub display_secs: u64,
}

// --- Default implementations ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_dir(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.youtube.com/oembed".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: "2024-06-01".to_string(),
            timeout_secs: 300,
            max_retries: 3,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { display_secs: 4 }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubescribe")
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("tubescribe.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/tubescribe/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("tubescribe").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Default location `init-config` writes to.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tubescribe").join("config.toml"))
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let storage_dir_str = default_storage_dir()
            .to_string_lossy()
            .replace('\\', "\\\\");

        format!(
r#"# tubescribe configuration

[storage]
# Directory where the history and signed-in user records are kept.
directory = "{storage_dir}"

[metadata]
# oEmbed endpoint used to look up a video's title, author and thumbnail.
# A failed lookup is not fatal: the job continues with placeholder metadata.
endpoint = "https://www.youtube.com/oembed"
# HTTP timeout for the lookup, in seconds.
timeout_secs = 15

[llm]
# Azure OpenAI endpoint used for transcript generation and segment refinement.
# endpoint = "https://your-resource.openai.azure.com"
# API key (or set TUBESCRIBE_LLM_KEY environment variable).
# api_key = ""
# Chat completions deployment name.
# deployment = "gpt-4o"
api_version = "2024-06-01"
# HTTP timeout per request, in seconds. Generating a long transcript can be slow.
timeout_secs = 300
# Retries for server errors and transient network failures (exponential backoff).
max_retries = 3

[notifications]
# Seconds a notification stays visible before it is dismissed.
display_secs = 4
"#,
            storage_dir = storage_dir_str
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.storage.directory.ends_with("tubescribe"));
        assert_eq!(config.metadata.endpoint, "https://www.youtube.com/oembed");
        assert_eq!(config.metadata.timeout_secs, 15);
        assert!(config.llm.endpoint.is_empty());
        assert_eq!(config.llm.api_version, "2024-06-01");
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.notifications.display_secs, 4);
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_str = r#"
            [llm]
            endpoint = "https://example.openai.azure.com"
            deployment = "gpt-4o"

            [notifications]
            display_secs = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.llm.deployment, "gpt-4o");
        assert_eq!(config.notifications.display_secs, 10);
        // Defaults still applied for unspecified fields
        assert_eq!(config.llm.timeout_secs, 300);
        assert_eq!(config.metadata.timeout_secs, 15);
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_str = r#"
            [storage]
            directory = "/tmp/tubescribe"

            [metadata]
            endpoint = "http://localhost:9000/oembed"
            timeout_secs = 3

            [llm]
            endpoint = "https://example.openai.azure.com"
            api_key = "test-key"
            deployment = "gpt-4o-mini"
            api_version = "2024-10-21"
            timeout_secs = 60
            max_retries = 0

            [notifications]
            display_secs = 2
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.directory, PathBuf::from("/tmp/tubescribe"));
        assert_eq!(config.metadata.endpoint, "http://localhost:9000/oembed");
        assert_eq!(config.metadata.timeout_secs, 3);
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.api_version, "2024-10-21");
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.notifications.display_secs, 2);
    }

    #[test]
    fn test_config_roundtrip_serialize() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.metadata.endpoint, config.metadata.endpoint);
        assert_eq!(parsed.llm.timeout_secs, config.llm.timeout_secs);
        assert_eq!(parsed.storage.directory, config.storage.directory);
    }

    #[test]
    fn test_load_nonexistent_path_errors() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_path_returns_resolved_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config_file = tmp.path().join("tubescribe.toml");
        std::fs::write(&config_file, "[notifications]\ndisplay_secs = 9\n").unwrap();

        let (config, resolved) = Config::load_with_path(Some(config_file.as_path())).unwrap();
        assert_eq!(config.notifications.display_secs, 9);
        assert_eq!(resolved, Some(config_file));
    }

    #[test]
    fn test_generate_default_commented_is_valid_toml() {
        let content = Config::generate_default_commented();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.metadata.timeout_secs, 15);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.notifications.display_secs, 4);
        assert!(content.contains("[storage]"));
        assert!(content.contains("[metadata]"));
        assert!(content.contains("[llm]"));
        assert!(content.contains("[notifications]"));
    }

    #[test]
    fn test_llm_config_debug_redacts_api_key() {
        let mut config = Config::default();
        config.llm.api_key = "super-secret-key-12345".to_string();
        config.llm.endpoint = "https://example.openai.azure.com".to_string();
        let debug_output = format!("{:?}", config);
        assert!(
            !debug_output.contains("super-secret-key-12345"),
            "Debug output should not contain the API key"
        );
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("https://example.openai.azure.com"));
    }
}
