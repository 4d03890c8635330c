use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default API URL
pub const DEFAULT_API_URL: &str = "https://api.authlink.dev";

/// Environment variable name for API URL override
pub const ENV_API_URL: &str = "AUTHLINK_API";

/// Environment variable that turns off analytics query parameters
pub const ENV_DISABLE_ANALYTICS: &str = "AUTHLINK_DISABLE_ANALYTICS";

/// Environment variable naming the integration that invoked the CLI
pub const ENV_INTEGRATION_NAME: &str = "AUTHLINK_INTEGRATION_NAME";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    api: Option<ApiSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiSection {
    /// API endpoint URL (e.g., "https://api.your-instance.example.com")
    url: Option<String>,
    /// Skip utm/os query parameters on the login URL
    disable_analytics: Option<bool>,
}

/// Runtime endpoint configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    /// Base URL for API calls, without a trailing slash
    pub api_url: String,
    pub disable_analytics: bool,
    /// Reported as `utm_campaign` on the login URL
    pub integration_name: Option<String>,
    /// Source of the API URL (for logging)
    pub source: ConfigSource,
}

impl EndpointConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_url(&api_url.into()),
            disable_analytics: false,
            integration_name: None,
            source: ConfigSource::Default,
        }
    }

    /// `POST` target for the browser-login callback poll
    pub fn verify_callback_url(&self) -> String {
        format!("{}/verify/callback", self.api_url)
    }

    /// `POST` target for manual token verification
    pub fn verify_token_url(&self) -> String {
        format!("{}/verify/token", self.api_url)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("authlink").join("config.toml"))
}

/// Load configuration from a config file, if it exists and parses
pub fn load_config_file(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Values read from the process environment
#[derive(Debug, Clone, Default)]
pub struct ConfigEnv {
    pub api_url: Option<String>,
    pub disable_analytics: Option<String>,
    pub integration_name: Option<String>,
}

impl ConfigEnv {
    pub fn from_process() -> Self {
        Self {
            api_url: std::env::var(ENV_API_URL).ok(),
            disable_analytics: std::env::var(ENV_DISABLE_ANALYTICS).ok(),
            integration_name: std::env::var(ENV_INTEGRATION_NAME).ok(),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Merge environment and file settings with priority:
/// 1. Environment variable
/// 2. Config file
/// 3. Default values
pub fn resolve_endpoint_config(env: &ConfigEnv, file: Option<ConfigFile>) -> EndpointConfig {
    let section = file.and_then(|f| f.api).unwrap_or_default();

    let disable_analytics = match env.disable_analytics.as_deref() {
        Some(v) => is_truthy(v),
        None => section.disable_analytics.unwrap_or(false),
    };
    let integration_name = env
        .integration_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let env_url = env
        .api_url
        .as_deref()
        .map(normalize_url)
        .filter(|u| !u.is_empty());
    let file_url = section
        .url
        .as_deref()
        .map(normalize_url)
        .filter(|u| !u.is_empty());

    let (api_url, source) = if let Some(url) = env_url {
        tracing::info!("Using API URL from environment variable: {}", url);
        (url, ConfigSource::Environment)
    } else if let Some(url) = file_url {
        tracing::info!("Using API URL from config file: {}", url);
        (url, ConfigSource::ConfigFile)
    } else {
        tracing::debug!("Using default API URL: {}", DEFAULT_API_URL);
        (DEFAULT_API_URL.to_string(), ConfigSource::Default)
    };

    EndpointConfig {
        api_url,
        disable_analytics,
        integration_name,
        source,
    }
}

/// Load endpoint configuration from the environment and
/// `~/.config/authlink/config.toml`.
pub fn load_endpoint_config() -> EndpointConfig {
    let file = get_config_file_path().and_then(|p| load_config_file(&p));
    resolve_endpoint_config(&ConfigEnv::from_process(), file)
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/authlink/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# authlink configuration
# Place this file at: ~/.config/authlink/config.toml

[api]
# API endpoint URL for self-hosted instances
# Default: https://api.authlink.dev
# url = "https://api.your-instance.example.com"

# Leave utm/os query parameters off the login URL
# disable_analytics = true
"#
    .to_string()
}
