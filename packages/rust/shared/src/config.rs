//! Application configuration for larkdoc.
//!
//! Endpoint settings live at `~/.larkdoc/larkdoc.toml`; a missing file means
//! defaults. Credentials never touch the file: they come from the process
//! environment and default to empty strings when unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LarkDocError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "larkdoc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".larkdoc";

/// Environment variables read at start-up. The second entry is a fallback.
const ENV_APP_ID: [&str; 2] = ["APP_ID", "LARK_APP_ID"];
const ENV_APP_SECRET: [&str; 2] = ["APP_SECRET", "LARK_APP_SECRET"];
const ENV_ARK_API_KEY: &str = "ARK_API_KEY";
const ENV_ARK_MODEL: &str = "ARK_MODEL";

// ---------------------------------------------------------------------------
// Config structs (matching larkdoc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config. Built once at start-up, read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Lark open-platform endpoints.
    #[serde(default)]
    pub lark: LarkConfig,

    /// Ark chat-completion settings.
    #[serde(default)]
    pub ark: ArkConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Secrets from the environment; never serialized.
    #[serde(skip)]
    pub credentials: Credentials,
}

/// `[lark]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LarkConfig {
    /// Base for the tenant token issuance endpoint.
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,

    /// Base for the wiki and docx endpoints.
    #[serde(default = "default_open_api_base_url")]
    pub open_api_base_url: String,
}

impl Default for LarkConfig {
    fn default() -> Self {
        Self {
            auth_base_url: default_auth_base_url(),
            open_api_base_url: default_open_api_base_url(),
        }
    }
}

fn default_auth_base_url() -> String {
    "https://fsopen.bytedance.net/open-apis".into()
}
fn default_open_api_base_url() -> String {
    "https://open.larkoffice.com/open-apis".into()
}

/// `[ark]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArkConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_ark_base_url")]
    pub base_url: String,

    /// Model (endpoint) id. `ARK_MODEL` overrides this when set.
    #[serde(default)]
    pub model: String,
}

impl Default for ArkConfig {
    fn default() -> Self {
        Self {
            base_url: default_ark_base_url(),
            model: String::new(),
        }
    }
}

fn default_ark_base_url() -> String {
    "https://ark-cn-beijing.bytedance.net/api/v3".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout applied to every outbound call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Static application identity and model API key.
///
/// Empty values are accepted as-is; they surface later as upstream failures.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(v: &str) -> &'static str {
            if v.is_empty() { "<unset>" } else { "<set>" }
        }
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &mask(&self.app_secret))
            .field("api_key", &mask(&self.api_key))
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.is_empty()))
                .unwrap_or_default()
        };
        Self {
            app_id: first(&ENV_APP_ID[..]),
            app_secret: first(&ENV_APP_SECRET[..]),
            api_key: first(&[ENV_ARK_API_KEY][..]),
        }
    }
}

impl AppConfig {
    /// Fill credentials and the model override from the process environment.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::with_env`] with an explicit lookup function.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup(ENV_ARK_MODEL).filter(|m| !m.is_empty()) {
            self.ark.model = model;
        }
        self.credentials = Credentials::from_lookup(lookup);
        self
    }

    /// Check that every endpoint base is an absolute URL and the timeout is usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lark.auth_base_url", &self.lark.auth_base_url),
            ("lark.open_api_base_url", &self.lark.open_api_base_url),
            ("ark.base_url", &self.ark.base_url),
        ] {
            Url::parse(value)
                .map_err(|e| LarkDocError::config(format!("{name} '{value}' is not a URL: {e}")))?;
        }
        if self.http.timeout_secs == 0 {
            return Err(LarkDocError::config("http.timeout_secs must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.larkdoc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| LarkDocError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.larkdoc/larkdoc.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LarkDocError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| LarkDocError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LarkDocError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LarkDocError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LarkDocError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_serializes_without_secrets() {
        let config = AppConfig::default().with_lookup(lookup_from(&[("ARK_API_KEY", "sk-1")]));
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("open_api_base_url"));
        assert!(toml_str.contains("timeout_secs"));
        assert!(!toml_str.contains("sk-1"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[ark]
base_url = "http://127.0.0.1:9000/api/v3"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ark.base_url, "http://127.0.0.1:9000/api/v3");
        assert_eq!(config.lark.auth_base_url, "https://fsopen.bytedance.net/open-apis");
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn credentials_default_to_empty() {
        let creds = Credentials::from_lookup(lookup_from(&[]));
        assert_eq!(creds, Credentials::default());
        assert!(creds.app_id.is_empty());
    }

    #[test]
    fn credentials_prefer_primary_then_fallback() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("APP_ID", "cli_primary"),
            ("LARK_APP_ID", "cli_fallback"),
            ("LARK_APP_SECRET", "s3cret"),
            ("ARK_API_KEY", "ark-key"),
        ]));
        assert_eq!(creds.app_id, "cli_primary");
        assert_eq!(creds.app_secret, "s3cret");
        assert_eq!(creds.api_key, "ark-key");

        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("ark-key"));
    }

    #[test]
    fn model_env_overrides_file_value() {
        let mut config = AppConfig::default();
        config.ark.model = "ep-from-file".into();

        let kept = config.clone().with_lookup(lookup_from(&[]));
        assert_eq!(kept.ark.model, "ep-from-file");

        let overridden = config.with_lookup(lookup_from(&[("ARK_MODEL", "ep-from-env")]));
        assert_eq!(overridden.ark.model, "ep-from-env");
    }

    #[test]
    fn validate_rejects_bad_urls_and_zero_timeout() {
        let mut config = AppConfig::default();
        config.lark.open_api_base_url = "not a url".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lark.open_api_base_url"));

        let mut config = AppConfig::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
