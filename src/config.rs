use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Overrides the username reported by getMe for command mentions
    #[serde(default)]
    pub bot_username: Option<String>,
    /// Receive updates through a webhook instead of long polling
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Public scheme and host, e.g. "https://bot.example.org"
    pub host: String,
    /// Path prefix; the bot token is appended to it
    #[serde(default = "default_webhook_root")]
    pub root: String,
    /// Local address the webhook server binds to
    pub listen: SocketAddr,
}

impl WebhookConfig {
    /// Full URL registered with Telegram: host + root + token.
    pub fn url(&self, token: &str) -> String {
        format!("{}{}{}", self.host.trim_end_matches('/'), self.root, token)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    None,
    Sqlite {
        #[serde(default = "default_db_path")]
        database_path: PathBuf,
    },
    Api {
        #[serde(default = "default_api_base_url")]
        base_url: String,
        #[serde(default = "default_api_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Api {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Events handled concurrently; 1 means strictly one at a time
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_webhook_root() -> String {
    "/".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("predb.db")
}

fn default_api_base_url() -> String {
    "https://predb.ovh/api/v1".to_string()
}

fn default_api_timeout_secs() -> u64 {
    5
}

fn default_workers() -> usize {
    1
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if config.dispatch.workers == 0 {
            anyhow::bail!("dispatch.workers must be at least 1");
        }
        if let BackendConfig::Api { timeout_secs: 0, .. } = config.backend {
            anyhow::bail!("backend.timeout_secs must be at least 1");
        }

        Ok(config)
    }
}
