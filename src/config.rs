use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Front-end every account feed is served from
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Appended after the account identifier
    #[serde(default = "default_feed_suffix")]
    pub feed_suffix: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accounts_path")]
    pub accounts_path: PathBuf,
    #[serde(default = "default_html_output")]
    pub html_output: PathBuf,
    #[serde(default = "default_text_output")]
    pub text_output: PathBuf,
}

fn default_base_url() -> String {
    "https://nitter.cz/".to_string()
}

fn default_feed_suffix() -> String {
    "/rss".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("FeedDigest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_accounts_path() -> PathBuf {
    PathBuf::from("accounts.txt")
}

fn default_html_output() -> PathBuf {
    PathBuf::from("output.html")
}

fn default_text_output() -> PathBuf {
    PathBuf::from("output.txt")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            feed_suffix: default_feed_suffix(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            accounts_path: default_accounts_path(),
            html_output: default_html_output(),
            text_output: default_text_output(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Could not read config file {}", path.display())),
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
