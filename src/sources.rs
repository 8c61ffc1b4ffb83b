use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum SourceListError {
    #[error("Could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One account feed to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    account: String,
    url: String,
}

impl FeedSource {
    pub fn new(base_url: &str, account: &str, suffix: &str) -> Self {
        Self {
            account: account.to_string(),
            url: format!("{}{}{}", base_url, account, suffix),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Builds one source per account identifier. Blank lines and `#` comments are skipped.
pub fn sources_from_str(content: &str, config: &Config) -> Vec<FeedSource> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|account| FeedSource::new(&config.base_url, account, &config.feed_suffix))
        .collect()
}

pub fn load_sources<P: AsRef<Path>>(
    path: P,
    config: &Config,
) -> Result<Vec<FeedSource>, SourceListError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SourceListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sources_from_str(&content, config))
}
