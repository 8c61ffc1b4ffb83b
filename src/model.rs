use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// The `<image>` block of a channel; doubles as the feed's display identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelImage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub url: String,
}

/// A dated post ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub published: DateTime<FixedOffset>,
    /// Shared by every entry parsed from the same feed
    pub image: Arc<ChannelImage>,
    pub link: String,
    /// Description with HTML entities decoded
    pub content: String,
    pub title: String,
}

impl Entry {
    /// Title on a single line, for the text digest.
    pub fn plain_title(&self) -> String {
        self.title.replace(['\n', '\r'], "")
    }
}
