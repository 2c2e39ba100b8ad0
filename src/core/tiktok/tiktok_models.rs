// TikTok domain models and the small text helpers around them.

use serde::{Deserialize, Serialize};

const TIKTOK_URL_PREFIXES: [&str; 3] = [
    "https://www.tiktok.com/",
    "https://vt.tiktok.com/",
    "https://vm.tiktok.com/",
];

/// Per-guild TikTok configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TikTokSettings {
    /// Creator followed for live alerts (one per guild).
    pub tiktok_user: Option<String>,
    pub alert_channel_id: Option<u64>,
    pub alert_role_id: Option<u64>,
    /// Re-post TikTok links as uploaded videos.
    pub auto_download: bool,
}

/// A followed creator just went live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveAlert {
    pub guild_id: u64,
    pub creator: String,
    pub channel_id: u64,
    pub role_id: Option<u64>,
}

impl LiveAlert {
    pub fn live_url(&self) -> String {
        format!("https://www.tiktok.com/@{}/live", self.creator)
    }
}

/// A video fetched by the downloader, already read into memory.
#[derive(Debug, Clone)]
pub struct DownloadedVideo {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub title: String,
    pub uploader: String,
    pub duration_secs: Option<f64>,
}

impl DownloadedVideo {
    pub fn creator_url(&self) -> String {
        format!("https://www.tiktok.com/@{}", self.uploader)
    }
}

/// Canonical form of a creator handle: no `@`, lowercase.
pub fn normalize_handle(user: &str) -> Option<String> {
    let handle = user.trim().trim_start_matches('@').to_ascii_lowercase();
    let valid = !handle.is_empty()
        && handle.len() <= 24
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some(handle)
}

/// First full TikTok link in a message.
pub fn extract_tiktok_url(content: &str) -> Option<&str> {
    content
        .split_whitespace()
        .find(|word| TIKTOK_URL_PREFIXES.iter().any(|p| word.starts_with(p)))
}

/// Split a video title into its text and its `#hashtags`.
pub fn split_hashtags(title: &str) -> (String, Vec<String>) {
    let (tags, words): (Vec<&str>, Vec<&str>) =
        title.split_whitespace().partition(|word| word.starts_with('#'));
    (
        words.join(" "),
        tags.into_iter().map(str::to_string).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_normalized() {
        assert_eq!(normalize_handle(" @Some.Creator_1 "), Some("some.creator_1".to_string()));
        assert_eq!(normalize_handle("@"), None);
        assert_eq!(normalize_handle("bad handle"), None);
    }

    #[test]
    fn finds_first_tiktok_link() {
        let content = "lol https://example.com https://vm.tiktok.com/ZMabc/ and https://www.tiktok.com/@x/video/1";
        assert_eq!(extract_tiktok_url(content), Some("https://vm.tiktok.com/ZMabc/"));
        assert_eq!(extract_tiktok_url("tiktok.com/@x"), None);
    }

    #[test]
    fn hashtags_are_split_from_title() {
        let (title, tags) = split_hashtags("best dog ever #dog #fyp so cute");
        assert_eq!(title, "best dog ever so cute");
        assert_eq!(tags, vec!["#dog", "#fyp"]);
    }
}
