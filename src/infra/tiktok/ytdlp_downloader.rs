// Video downloads through the yt-dlp executable.
//
// yt-dlp writes the media file and a `.info.json` sidecar into a fresh temp
// directory; both are read back and the directory is removed on drop.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::core::tiktok::{DownloadedVideo, TikTokError, VideoDownloader};

const RESTRICTED_MARKER: &str = "No video formats found";
const INFO_SUFFIX: &str = ".info.json";
/// Discord's default attachment limit.
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

pub struct YtDlpDownloader {
    program: String,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Option<Vec<serde_json::Value>>,
}

impl YtDlpDownloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Map a failed yt-dlp run to the matching error.
fn classify_failure(stderr: &str) -> TikTokError {
    if stderr.contains(RESTRICTED_MARKER) {
        TikTokError::Restricted
    } else {
        let last_line = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("yt-dlp exited with an error");
        TikTokError::Download(last_line.trim().to_string())
    }
}

/// Locate the media file and the info sidecar yt-dlp left in `dir`.
async fn collect_outputs(dir: &Path) -> Result<(PathBuf, PathBuf), TikTokError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| TikTokError::Download(e.to_string()))?;

    let mut media = None;
    let mut info = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TikTokError::Download(e.to_string()))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(INFO_SUFFIX) {
            info = Some(path);
        } else if !name.ends_with(".part") {
            media = Some(path);
        }
    }

    match (media, info) {
        (Some(media), Some(info)) => Ok((media, info)),
        (None, Some(_)) => Err(TikTokError::Restricted),
        _ => Err(TikTokError::Download(
            "yt-dlp finished without producing a file".to_string(),
        )),
    }
}

/// Refuse a file Discord would reject, before reading it into memory.
async fn ensure_uploadable(path: &Path, limit: u64) -> Result<(), TikTokError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| TikTokError::Download(e.to_string()))?
        .len();
    if size > limit {
        return Err(TikTokError::TooLarge(size));
    }
    Ok(())
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    async fn download(&self, url: &str) -> Result<DownloadedVideo, TikTokError> {
        let dir = tempfile::tempdir().map_err(|e| TikTokError::Download(e.to_string()))?;
        let template = dir.path().join("%(id)s.%(ext)s");

        let output = Command::new(&self.program)
            .arg("-f")
            .arg("best")
            .arg("--no-playlist")
            .arg("--write-info-json")
            .arg("-o")
            .arg(&template)
            .arg(url)
            .output()
            .await
            .map_err(|e| TikTokError::Download(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(url, status = %output.status, "yt-dlp failed");
            return Err(classify_failure(&stderr));
        }

        let (media_path, info_path) = collect_outputs(dir.path()).await?;

        let info_raw = tokio::fs::read(&info_path)
            .await
            .map_err(|e| TikTokError::Download(e.to_string()))?;
        let info: VideoInfo = serde_json::from_slice(&info_raw)
            .map_err(|e| TikTokError::Download(e.to_string()))?;
        if info.formats.is_none() {
            return Err(TikTokError::Restricted);
        }

        if let Err(e) = ensure_uploadable(&media_path, MAX_UPLOAD_BYTES).await {
            tracing::warn!(url, "Downloaded TikTok video is too large to upload");
            return Err(e);
        }

        let bytes = tokio::fs::read(&media_path)
            .await
            .map_err(|e| TikTokError::Download(e.to_string()))?;
        let filename = media_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());

        tracing::info!(url, filename = %filename, size = bytes.len(), "Downloaded TikTok video");

        Ok(DownloadedVideo {
            filename,
            bytes,
            title: info.title.unwrap_or_else(|| "video".to_string()),
            uploader: info.uploader.unwrap_or_else(|| "unknown".to_string()),
            duration_secs: info.duration,
        })
    }
}
