// Song identification - recognize a track from an audio URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SongError {
    #[error("Recognition API error: {0}")]
    Api(String),

    #[error("Please provide a valid http(s) audio URL.")]
    InvalidUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMatch {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub song_link: Option<String>,
}

/// Something that can listen to an audio file and name the song.
#[async_trait]
pub trait SongRecognizer: Send + Sync {
    async fn recognize(&self, audio_url: &str) -> Result<Option<SongMatch>, SongError>;
}

pub struct SongService<R: SongRecognizer> {
    recognizer: R,
}

impl<R: SongRecognizer> SongService<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    pub async fn identify(&self, audio_url: &str) -> Result<Option<SongMatch>, SongError> {
        let audio_url = audio_url.trim();
        if !(audio_url.starts_with("http://") || audio_url.starts_with("https://")) {
            return Err(SongError::InvalidUrl);
        }
        let found = self.recognizer.recognize(audio_url).await?;
        tracing::debug!(audio_url, matched = found.is_some(), "Song recognition finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockRecognizer {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SongRecognizer for MockRecognizer {
        async fn recognize(&self, audio_url: &str) -> Result<Option<SongMatch>, SongError> {
            self.calls.lock().unwrap().push(audio_url.to_string());
            Ok(Some(SongMatch {
                title: "Blue Monday".to_string(),
                artist: "New Order".to_string(),
                album: None,
                release_date: None,
                song_link: None,
            }))
        }
    }

    #[tokio::test]
    async fn non_http_urls_are_rejected_without_a_call() {
        let service = SongService::new(MockRecognizer::default());
        assert!(matches!(
            service.identify("ftp://example.com/a.mp3").await,
            Err(SongError::InvalidUrl)
        ));
        assert!(service.recognizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recognizer_result_is_returned() {
        let service = SongService::new(MockRecognizer::default());
        let found = service
            .identify(" https://cdn.example.com/clip.mp3 ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.artist, "New Order");
        assert_eq!(
            service.recognizer.calls.lock().unwrap()[0],
            "https://cdn.example.com/clip.mp3"
        );
    }
}
