pub mod sqlite_tiktok_store;
pub mod tiktok_live_client;
pub mod ytdlp_downloader;

pub use sqlite_tiktok_store::SqliteTikTokStore;
pub use tiktok_live_client::TikTokLiveClient;
pub use ytdlp_downloader::YtDlpDownloader;
