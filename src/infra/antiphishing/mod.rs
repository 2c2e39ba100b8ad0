pub mod blocklist_client;
pub mod sqlite_phishing_store;

pub use blocklist_client::HttpBlocklistSource;
pub use sqlite_phishing_store::SqlitePhishingStore;
