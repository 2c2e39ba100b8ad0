pub mod cloudflare_client;
pub mod sqlite_autoscan_store;

pub use cloudflare_client::{CloudflareAuth, CloudflareHttpClient};
pub use sqlite_autoscan_store::SqliteAutoscanStore;
