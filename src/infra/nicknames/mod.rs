pub mod sqlite_nickname_store;

pub use sqlite_nickname_store::SqliteNicknameStore;
