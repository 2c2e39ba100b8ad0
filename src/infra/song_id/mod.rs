pub mod audd_client;

pub use audd_client::AuddClient;
