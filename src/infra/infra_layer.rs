// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "antiphishing/mod.rs"]
pub mod antiphishing;

#[path = "cloudflare/mod.rs"]
pub mod cloudflare;

#[path = "nicknames/mod.rs"]
pub mod nicknames;

#[path = "song_id/mod.rs"]
pub mod song_id;

#[path = "tiktok/mod.rs"]
pub mod tiktok;
