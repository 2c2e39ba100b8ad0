// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "antiphishing/mod.rs"]
pub mod antiphishing;

#[path = "cloudflare/mod.rs"]
pub mod cloudflare;

#[path = "nicknames/nickname_service.rs"]
pub mod nicknames;

#[path = "song_id/song_service.rs"]
pub mod song_id;

#[path = "status/status_rotator.rs"]
pub mod status;

#[path = "tiktok/mod.rs"]
pub mod tiktok;
