// Discord layer - commands, event handlers and background senders.
//
// Everything in here translates between Discord types and the core services.
// Policy decisions stay in `core`.

use crate::core::antiphishing::PhishingService;
use crate::core::cloudflare::CloudflareService;
use crate::core::nicknames::NicknameService;
use crate::core::song_id::SongService;
use crate::core::tiktok::TikTokService;
use crate::infra::antiphishing::SqlitePhishingStore;
use crate::infra::cloudflare::{CloudflareHttpClient, SqliteAutoscanStore};
use crate::infra::nicknames::SqliteNicknameStore;
use crate::infra::song_id::AuddClient;
use crate::infra::tiktok::{SqliteTikTokStore, TikTokLiveClient, YtDlpDownloader};
use std::sync::Arc;
use std::time::Instant;

pub mod ui;

#[path = "antiphishing/mod.rs"]
pub mod antiphishing;

#[path = "cloudflare/mod.rs"]
pub mod cloudflare;

#[path = "nicknames/mod.rs"]
pub mod nicknames;

#[path = "song_id/identify.rs"]
pub mod song_id;

#[path = "status/presence.rs"]
pub mod status;

#[path = "tiktok/mod.rs"]
pub mod tiktok;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type PhishingGuard = PhishingService<SqlitePhishingStore>;
pub type Cloudflare = CloudflareService<CloudflareHttpClient, SqliteAutoscanStore>;
pub type Nicknames = NicknameService<SqliteNicknameStore>;
pub type SongId = SongService<AuddClient>;
pub type TikTok = TikTokService<SqliteTikTokStore, TikTokLiveClient, YtDlpDownloader>;

/// Data that's shared across all commands, events and background loops.
pub struct Data {
    pub phishing: Arc<PhishingGuard>,
    pub cloudflare: Arc<Cloudflare>,
    pub nicknames: Arc<Nicknames>,
    pub song_id: Arc<SongId>,
    pub tiktok: Arc<TikTok>,
    pub started_at: Instant,
}

/// Every slash and context-menu command the bot registers.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        antiphishing::commands::checkphish(),
        antiphishing::commands::check_message_for_phishing(),
        antiphishing::commands::antiphishing(),
        cloudflare::images::images(),
        cloudflare::zones::zones(),
        cloudflare::zones::dnssec(),
        cloudflare::zones::botmanagement(),
        cloudflare::zones::loadbalancing(),
        cloudflare::intel::intel(),
        cloudflare::urlscanner::urlscanner(),
        cloudflare::email_routing::emailrouting(),
        cloudflare::hyperdrive::hyperdrive(),
        cloudflare::r2::r2(),
        nicknames::commands::nickname(),
        song_id::identify(),
        tiktok::commands::tiktoklive(),
        tiktok::commands::tiktokliveset(),
    ]
}

/// Render command failures as red embeds instead of poise's plain text.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::warn!(command = %ctx.command().qualified_name, error = %error, "Command failed");
            let reply = poise::CreateReply::default()
                .embed(ui::error_embed("Error", error.to_string()))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::error!("Failed to send error embed: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}
