// This is the entry point of the BeeHive guard bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores, HTTP clients, yt-dlp)
// - `discord/` = Discord-specific adapters (commands, events, background senders)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Dispatch gateway events and spawn the background loops

#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::antiphishing::PhishingService;
use crate::core::cloudflare::{CloudflareScope, CloudflareService};
use crate::core::nicknames::NicknameService;
use crate::core::song_id::SongService;
use crate::core::tiktok::TikTokService;
use crate::discord::{Data, Error};
use crate::infra::antiphishing::{HttpBlocklistSource, SqlitePhishingStore};
use crate::infra::cloudflare::{CloudflareAuth, CloudflareHttpClient, SqliteAutoscanStore};
use crate::infra::nicknames::SqliteNicknameStore;
use crate::infra::song_id::AuddClient;
use crate::infra::tiktok::{SqliteTikTokStore, TikTokLiveClient, YtDlpDownloader};
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything read from the environment at startup.
struct Config {
    token: String,
    data_dir: String,
    cloudflare_auth: CloudflareAuth,
    cloudflare_scope: CloudflareScope,
    audd_token: Option<String>,
    ytdlp_path: String,
    blocklist_refresh: Duration,
    status_rotate: Duration,
    nickname_sweep: Duration,
    tiktok_poll: Duration,
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn interval_env(key: &str, default_secs: u64) -> anyhow::Result<Duration> {
    let secs = match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        None => default_secs,
    };
    Ok(Duration::from_secs(secs.max(1)))
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let token = optional_env("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        Ok(Self {
            token,
            data_dir: optional_env("DATA_DIR").unwrap_or_else(|| "data".to_string()),
            cloudflare_auth: CloudflareAuth {
                api_token: optional_env("CLOUDFLARE_API_TOKEN"),
                email: optional_env("CLOUDFLARE_EMAIL"),
                api_key: optional_env("CLOUDFLARE_API_KEY"),
            },
            cloudflare_scope: CloudflareScope {
                account_id: optional_env("CLOUDFLARE_ACCOUNT_ID"),
                zone_id: optional_env("CLOUDFLARE_ZONE_ID"),
            },
            audd_token: optional_env("AUDD_API_TOKEN"),
            ytdlp_path: optional_env("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            blocklist_refresh: interval_env("BLOCKLIST_REFRESH_SECS", 600)?,
            status_rotate: interval_env("STATUS_ROTATE_SECS", 60)?,
            nickname_sweep: interval_env("NICKNAME_SWEEP_SECS", 3600)?,
            tiktok_poll: interval_env("TIKTOK_POLL_SECS", 120)?,
        })
    }
}

/// Open the shared database and create every feature's tables.
async fn open_database(data_dir: &str) -> anyhow::Result<sqlx::SqlitePool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {data_dir}"))?;

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{data_dir}/beehive.db?mode=rwc"))
        .await
        .context("Failed to connect to the database")?;
    Ok(pool)
}

/// Build every service on top of one pool.
async fn build_data(config: &Config, pool: sqlx::SqlitePool) -> anyhow::Result<Data> {
    let phishing_store = SqlitePhishingStore::new(pool.clone());
    phishing_store.migrate().await?;
    let autoscan_store = SqliteAutoscanStore::new(pool.clone());
    autoscan_store.migrate().await?;
    let nickname_store = SqliteNicknameStore::new(pool.clone());
    nickname_store.migrate().await?;
    let tiktok_store = SqliteTikTokStore::new(pool);
    tiktok_store.migrate().await?;

    let phishing = PhishingService::new(phishing_store, HttpBlocklistSource::defaults()?);

    let cloudflare = CloudflareService::new(
        CloudflareHttpClient::new(config.cloudflare_auth.clone())?,
        autoscan_store,
        config.cloudflare_scope.clone(),
    );

    let song_id = SongService::new(AuddClient::new(config.audd_token.clone())?);

    let tiktok = TikTokService::new(
        tiktok_store,
        TikTokLiveClient::new()?,
        YtDlpDownloader::new(config.ytdlp_path.clone()),
    );

    Ok(Data {
        phishing: Arc::new(phishing),
        cloudflare: Arc::new(cloudflare),
        nicknames: Arc::new(NicknameService::new(nickname_store)),
        song_id: Arc::new(song_id),
        tiktok: Arc::new(tiktok),
        started_at: Instant::now(),
    })
}

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot || new_message.guild_id.is_none() {
                return Ok(());
            }

            if let Err(e) = discord::antiphishing::events::handle_message(ctx, new_message, data).await {
                tracing::error!("Error checking message for phishing: {}", e);
            }

            discord::cloudflare::urlscanner::spawn_autoscan(ctx, new_message, data);

            if let Err(e) = discord::tiktok::events::handle_message(ctx, new_message, data).await {
                tracing::warn!("Error auto-downloading TikTok: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberUpdate { event, .. } => {
            if let Err(e) = discord::nicknames::events::handle_member_update(ctx, event, data).await {
                tracing::warn!(guild_id = event.guild_id.get(), "Error auto-purifying nickname: {}", e);
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // `unavailable` means an outage, not a removal.
            if !incomplete.unavailable {
                if let Err(e) = data.tiktok.forget_guild(incomplete.id.get()).await {
                    tracing::warn!(guild_id = incomplete.id.get(), "Failed to forget guild: {}", e);
                }
            }
        }
        _ => {}
    }

    Ok(())
}

/// Start the background loops. Each one logs failures and keeps going.
fn spawn_background_tasks(ctx: &serenity::Context, data: &Data, config: &Config) {
    let phishing = Arc::clone(&data.phishing);
    let every = config.blocklist_refresh;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = phishing.refresh_blocklist().await {
                tracing::warn!("Block-list refresh failed: {}", e);
            }
        }
    });

    tokio::spawn(discord::status::run_rotation(
        ctx.clone(),
        Arc::clone(&data.phishing),
        data.started_at,
        config.status_rotate,
    ));

    let nicknames = Arc::clone(&data.nicknames);
    let http = ctx.http.clone();
    let every = config.nickname_sweep;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick fires immediately; skip it so startup isn't a full sweep.
        interval.tick().await;
        loop {
            interval.tick().await;
            discord::nicknames::events::sweep_auto_purify_guilds(&http, &nicknames).await;
        }
    });

    tokio::spawn(discord::tiktok::events::run_live_poller(
        ctx.http.clone(),
        Arc::clone(&data.tiktok),
        config.tiktok_poll,
    ));
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Invalid configuration");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = open_database(&config.data_dir)
        .await
        .expect("Failed to open the database");
    let data = build_data(&config, pool)
        .await
        .expect("Failed to initialize services");

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to scan message links
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let token = config.token.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands(),
            on_error: |error| Box::pin(discord::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected to Discord");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                spawn_background_tasks(ctx, &data, &config);
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
