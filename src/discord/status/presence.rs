// Bot presence. Samples the cache and rotates the status line.

use crate::core::status::{StatusKind, StatusLine, StatusRotator, StatusSnapshot};
use crate::discord::PhishingGuard;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn activity(line: StatusLine) -> serenity::ActivityData {
    match line.kind {
        StatusKind::Watching => serenity::ActivityData::watching(line.text),
        StatusKind::Playing => serenity::ActivityData::playing(line.text),
    }
}

/// Current numbers for the status rotation.
pub async fn snapshot(
    ctx: &serenity::Context,
    phishing: &PhishingGuard,
    started_at: Instant,
) -> StatusSnapshot {
    let guild_ids = ctx.cache.guilds();
    let users = guild_ids
        .iter()
        .filter_map(|id| ctx.cache.guild(*id).map(|g| g.member_count as usize))
        .sum();

    StatusSnapshot {
        servers: guild_ids.len(),
        users,
        uptime: started_at.elapsed(),
        blocked_domains: phishing.blocklist_size().await,
    }
}

/// Rotate the presence forever, one step every `every`.
pub async fn run_rotation(
    ctx: serenity::Context,
    phishing: Arc<PhishingGuard>,
    started_at: Instant,
    every: Duration,
) {
    let mut rotator = StatusRotator::new();
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let line = rotator.next_status(&snapshot(&ctx, &phishing, started_at).await);
        tracing::debug!(status = %line.text, "Rotating presence");
        ctx.set_presence(Some(activity(line)), serenity::OnlineStatus::Online);
    }
}
