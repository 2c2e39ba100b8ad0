// TikTok listeners: link auto-download and the live alert poller.

use super::{live_alert_message, restricted_embed, video_post};
use crate::core::tiktok::{extract_tiktok_url, TikTokError};
use crate::discord::{Data, Error, TikTok};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Re-post the first TikTok link in a message as a video, then remove the original.
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let Some(url) = extract_tiktok_url(&msg.content) else {
        return Ok(());
    };
    if !data.tiktok.settings(guild_id.get()).await?.auto_download {
        return Ok(());
    }

    tracing::debug!(guild_id = guild_id.get(), url, "Auto-downloading TikTok");
    // Restricted notices reply to the original, so it stays.
    let (message, keep_original) = match data.tiktok.download(url).await {
        Ok(video) => {
            let (embed, file, button) = video_post(video);
            let message = serenity::CreateMessage::new()
                .content(format!("Shared by <@{}>", msg.author.id))
                .allowed_mentions(serenity::CreateAllowedMentions::new())
                .embed(embed)
                .add_file(file)
                .components(vec![button]);
            (message, false)
        }
        Err(TikTokError::Restricted) => {
            let message = serenity::CreateMessage::new()
                .embed(restricted_embed())
                .reference_message(msg);
            (message, true)
        }
        Err(e) => return Err(e.into()),
    };

    msg.channel_id.send_message(&ctx.http, message).await?;
    if !keep_original {
        msg.delete(&ctx.http).await?;
    }
    Ok(())
}

/// Post alerts for every creator that went live since the last poll.
pub async fn send_live_alerts(http: &serenity::Http, tiktok: &TikTok) {
    let alerts = match tiktok.poll_live().await {
        Ok(alerts) => alerts,
        Err(e) => {
            tracing::warn!("TikTok live poll failed: {}", e);
            return;
        }
    };

    for alert in alerts {
        if let Err(e) = serenity::ChannelId::new(alert.channel_id)
            .send_message(http, live_alert_message(&alert))
            .await
        {
            tracing::warn!(
                guild_id = alert.guild_id,
                channel_id = alert.channel_id,
                creator = %alert.creator,
                "Failed to send live alert: {}",
                e
            );
        }
    }
}

/// Poll live status forever.
pub async fn run_live_poller(http: Arc<serenity::Http>, tiktok: Arc<TikTok>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        send_live_alerts(&http, &tiktok).await;
    }
}
