// TikTok: video re-posting and live alerts.

use crate::core::tiktok::{split_hashtags, DownloadedVideo, LiveAlert, TikTokError};
use crate::discord::ui::{self, ERROR_COLOR, NEUTRAL_COLOR};
use poise::serenity_prelude as serenity;

pub mod commands;
pub mod events;

/// Embed, file and creator button for a downloaded video.
pub fn video_post(
    video: DownloadedVideo,
) -> (
    serenity::CreateEmbed,
    serenity::CreateAttachment,
    serenity::CreateActionRow,
) {
    let (title, hashtags) = split_hashtags(&video.title);
    let mut embed = serenity::CreateEmbed::new()
        .title("Here's that TikTok")
        .color(NEUTRAL_COLOR)
        .author(serenity::CreateEmbedAuthor::new(format!("@{}", video.uploader)).url(video.creator_url()));

    if !title.is_empty() {
        embed = embed.description(title);
    }
    if !hashtags.is_empty() {
        embed = embed.field("Hashtags", hashtags.join(" "), false);
    }
    if let Some(secs) = video.duration_secs {
        embed = embed.field("Length", format!("{:.0}s", secs), true);
    }

    let button = ui::link_button("Visit creator", video.creator_url());
    let file = serenity::CreateAttachment::bytes(video.bytes, video.filename);
    (embed, file, button)
}

/// Shown instead of a video when TikTok wants a login.
pub fn restricted_embed() -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("This TikTok is restricted")
        .description(TikTokError::Restricted.to_string())
        .color(ERROR_COLOR)
}

/// Live alert message for one guild.
pub fn live_alert_message(alert: &LiveAlert) -> serenity::CreateMessage {
    let embed = serenity::CreateEmbed::new()
        .title("A creator just went live")
        .description(format!("**@{}** is live on TikTok right now.", alert.creator))
        .url(alert.live_url())
        .color(NEUTRAL_COLOR)
        .timestamp(serenity::Timestamp::now());

    let mut message = serenity::CreateMessage::new()
        .embed(embed)
        .components(vec![ui::link_button("Watch now", alert.live_url())]);

    if let Some(role_id) = alert.role_id {
        message = message.content(format!("<@&{role_id}>")).allowed_mentions(
            serenity::CreateAllowedMentions::new().roles(vec![serenity::RoleId::new(role_id)]),
        );
    }
    message
}
