// `/tiktoklive` and `/tiktokliveset`.

use super::{restricted_embed, video_post};
use crate::core::tiktok::{TikTokError, TikTokSettings};
use crate::discord::ui::{self, NEUTRAL_COLOR};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn settings_embed(settings: &TikTokSettings) -> serenity::CreateEmbed {
    let user = settings
        .tiktok_user
        .as_deref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "Not set".to_string());
    let channel = settings
        .alert_channel_id
        .map(|id| format!("<#{id}>"))
        .unwrap_or_else(|| "Not set".to_string());
    let role = settings
        .alert_role_id
        .map(|id| format!("<@&{id}>"))
        .unwrap_or_else(|| "Not set".to_string());

    serenity::CreateEmbed::new()
        .title("TikTok settings")
        .color(NEUTRAL_COLOR)
        .field("Followed creator", user, true)
        .field("Alert channel", channel, true)
        .field("Alert role", role, true)
        .field(
            "Auto-download",
            if settings.auto_download { "On" } else { "Off" },
            true,
        )
}

/// TikTok tools.
#[poise::command(slash_command, subcommands("download"))]
pub async fn tiktoklive(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Download a TikTok and post it here.
#[poise::command(slash_command)]
pub async fn download(
    ctx: Context<'_>,
    #[description = "Link to the TikTok"] url: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    match ctx.data().tiktok.download(&url).await {
        Ok(video) => {
            let (embed, file, button) = video_post(video);
            ctx.send(
                poise::CreateReply::default()
                    .embed(embed)
                    .attachment(file)
                    .components(vec![button]),
            )
            .await?;
            Ok(())
        }
        Err(TikTokError::Restricted) => ui::send_embed(ctx, restricted_embed()).await,
        Err(e) => Err(e.into()),
    }
}

/// Configure TikTok alerts for this server.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "remove", "channel", "role", "settings", "auto")
)]
pub async fn tiktokliveset(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Follow a creator for live alerts.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "TikTok username"] user: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    match ctx.data().tiktok.follow(guild_id, &user).await {
        Ok(handle) => {
            tracing::info!(guild_id, creator = %handle, "Following TikTok creator");
            ui::send_embed(
                ctx,
                ui::success_embed(
                    "Creator followed",
                    format!("You'll be alerted when **@{handle}** goes live."),
                ),
            )
            .await
        }
        Err(e @ (TikTokError::AlreadyFollowing(_) | TikTokError::InvalidUser(_))) => {
            ui::send_error(ctx, "Couldn't follow", e.to_string()).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Stop following a creator.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "TikTok username"] user: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    match ctx.data().tiktok.unfollow(guild_id, &user).await {
        Ok(handle) => {
            ui::send_embed(
                ctx,
                ui::success_embed(
                    "Creator removed",
                    format!("No more alerts for **@{handle}**."),
                ),
            )
            .await
        }
        Err(e @ (TikTokError::NotFollowing(_) | TikTokError::InvalidUser(_))) => {
            ui::send_error(ctx, "Couldn't remove", e.to_string()).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Set the channel live alerts are posted in.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Alert channel"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    ctx.data()
        .tiktok
        .set_channel(guild_id, channel.id.get())
        .await?;

    ui::send_embed(
        ctx,
        ui::success_embed(
            "Settings changed",
            format!("Live alerts will be posted in <#{}>.", channel.id),
        ),
    )
    .await
}

/// Set the role mentioned in live alerts.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn role(
    ctx: Context<'_>,
    #[description = "Role to mention"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    ctx.data().tiktok.set_role(guild_id, role.id.get()).await?;

    ui::send_embed(
        ctx,
        ui::success_embed(
            "Settings changed",
            format!("<@&{}> will be mentioned in live alerts.", role.id),
        ),
    )
    .await
}

/// Show this server's TikTok settings.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let settings = ctx.data().tiktok.settings(guild_id).await?;
    ui::send_embed(ctx, settings_embed(&settings)).await
}

/// Toggle automatic re-posting of TikTok links.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn auto(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let enabled = ctx.data().tiktok.toggle_auto_download(guild_id).await?;
    tracing::info!(guild_id, enabled, "TikTok auto-download toggled");

    let description = if enabled {
        "TikTok links posted here will now be downloaded and re-posted."
    } else {
        "Automatic TikTok downloads are now **disabled**."
    };
    ui::send_embed(ctx, ui::success_embed("Settings changed", description)).await
}
