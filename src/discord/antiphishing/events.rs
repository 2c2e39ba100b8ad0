// Discord-side phishing enforcement - turns a core verdict into a warning,
// a delete, a kick or a ban, then logs the case.

use crate::core::antiphishing::{PhishingAction, PhishingVerdict};
use crate::discord::ui::{ERROR_COLOR, WARNING_COLOR};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

const WARNING_TEXT: &str = "This message contains a malicious website or URL.\n\n\
    This URL could be anything from a fraudulent online seller, to an IP logger, to a page \
    delivering malware intended to steal Discord accounts.\n\n\
    **Don't click any links in this message, and notify server moderators ASAP**";

/// Check a guild message for block-listed links and enforce the guild policy.
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

    let Some(verdict) = data
        .phishing
        .check_message(guild_id.get(), msg.author.id.get(), &msg.content)
        .await?
    else {
        return Ok(());
    };

    let settings = data.phishing.settings(guild_id.get()).await?;

    if !enforce(ctx, msg, guild_id, &verdict, settings.mod_role_id).await? {
        return Ok(());
    }

    data.phishing
        .record_enforcement(guild_id.get(), verdict.action)
        .await?;

    if let Some(log_channel) = settings.log_channel_id {
        let embed = case_embed(msg, &verdict);
        if let Err(e) = serenity::ChannelId::new(log_channel)
            .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(guild_id = guild_id.get(), channel_id = log_channel, "Failed to post phishing case: {}", e);
        }
    }

    Ok(())
}

/// Apply the verdict. Returns `false` when the action was skipped.
async fn enforce(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    guild_id: serenity::GuildId,
    verdict: &PhishingVerdict,
    mod_role_id: Option<u64>,
) -> Result<bool, Error> {
    let reason = format!("Sent a malicious URL {} in the server", verdict.domain);

    match verdict.action {
        PhishingAction::Ignore => Ok(false),
        PhishingAction::Notify => {
            if let Some(role_id) = mod_role_id {
                msg.channel_id
                    .send_message(
                        &ctx.http,
                        serenity::CreateMessage::new()
                            .content(format!("<@&{role_id}>"))
                            .allowed_mentions(
                                serenity::CreateAllowedMentions::new()
                                    .roles(vec![serenity::RoleId::new(role_id)]),
                            ),
                    )
                    .await?;
            }

            let embed = serenity::CreateEmbed::new()
                .title("Dangerous link detected!")
                .description(WARNING_TEXT)
                .color(ERROR_COLOR)
                .footer(serenity::CreateEmbedFooter::new(
                    "Link scanning powered by BeeHive",
                ))
                .timestamp(serenity::Timestamp::now());
            msg.channel_id
                .send_message(
                    &ctx.http,
                    serenity::CreateMessage::new()
                        .embed(embed)
                        .reference_message(msg),
                )
                .await?;
            Ok(true)
        }
        PhishingAction::Delete => {
            msg.delete(&ctx.http).await?;
            Ok(true)
        }
        PhishingAction::Kick | PhishingAction::Ban => {
            if let Err(e) = msg.delete(&ctx.http).await {
                tracing::warn!(guild_id = guild_id.get(), "Failed to delete phishing message: {}", e);
            }

            if is_protected(ctx, guild_id, msg.author.id) {
                tracing::info!(
                    guild_id = guild_id.get(),
                    user_id = msg.author.id.get(),
                    action = %verdict.action,
                    "Member outranks the bot, skipping removal"
                );
                return Ok(false);
            }

            if verdict.action == PhishingAction::Kick {
                guild_id
                    .kick_with_reason(&ctx.http, msg.author.id, &reason)
                    .await?;
            } else {
                guild_id
                    .ban_with_reason(&ctx.http, msg.author.id, 0, &reason)
                    .await?;
            }
            Ok(true)
        }
    }
}

/// The owner and anyone whose top role is not below the bot's cannot be removed.
fn is_protected(ctx: &serenity::Context, guild_id: serenity::GuildId, user_id: serenity::UserId) -> bool {
    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return true;
    };
    if guild.owner_id == user_id {
        return true;
    }

    let top_position = |id: serenity::UserId| {
        guild
            .members
            .get(&id)
            .and_then(|member| guild.member_highest_role(member))
            .map(|role| role.position)
            .unwrap_or(0)
    };
    top_position(user_id) >= top_position(bot_id)
}

fn case_title(action: PhishingAction) -> &'static str {
    match action {
        PhishingAction::Ignore => "Phishing link ignored",
        PhishingAction::Notify => "Phishing link found",
        PhishingAction::Delete => "Phishing message deleted",
        PhishingAction::Kick => "Member kicked for phishing",
        PhishingAction::Ban => "Member banned for phishing",
    }
}

fn case_embed(msg: &serenity::Message, verdict: &PhishingVerdict) -> serenity::CreateEmbed {
    let color = if verdict.action.removes_message() {
        ERROR_COLOR
    } else {
        WARNING_COLOR
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(case_title(verdict.action))
        .color(color)
        .field(
            "User",
            format!("<@{}> ({})", msg.author.id, msg.author.name),
            true,
        )
        .field("Channel", format!("<#{}>", msg.channel_id), true)
        .field("Domain", format!("`{}`", verdict.domain), false)
        .field(
            "Links shared",
            verdict.member_caught.to_string(),
            true,
        )
        .timestamp(serenity::Timestamp::now());

    if verdict.escalated {
        embed = embed.field("Escalated", "Link limit reached, action raised to ban", false);
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_a_case_title() {
        for action in PhishingAction::ALL {
            assert!(!case_title(action).is_empty());
        }
        assert_eq!(case_title(PhishingAction::Ban), "Member banned for phishing");
    }
}
