// Anti-phishing slash commands: manual lookups and guild configuration.

use crate::core::antiphishing::{LinkCheck, PhishingAction, PhishingStats};
use crate::discord::ui::{self, ERROR_COLOR, SUCCESS_COLOR, WARNING_COLOR};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const STATS_COLOR: u32 = 0xffd966;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ActionChoice {
    #[name = "ignore"]
    Ignore,
    #[name = "notify"]
    Notify,
    #[name = "delete"]
    Delete,
    #[name = "kick"]
    Kick,
    #[name = "ban"]
    Ban,
}

impl From<ActionChoice> for PhishingAction {
    fn from(choice: ActionChoice) -> Self {
        match choice {
            ActionChoice::Ignore => PhishingAction::Ignore,
            ActionChoice::Notify => PhishingAction::Notify,
            ActionChoice::Delete => PhishingAction::Delete,
            ActionChoice::Kick => PhishingAction::Kick,
            ActionChoice::Ban => PhishingAction::Ban,
        }
    }
}

fn detected_embed(domain: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Link query: Detected!")
        .description(
            "**This is a known dangerous website!**\n\n\
             This website is blocklisted for malicious behavior or content.",
        )
        .field("Domain", format!("`{domain}`"), false)
        .color(ERROR_COLOR)
}

fn clean_embed(domain: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Link query: No detections")
        .description(
            "**This link looks clean.**\n\n\
             You should be able to proceed safely. Use your best judgement while browsing \
             and leave the site if at any time your sense of trust is impaired.",
        )
        .field("Domain", format!("`{domain}`"), false)
        .color(SUCCESS_COLOR)
}

/// Check a single URL against the phishing block-list.
#[poise::command(slash_command)]
pub async fn checkphish(
    ctx: Context<'_>,
    #[description = "The URL to check"] url: String,
) -> Result<(), Error> {
    match ctx.data().phishing.check_url(&url).await {
        Ok(LinkCheck::Detected { domain }) => ui::send_embed(ctx, detected_embed(&domain)).await,
        Ok(LinkCheck::Clean { domain }) => ui::send_embed(ctx, clean_embed(&domain)).await,
        Err(e) => ui::send_error(ctx, "Error: Invalid URL", e.to_string()).await,
    }
}

/// Check every link in a message.
#[poise::command(context_menu_command = "Check for phishing")]
pub async fn check_message_for_phishing(
    ctx: Context<'_>,
    #[description = "Message to check"] message: serenity::Message,
) -> Result<(), Error> {
    let embed = match ctx.data().phishing.find_malicious_domain(&message.content).await {
        Some(domain) => detected_embed(&domain),
        None => serenity::CreateEmbed::new()
            .title("No detections")
            .description("No known malicious links were found in this message.")
            .color(SUCCESS_COLOR),
    };

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Configure anti-phishing protection for this server.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("action", "maxlinks", "logchannel", "modrole", "stats")
)]
pub async fn antiphishing(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Choose what happens when a malicious link is posted.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn action(
    ctx: Context<'_>,
    #[description = "Action to take on malicious links"] action: ActionChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let action = PhishingAction::from(action);

    ctx.data().phishing.set_action(guild_id, action).await?;
    tracing::info!(guild_id, action = %action, "Phishing action changed");

    let color = if action.removes_message() {
        ERROR_COLOR
    } else {
        WARNING_COLOR
    };
    let embed = serenity::CreateEmbed::new()
        .title("Settings changed")
        .description(action.describe())
        .color(color);
    ui::send_embed(ctx, embed).await
}

/// Set how many malicious links a member may share before being banned.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn maxlinks(
    ctx: Context<'_>,
    #[description = "Links allowed before an automatic ban"] max_links: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    if let Err(e) = ctx.data().phishing.set_max_links(guild_id, max_links).await {
        return ui::send_error(ctx, "Error: Invalid number", e.to_string()).await;
    }

    let embed = serenity::CreateEmbed::new()
        .title("Settings changed")
        .description(format!(
            "The maximum number of malicious links a user can share before being banned is now set to **{max_links}**."
        ))
        .color(WARNING_COLOR);
    ui::send_embed(ctx, embed).await
}

/// Set or clear the channel that receives phishing case logs.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn logchannel(
    ctx: Context<'_>,
    #[description = "Log channel (leave empty to disable)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channel_id = channel.as_ref().map(|c| c.id.get());

    ctx.data()
        .phishing
        .set_log_channel(guild_id, channel_id)
        .await?;

    let description = match channel_id {
        Some(id) => format!("Phishing cases will now be logged in <#{id}>."),
        None => "Phishing case logging is now **disabled**.".to_string(),
    };
    ui::send_embed(ctx, ui::success_embed("Settings changed", description)).await
}

/// Set or clear the role pinged on phishing warnings.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn modrole(
    ctx: Context<'_>,
    #[description = "Moderator role (leave empty to disable)"] role: Option<serenity::Role>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let role_id = role.as_ref().map(|r| r.id.get());

    ctx.data().phishing.set_mod_role(guild_id, role_id).await?;

    let description = match role_id {
        Some(id) => format!("<@&{id}> will now be mentioned when a malicious link is detected."),
        None => "No role will be mentioned on phishing warnings.".to_string(),
    };
    ui::send_embed(ctx, ui::success_embed("Settings changed", description)).await
}

fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("**`{count}`** {word}")
    } else {
        format!("**`{count}`** {word}s")
    }
}

fn stats_description(guild_name: &str, stats: &PhishingStats, blocklist_size: usize) -> String {
    format!(
        "Since being activated in {guild_name}, we've been hard at work.\n\n\
         - We've detected {} shared in chats\n\
         - We've warned you of danger {}\n\
         - We've removed {} to protect the community\n\
         - We've removed a user from the server {}\n\
         - We've delivered {} for sharing dangerous links\n\n\
         **Domains on the block-list** **`{blocklist_size}`**",
        plural(stats.caught, "malicious link"),
        plural(stats.notifications, "time"),
        plural(stats.deletions, "message"),
        plural(stats.kicks, "time"),
        plural(stats.bans, "permanent ban"),
    )
}

/// Show protection statistics for this server.
#[poise::command(slash_command, guild_only)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string());

    let stats = ctx.data().phishing.stats(guild_id.get()).await?;
    let settings = ctx.data().phishing.settings(guild_id.get()).await?;
    let blocklist_size = ctx.data().phishing.blocklist_size().await;

    let embed = serenity::CreateEmbed::new()
        .title("Protection statistics")
        .description(stats_description(&guild_name, &stats, blocklist_size))
        .field("Action", settings.action.as_str(), true)
        .field("Max links", settings.max_links.to_string(), true)
        .color(STATS_COLOR);

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .components(vec![ui::link_button("Learn More", "https://www.beehive.systems")]),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_use_singular_for_one() {
        let stats = PhishingStats {
            caught: 1,
            notifications: 2,
            ..Default::default()
        };
        let text = stats_description("Hive", &stats, 10);
        assert!(text.contains("**`1`** malicious link shared"));
        assert!(text.contains("**`2`** times"));
        assert!(text.contains("**`0`** permanent bans"));
        assert!(text.contains("**`10`**"));
    }

    #[test]
    fn every_choice_maps_to_an_action() {
        assert_eq!(PhishingAction::from(ActionChoice::Kick), PhishingAction::Kick);
        assert_eq!(PhishingAction::from(ActionChoice::Ignore), PhishingAction::Ignore);
    }
}
