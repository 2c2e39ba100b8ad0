// `/nickname` - purify members one at a time or in bulk, and guild settings.

use super::events::{apply_change, fetch_all_members, shown_name, EDIT_PAUSE};
use crate::core::nicknames::{plan_change, NicknameChange, NicknameSettings, NicknameStyle};
use crate::discord::ui::{self, NEUTRAL_COLOR};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const PROGRESS_EVERY: usize = 100;

fn change_description(member: &serenity::Member, change: &NicknameChange) -> String {
    match change {
        NicknameChange::Set(name) => format!("<@{}> is now known as **{}**.", member.user.id, name),
        NicknameChange::Clear => format!(
            "Nothing was left of <@{}>'s nickname, so it was removed.",
            member.user.id
        ),
        NicknameChange::Unchanged => format!("<@{}>'s name is already clean.", member.user.id),
    }
}

fn change_title(change: &NicknameChange) -> &'static str {
    match change {
        NicknameChange::Set(_) => "Nickname updated",
        NicknameChange::Clear => "Nickname removed",
        NicknameChange::Unchanged => "Nickname unchanged",
    }
}

fn settings_embed(settings: &NicknameSettings) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Nickname settings")
        .color(NEUTRAL_COLOR)
        .field(
            "Allowed characters",
            format!("`{}`", settings.allowed_characters),
            false,
        )
        .field("Maximum length", settings.max_length.to_string(), true)
        .field(
            "Auto-purify",
            if settings.auto_purify { "On" } else { "Off" },
            true,
        )
}

/// Keep nicknames readable.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "purify",
        "normalize",
        "allowedchars",
        "maxlength",
        "autopurify",
        "settings",
        "cleanup"
    )
)]
pub async fn nickname(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn rename_member(
    ctx: Context<'_>,
    member: serenity::Member,
    style: NicknameStyle,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let change = ctx
        .data()
        .nicknames
        .plan(
            guild_id.get(),
            style,
            shown_name(member.nick.as_deref(), &member.user),
            &member.user.name,
            member.nick.is_some(),
        )
        .await?;

    apply_change(ctx.http(), guild_id, member.user.id, &change).await?;
    ui::send_embed(
        ctx,
        ui::success_embed(change_title(&change), change_description(&member, &change)),
    )
    .await
}

/// Strip disallowed characters from a member's name.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_NICKNAMES")]
pub async fn purify(
    ctx: Context<'_>,
    #[description = "Member to purify"] member: serenity::Member,
) -> Result<(), Error> {
    rename_member(ctx, member, NicknameStyle::Purify).await
}

/// Purify a member's name and title-case it.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_NICKNAMES")]
pub async fn normalize(
    ctx: Context<'_>,
    #[description = "Member to normalize"] member: serenity::Member,
) -> Result<(), Error> {
    rename_member(ctx, member, NicknameStyle::Normalize).await
}

/// Set which characters nicknames may contain.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn allowedchars(
    ctx: Context<'_>,
    #[description = "Every character that is allowed"] characters: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    if let Err(e) = ctx
        .data()
        .nicknames
        .set_allowed_characters(guild_id, &characters)
        .await
    {
        return ui::send_error(ctx, "Error: Invalid characters", e.to_string()).await;
    }

    ui::send_embed(
        ctx,
        ui::success_embed(
            "Settings changed",
            format!("Nicknames may now only contain `{characters}`."),
        ),
    )
    .await
}

/// Set the longest nickname allowed.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn maxlength(
    ctx: Context<'_>,
    #[description = "Maximum length (1-32)"] length: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    if let Err(e) = ctx.data().nicknames.set_max_length(guild_id, length).await {
        return ui::send_error(ctx, "Error: Invalid length", e.to_string()).await;
    }

    ui::send_embed(
        ctx,
        ui::success_embed(
            "Settings changed",
            format!("Nicknames are now cut to **{length}** characters."),
        ),
    )
    .await
}

/// Purify nicknames automatically when members change them.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn autopurify(
    ctx: Context<'_>,
    #[description = "Whether auto-purify is on"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    ctx.data()
        .nicknames
        .set_auto_purify(guild_id, enabled)
        .await?;
    tracing::info!(guild_id, enabled, "Auto-purify changed");

    let description = if enabled {
        "Member nicknames will now be purified automatically."
    } else {
        "Automatic nickname purification is now **disabled**."
    };
    ui::send_embed(ctx, ui::success_embed("Settings changed", description)).await
}

/// Show this server's nickname settings.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_NICKNAMES")]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let settings = ctx.data().nicknames.settings(guild_id).await?;
    ui::send_embed(ctx, settings_embed(&settings)).await
}

/// Purify every member in the server.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn cleanup(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    ctx.defer().await?;

    let settings = ctx.data().nicknames.settings(guild_id.get()).await?;
    let members = fetch_all_members(ctx.http(), guild_id).await?;
    let total = members.len();

    let progress = ctx
        .say(format!("Cleaning up nicknames: 0/{total} members checked."))
        .await?;

    let mut edited = 0usize;
    let mut failed = 0usize;
    for (index, member) in members.iter().enumerate() {
        let checked = index + 1;

        if !member.user.bot {
            let change = plan_change(
                &settings,
                NicknameStyle::Purify,
                shown_name(member.nick.as_deref(), &member.user),
                &member.user.name,
                member.nick.is_some(),
            );
            if change != NicknameChange::Unchanged {
                match apply_change(ctx.http(), guild_id, member.user.id, &change).await {
                    Ok(_) => edited += 1,
                    Err(e) => {
                        failed += 1;
                        tracing::warn!(
                            guild_id = guild_id.get(),
                            user_id = member.user.id.get(),
                            "Failed to purify nickname: {}",
                            e
                        );
                    }
                }
                tokio::time::sleep(EDIT_PAUSE).await;
            }
        }

        if checked % PROGRESS_EVERY == 0 {
            progress
                .edit(
                    ctx,
                    poise::CreateReply::default().content(format!(
                        "Cleaning up nicknames: {checked}/{total} members checked."
                    )),
                )
                .await?;
        }
    }

    let mut summary = format!("Checked **{total}** members and renamed **{edited}**.");
    if failed > 0 {
        summary.push_str(&format!(" **{failed}** could not be renamed."));
    }
    progress
        .edit(
            ctx,
            poise::CreateReply::default()
                .content("")
                .embed(ui::success_embed("Cleanup finished", summary)),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_follows_the_change() {
        assert_eq!(change_title(&NicknameChange::Set("Bee".into())), "Nickname updated");
        assert_eq!(change_title(&NicknameChange::Clear), "Nickname removed");
        assert_eq!(change_title(&NicknameChange::Unchanged), "Nickname unchanged");
    }
}
