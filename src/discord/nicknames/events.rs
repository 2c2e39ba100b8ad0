// Nickname enforcement - member update listener and the periodic sweep.

use crate::core::nicknames::{NicknameChange, NicknameStyle};
use crate::discord::{Data, Error, Nicknames};
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// Pause between member edits so bulk runs stay under the rate limit.
pub const EDIT_PAUSE: Duration = Duration::from_secs(1);

const MEMBER_PAGE: u64 = 1000;

/// Name Discord shows for a member: nickname, then global name, then username.
pub fn shown_name<'a>(nick: Option<&'a str>, user: &'a serenity::User) -> &'a str {
    nick.or(user.global_name.as_deref()).unwrap_or(&user.name)
}

/// Apply a planned change. Returns `true` when the member was edited.
pub async fn apply_change(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    change: &NicknameChange,
) -> Result<bool, Error> {
    let nickname = match change {
        NicknameChange::Unchanged => return Ok(false),
        NicknameChange::Set(name) => name.clone(),
        NicknameChange::Clear => String::new(),
    };

    guild_id
        .edit_member(http, user_id, serenity::EditMember::new().nickname(nickname))
        .await?;
    tracing::debug!(guild_id = guild_id.get(), user_id = user_id.get(), ?change, "Nickname updated");
    Ok(true)
}

/// Every member of a guild, fetched page by page.
pub async fn fetch_all_members(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
) -> Result<Vec<serenity::Member>, Error> {
    let mut members = Vec::new();
    let mut after: Option<serenity::UserId> = None;
    loop {
        let page = guild_id.members(http, Some(MEMBER_PAGE), after).await?;
        let fetched = page.len() as u64;
        after = page.last().map(|m| m.user.id);
        members.extend(page);
        if fetched < MEMBER_PAGE {
            break;
        }
    }
    Ok(members)
}

/// Purify a member whose profile just changed, if the guild opted in.
pub async fn handle_member_update(
    ctx: &serenity::Context,
    event: &serenity::GuildMemberUpdateEvent,
    data: &Data,
) -> Result<(), Error> {
    if event.user.bot {
        return Ok(());
    }

    let display_name = shown_name(event.nick.as_deref(), &event.user);
    let Some(change) = data
        .nicknames
        .plan_auto_purify(
            event.guild_id.get(),
            display_name,
            &event.user.name,
            event.nick.is_some(),
        )
        .await?
    else {
        return Ok(());
    };

    apply_change(&ctx.http, event.guild_id, event.user.id, &change).await?;
    Ok(())
}

/// Purify every member of one guild. Returns how many were edited.
pub async fn sweep_guild(
    http: &serenity::Http,
    nicknames: &Nicknames,
    guild_id: serenity::GuildId,
) -> Result<usize, Error> {
    let settings = nicknames.settings(guild_id.get()).await?;
    let mut edited = 0;

    for member in fetch_all_members(http, guild_id).await? {
        if member.user.bot {
            continue;
        }
        let change = crate::core::nicknames::plan_change(
            &settings,
            NicknameStyle::Purify,
            shown_name(member.nick.as_deref(), &member.user),
            &member.user.name,
            member.nick.is_some(),
        );
        if change == NicknameChange::Unchanged {
            continue;
        }

        match apply_change(http, guild_id, member.user.id, &change).await {
            Ok(true) => edited += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(
                guild_id = guild_id.get(),
                user_id = member.user.id.get(),
                "Failed to purify nickname: {}",
                e
            ),
        }
        tokio::time::sleep(EDIT_PAUSE).await;
    }

    Ok(edited)
}

/// Sweep every guild that has auto-purify switched on.
pub async fn sweep_auto_purify_guilds(http: &serenity::Http, nicknames: &Nicknames) {
    let guilds = match nicknames.auto_purify_guilds().await {
        Ok(guilds) => guilds,
        Err(e) => {
            tracing::warn!("Failed to load auto-purify guilds: {}", e);
            return;
        }
    };

    for guild_id in guilds {
        match sweep_guild(http, nicknames, serenity::GuildId::new(guild_id)).await {
            Ok(edited) => tracing::info!(guild_id, edited, "Nickname sweep finished"),
            Err(e) => tracing::warn!(guild_id, "Nickname sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, global: Option<&str>) -> serenity::User {
        let mut user = serenity::User::default();
        user.name = name.to_string();
        user.global_name = global.map(str::to_string);
        user
    }

    #[test]
    fn shown_name_prefers_nick_then_global_name() {
        let u = user("bee_user", Some("Bee"));
        assert_eq!(shown_name(Some("Queen"), &u), "Queen");
        assert_eq!(shown_name(None, &u), "Bee");
        assert_eq!(shown_name(None, &user("bee_user", None)), "bee_user");
    }
}
