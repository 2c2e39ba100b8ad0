// Shared embed colors and interactive reply helpers.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

pub const ERROR_COLOR: u32 = 0xff4545;
pub const SUCCESS_COLOR: u32 = 0x2bbd8e;
pub const WARNING_COLOR: u32 = 0xffd966;
pub const NEUTRAL_COLOR: u32 = 0xfffffe;

const INTERACTION_TIMEOUT_SECS: u64 = 60;

pub fn error_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(ERROR_COLOR)
}

pub fn success_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(SUCCESS_COLOR)
}

pub async fn send_embed(ctx: Context<'_>, embed: serenity::CreateEmbed) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Ephemeral error reply, used for validation failures that are the caller's fault.
pub async fn send_error(ctx: Context<'_>, title: &str, description: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(error_embed(title, description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn page_buttons(
    prev_id: &str,
    close_id: &str,
    next_id: &str,
    current: usize,
    total: usize,
) -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(prev_id)
            .label("Previous")
            .style(serenity::ButtonStyle::Primary)
            .disabled(current == 0),
        serenity::CreateButton::new(close_id)
            .label("Close")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(next_id)
            .label("Next")
            .style(serenity::ButtonStyle::Primary)
            .disabled(current + 1 >= total),
    ])]
}

fn with_page_footer(embed: &serenity::CreateEmbed, current: usize, total: usize) -> serenity::CreateEmbed {
    embed.clone().footer(serenity::CreateEmbedFooter::new(format!(
        "Page {}/{}",
        current + 1,
        total
    )))
}

/// Send `pages` with Previous/Close/Next buttons. Only the invoking user can flip pages.
pub async fn paginate(ctx: Context<'_>, pages: Vec<serenity::CreateEmbed>) -> Result<(), Error> {
    let total = pages.len();
    if total == 0 {
        return Ok(());
    }
    if total == 1 {
        return send_embed(ctx, pages[0].clone()).await;
    }

    let ctx_id = ctx.id();
    let prev_id = format!("{ctx_id}_prev");
    let close_id = format!("{ctx_id}_close");
    let next_id = format!("{ctx_id}_next");
    let mut current = 0usize;

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(with_page_footer(&pages[current], current, total))
                .components(page_buttons(&prev_id, &close_id, &next_id, current, total)),
        )
        .await?;
    let message_id = reply.message().await?.id;

    while let Some(press) = serenity::collector::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .message_id(message_id)
        .timeout(Duration::from_secs(INTERACTION_TIMEOUT_SECS))
        .await
    {
        if press.data.custom_id == close_id {
            press
                .create_response(ctx.http(), serenity::CreateInteractionResponse::Acknowledge)
                .await?;
            reply.delete(ctx).await?;
            return Ok(());
        }

        if press.data.custom_id == next_id && current + 1 < total {
            current += 1;
        } else if press.data.custom_id == prev_id {
            current = current.saturating_sub(1);
        }

        press
            .create_response(
                ctx.http(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(with_page_footer(&pages[current], current, total))
                        .components(page_buttons(&prev_id, &close_id, &next_id, current, total)),
                ),
            )
            .await?;
    }

    reply
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(with_page_footer(&pages[current], current, total))
                .components(vec![]),
        )
        .await?;
    Ok(())
}

/// Ask the invoking user to confirm a destructive action.
///
/// Returns `true` only when the confirm button was pressed before the timeout.
pub async fn confirm(ctx: Context<'_>, prompt: serenity::CreateEmbed) -> Result<bool, Error> {
    let ctx_id = ctx.id();
    let confirm_id = format!("{ctx_id}_confirm");
    let cancel_id = format!("{ctx_id}_cancel");

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(prompt.clone())
                .components(vec![serenity::CreateActionRow::Buttons(vec![
                    serenity::CreateButton::new(&confirm_id)
                        .label("Confirm")
                        .style(serenity::ButtonStyle::Danger),
                    serenity::CreateButton::new(&cancel_id)
                        .label("Cancel")
                        .style(serenity::ButtonStyle::Secondary),
                ])]),
        )
        .await?;
    let message_id = reply.message().await?.id;

    let press = serenity::collector::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .message_id(message_id)
        .timeout(Duration::from_secs(INTERACTION_TIMEOUT_SECS))
        .await;

    let confirmed = press
        .as_ref()
        .is_some_and(|p| p.data.custom_id == confirm_id);
    if let Some(press) = press {
        press
            .create_response(ctx.http(), serenity::CreateInteractionResponse::Acknowledge)
            .await?;
    }

    reply
        .edit(ctx, poise::CreateReply::default().embed(prompt).components(vec![]))
        .await?;

    if !confirmed {
        ctx.send(
            poise::CreateReply::default()
                .content("Cancelled.")
                .ephemeral(true),
        )
        .await?;
    }
    Ok(confirmed)
}

/// Single link button row.
pub fn link_button(label: &str, url: impl Into<String>) -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new_link(url).label(label)])
}
