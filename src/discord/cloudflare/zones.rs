// `/zones`, `/dnssec`, `/botmanagement` and `/loadbalancing`.

use super::{field_value, or_na, timestamp, yes_no, CLOUDFLARE_COLOR};
use crate::core::cloudflare::validation::paginate;
use crate::core::cloudflare::{BotManagementConfig, LoadBalancer};
use crate::discord::ui;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// List every zone on the account.
#[poise::command(slash_command, owners_only)]
pub async fn zones(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let zones = ctx.data().cloudflare.list_zones().await?;
    if zones.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No zones", "No zones were found.")).await;
    }

    let total = zones.len();
    let pages = paginate(&zones, 10)
        .into_iter()
        .map(|page| {
            let names = page
                .iter()
                .map(|zone| format!("- {}", zone.name))
                .collect::<Vec<_>>()
                .join("\n");
            serenity::CreateEmbed::new()
                .title(format!("Zones ({total})"))
                .description(names)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Inspect or remove DNSSEC for the configured zone.
#[poise::command(slash_command, owners_only, subcommands("dnssec_status", "dnssec_delete"))]
pub async fn dnssec(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the DNSSEC status of the zone.
#[poise::command(slash_command, owners_only, rename = "status")]
pub async fn dnssec_status(ctx: Context<'_>) -> Result<(), Error> {
    let status = ctx.data().cloudflare.dnssec_status().await?;
    let mut embed = serenity::CreateEmbed::new()
        .title("DNSSEC")
        .color(CLOUDFLARE_COLOR)
        .field("Status", status.status_label(), false)
        .field("Algorithm", or_na(status.algorithm.as_deref()), true)
        .field("Digest type", or_na(status.digest_type.as_deref()), true)
        .field("Key tag", or_na(status.key_tag), true)
        .field("Flags", or_na(status.flags), true)
        .field("Multi-signer", yes_no(status.dnssec_multi_signer), true)
        .field("Presigned", yes_no(status.dnssec_presigned), true)
        .field("Modified", timestamp(status.modified_on.as_deref()), false);

    if let Some(ds) = status.ds.as_deref().filter(|ds| !ds.is_empty()) {
        embed = embed.field("DS record", field_value(format!("```{ds}```")), false);
    }
    if let Some(key) = status.public_key.as_deref().filter(|k| !k.is_empty()) {
        embed = embed.field("Public key", field_value(format!("```{key}```")), false);
    }
    ui::send_embed(ctx, embed).await
}

/// Delete DNSSEC records for the zone.
#[poise::command(slash_command, owners_only, rename = "delete")]
pub async fn dnssec_delete(ctx: Context<'_>) -> Result<(), Error> {
    let prompt = ui::error_embed(
        "Delete DNSSEC?",
        "This removes DNSSEC from the zone. Resolvers will stop validating it.",
    );
    if !ui::confirm(ctx, prompt).await? {
        return Ok(());
    }

    ctx.data().cloudflare.delete_dnssec().await?;
    ui::send_embed(ctx, ui::success_embed("DNSSEC deleted", "DNSSEC records were removed.")).await
}

fn bot_management_embed(title: &str, config: &BotManagementConfig) -> serenity::CreateEmbed {
    config
        .iter()
        .take(25)
        .fold(
            serenity::CreateEmbed::new().title(title).color(CLOUDFLARE_COLOR),
            |embed, (key, value)| {
                let shown = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                embed.field(key, field_value(shown), true)
            },
        )
}

/// Bot management settings for the zone.
#[poise::command(slash_command, owners_only, subcommands("botmanagement_get", "botmanagement_update"))]
pub async fn botmanagement(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the bot management configuration.
#[poise::command(slash_command, owners_only, rename = "get")]
pub async fn botmanagement_get(ctx: Context<'_>) -> Result<(), Error> {
    let config = ctx.data().cloudflare.bot_management().await?;
    ui::send_embed(ctx, bot_management_embed("Bot management", &config)).await
}

/// Turn one bot management setting on or off.
#[poise::command(slash_command, owners_only, rename = "update")]
pub async fn botmanagement_update(
    ctx: Context<'_>,
    #[description = "Setting name, e.g. fight_mode"] setting: String,
    #[description = "New value"] enabled: bool,
) -> Result<(), Error> {
    let config = ctx
        .data()
        .cloudflare
        .update_bot_management(&setting, enabled)
        .await?;
    ui::send_embed(ctx, bot_management_embed("Bot management updated", &config)).await
}

fn load_balancer_embed(lb: &LoadBalancer) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("Load balancer {}", lb.name))
        .color(CLOUDFLARE_COLOR)
        .field("ID", format!("`{}`", lb.id), false)
        .field("Description", or_na(lb.description.as_deref()), false)
        .field("Enabled", yes_no(lb.enabled), true)
        .field("Proxied", yes_no(lb.proxied), true)
        .field("TTL", or_na(lb.ttl), true)
        .field("Steering", or_na(lb.steering_policy.as_deref()), true)
        .field("Session affinity", or_na(lb.session_affinity.as_deref()), true)
        .field("Fallback pool", or_na(lb.fallback_pool.as_deref()), true)
        .field(
            "Default pools",
            if lb.default_pools.is_empty() {
                "N/A".to_string()
            } else {
                field_value(lb.default_pools.join("\n"))
            },
            false,
        )
        .field("Created", timestamp(lb.created_on.as_deref()), true)
        .field("Modified", timestamp(lb.modified_on.as_deref()), true)
}

/// Inspect and remove load balancers.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("loadbalancing_list", "loadbalancing_info", "loadbalancing_delete")
)]
pub async fn loadbalancing(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// List load balancers in the zone.
#[poise::command(slash_command, owners_only, rename = "list")]
pub async fn loadbalancing_list(ctx: Context<'_>) -> Result<(), Error> {
    let balancers = ctx.data().cloudflare.list_load_balancers().await?;
    if balancers.is_empty() {
        return ui::send_embed(
            ctx,
            ui::error_embed("No load balancers", "No load balancers were found."),
        )
        .await;
    }

    let pages = balancers.iter().map(load_balancer_embed).collect();
    ui::paginate(ctx, pages).await
}

/// Show one load balancer.
#[poise::command(slash_command, owners_only, rename = "info")]
pub async fn loadbalancing_info(
    ctx: Context<'_>,
    #[description = "Load balancer id"] id: String,
) -> Result<(), Error> {
    let lb = ctx.data().cloudflare.load_balancer(id.trim()).await?;
    ui::send_embed(ctx, load_balancer_embed(&lb)).await
}

/// Delete a load balancer.
#[poise::command(slash_command, owners_only, rename = "delete")]
pub async fn loadbalancing_delete(
    ctx: Context<'_>,
    #[description = "Load balancer id"] id: String,
) -> Result<(), Error> {
    let id = id.trim();
    ctx.data().cloudflare.delete_load_balancer(id).await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Load balancer deleted", format!("Load balancer `{id}` was deleted.")),
    )
    .await
}
