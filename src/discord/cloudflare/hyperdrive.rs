// `/hyperdrive` - Hyperdrive database connection configs.

use super::{or_na, CLOUDFLARE_COLOR};
use crate::core::cloudflare::{Hyperdrive, NewHyperdrive};
use crate::discord::ui;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn hyperdrive_embed(title: &str, config: &Hyperdrive) -> serenity::CreateEmbed {
    let caching = if config.caching.disabled {
        "Disabled".to_string()
    } else {
        format!(
            "max age {}s, stale {}s",
            or_na(config.caching.max_age),
            or_na(config.caching.stale_while_revalidate)
        )
    };

    serenity::CreateEmbed::new()
        .title(title)
        .color(CLOUDFLARE_COLOR)
        .field("Name", &config.name, true)
        .field("ID", format!("`{}`", config.id), true)
        .field(
            "Origin",
            format!(
                "{}://{}@{}:{}/{}",
                config.origin.scheme,
                config.origin.user,
                config.origin.host,
                or_na(config.origin.port),
                config.origin.database
            ),
            false,
        )
        .field("Caching", caching, false)
}

/// Manage Hyperdrive configs.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("list", "create", "info", "patch", "delete")
)]
pub async fn hyperdrive(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// List Hyperdrive configs.
#[poise::command(slash_command, owners_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let configs = ctx.data().cloudflare.list_hyperdrives().await?;
    if configs.is_empty() {
        return ui::send_embed(
            ctx,
            ui::error_embed("No configs", "No Hyperdrive configs were found."),
        )
        .await;
    }

    let pages = configs
        .iter()
        .map(|config| hyperdrive_embed("Hyperdrive config", config))
        .collect();
    ui::paginate(ctx, pages).await
}

/// Create a Hyperdrive config for a database.
#[poise::command(slash_command, owners_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Config name"] name: String,
    #[description = "Database host"] host: String,
    #[description = "Database port"] port: u16,
    #[description = "Database name"] database: String,
    #[description = "Database user"] user: String,
    #[description = "Database password"] password: String,
    #[description = "Connection scheme (default postgres)"] scheme: Option<String>,
    #[description = "Disable query caching"] caching_disabled: Option<bool>,
    #[description = "Cache max age in seconds"] max_age: Option<u64>,
    #[description = "Stale-while-revalidate in seconds"] stale_while_revalidate: Option<u64>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let config = ctx
        .data()
        .cloudflare
        .create_hyperdrive(NewHyperdrive {
            name,
            host,
            port,
            database,
            scheme: scheme.unwrap_or_else(|| "postgres".to_string()),
            user,
            password,
            caching_disabled: caching_disabled.unwrap_or(false),
            max_age,
            stale_while_revalidate,
        })
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(hyperdrive_embed("Hyperdrive created", &config))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show one Hyperdrive config.
#[poise::command(slash_command, owners_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Config id"] id: String,
) -> Result<(), Error> {
    let config = ctx.data().cloudflare.hyperdrive(id.trim()).await?;
    ui::send_embed(ctx, hyperdrive_embed("Hyperdrive config", &config)).await
}

/// Patch a Hyperdrive config with a JSON object of changes.
#[poise::command(slash_command, owners_only)]
pub async fn patch(
    ctx: Context<'_>,
    #[description = "Config id"] id: String,
    #[description = "JSON object, e.g. {\"caching\":{\"disabled\":true}}"] changes: String,
) -> Result<(), Error> {
    let config = ctx
        .data()
        .cloudflare
        .patch_hyperdrive(id.trim(), &changes)
        .await?;
    ui::send_embed(ctx, hyperdrive_embed("Hyperdrive updated", &config)).await
}

/// Delete a Hyperdrive config.
#[poise::command(slash_command, owners_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Config id"] id: String,
) -> Result<(), Error> {
    let id = id.trim();
    ctx.data().cloudflare.delete_hyperdrive(id).await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Hyperdrive deleted", format!("Config `{id}` was deleted.")),
    )
    .await
}
