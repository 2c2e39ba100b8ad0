// `/images` - Cloudflare Images management.

use super::{field_value, or_na, timestamp, CLOUDFLARE_COLOR};
use crate::core::cloudflare::ImageDetails;
use crate::core::cloudflare::validation::paginate;
use crate::discord::ui;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn image_embed(title: &str, image: &ImageDetails) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(CLOUDFLARE_COLOR)
        .field("ID", format!("`{}`", image.id), false)
        .field("Filename", or_na(image.filename.as_deref()), true)
        .field("Uploaded", timestamp(image.uploaded.as_deref()), true);

    if !image.variants.is_empty() {
        embed = embed.field("Variants", field_value(image.variants.join("\n")), false);
    }
    if let Some(first) = image.variants.first() {
        embed = embed.image(first);
    }
    embed
}

/// Manage Cloudflare Images.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("upload", "delete", "info", "list", "stats")
)]
pub async fn images(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Upload an image to Cloudflare Images.
#[poise::command(slash_command, owners_only)]
pub async fn upload(
    ctx: Context<'_>,
    #[description = "Image to upload (png, jpg, jpeg, gif, webp)"] image: serenity::Attachment,
) -> Result<(), Error> {
    ctx.defer().await?;
    let bytes = image.download().await?;
    let uploaded = ctx
        .data()
        .cloudflare
        .upload_image(&image.filename, bytes, image.content_type.clone())
        .await?;

    ui::send_embed(ctx, image_embed("Image uploaded", &uploaded)).await
}

/// Delete an image by id.
#[poise::command(slash_command, owners_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Image id"] image_id: String,
) -> Result<(), Error> {
    ctx.data().cloudflare.delete_image(image_id.trim()).await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Image deleted", format!("Image `{}` was deleted.", image_id.trim())),
    )
    .await
}

/// Show details for an image.
#[poise::command(slash_command, owners_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Image id"] image_id: String,
) -> Result<(), Error> {
    let image = ctx.data().cloudflare.image_info(image_id.trim()).await?;
    ui::send_embed(ctx, image_embed("Image details", &image)).await
}

/// List uploaded images.
#[poise::command(slash_command, owners_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let images = ctx.data().cloudflare.list_images().await?;
    if images.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No images", "No images were found.")).await;
    }

    let pages = paginate(&images, 10)
        .into_iter()
        .map(|page| {
            let lines = page
                .iter()
                .map(|img| format!("`{}` {}", img.id, or_na(img.filename.as_deref())))
                .collect::<Vec<_>>()
                .join("\n");
            serenity::CreateEmbed::new()
                .title("Cloudflare Images")
                .description(lines)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Show how many images are stored and allowed.
#[poise::command(slash_command, owners_only)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let stats = ctx.data().cloudflare.image_stats().await?;
    let embed = serenity::CreateEmbed::new()
        .title("Image usage")
        .color(CLOUDFLARE_COLOR)
        .field("Current", stats.current.to_string(), true)
        .field("Allowed", stats.allowed.to_string(), true);
    ui::send_embed(ctx, embed).await
}
