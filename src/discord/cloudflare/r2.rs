// `/r2` - R2 buckets and objects.

use super::{or_na, timestamp, CLOUDFLARE_COLOR};
use crate::core::cloudflare::validation::{format_size, MAX_STASH_BYTES};
use crate::core::cloudflare::R2Bucket;
use crate::discord::ui;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum LocationHint {
    #[name = "apac"]
    Apac,
    #[name = "eeur"]
    Eeur,
    #[name = "enam"]
    Enam,
    #[name = "weur"]
    Weur,
    #[name = "wnam"]
    Wnam,
}

impl LocationHint {
    fn as_str(&self) -> &'static str {
        match self {
            LocationHint::Apac => "apac",
            LocationHint::Eeur => "eeur",
            LocationHint::Enam => "enam",
            LocationHint::Weur => "weur",
            LocationHint::Wnam => "wnam",
        }
    }
}

fn bucket_embed(title: &str, bucket: &R2Bucket) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .color(CLOUDFLARE_COLOR)
        .field("Name", &bucket.name, true)
        .field("Location", or_na(bucket.location.as_deref()), true)
        .field("Storage class", or_na(bucket.storage_class.as_deref()), true)
        .field("Created", timestamp(bucket.creation_date.as_deref()), false)
}

/// Manage R2 storage.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("create", "delete", "info", "stash", "recycle", "fetch")
)]
pub async fn r2(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a bucket.
#[poise::command(slash_command, owners_only)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Bucket name"] name: String,
    #[description = "Where the bucket should live"] location: LocationHint,
) -> Result<(), Error> {
    let bucket = ctx
        .data()
        .cloudflare
        .create_bucket(&name, location.as_str())
        .await?;
    ui::send_embed(ctx, bucket_embed("Bucket created", &bucket)).await
}

/// Delete a bucket.
#[poise::command(slash_command, owners_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Bucket name"] name: String,
) -> Result<(), Error> {
    let name = name.trim();
    let prompt = ui::error_embed(
        "Delete bucket?",
        format!("Bucket **{name}** will be deleted. This cannot be undone."),
    );
    if !ui::confirm(ctx, prompt).await? {
        return Ok(());
    }

    ctx.data().cloudflare.delete_bucket(name).await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Bucket deleted", format!("Bucket **{name}** was deleted.")),
    )
    .await
}

/// Show bucket details.
#[poise::command(slash_command, owners_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Bucket name"] name: String,
) -> Result<(), Error> {
    let bucket = ctx.data().cloudflare.bucket_info(name.trim()).await?;
    ui::send_embed(ctx, bucket_embed("Bucket details", &bucket)).await
}

/// Upload an attachment into a bucket.
#[poise::command(slash_command, owners_only)]
pub async fn stash(
    ctx: Context<'_>,
    #[description = "Bucket name"] bucket: String,
    #[description = "File to upload (max 300 MB)"] file: serenity::Attachment,
    #[description = "Object key (defaults to the file name)"] key: Option<String>,
) -> Result<(), Error> {
    if u64::from(file.size) > MAX_STASH_BYTES {
        return ui::send_error(
            ctx,
            "File too large",
            "The file is too large. Maximum allowed size is 300 MB.",
        )
        .await;
    }

    ctx.defer().await?;
    let key = key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| file.filename.clone());
    let bytes = file.download().await?;
    let size = bytes.len() as u64;

    let object = ctx
        .data()
        .cloudflare
        .stash_object(bucket.trim(), &key, bytes)
        .await?;

    let embed = serenity::CreateEmbed::new()
        .title("Object stashed")
        .color(CLOUDFLARE_COLOR)
        .field("Bucket", bucket.trim(), true)
        .field(
            "Key",
            if object.key.is_empty() { key } else { object.key },
            true,
        )
        .field("Size", format_size(object.size.unwrap_or(size)), true)
        .field("ETag", or_na(object.etag.as_deref()), false);
    ui::send_embed(ctx, embed).await
}

/// Delete an object from a bucket.
#[poise::command(slash_command, owners_only)]
pub async fn recycle(
    ctx: Context<'_>,
    #[description = "Bucket name"] bucket: String,
    #[description = "Object key"] key: String,
) -> Result<(), Error> {
    ctx.data()
        .cloudflare
        .recycle_object(bucket.trim(), key.trim())
        .await?;
    ui::send_embed(
        ctx,
        ui::success_embed(
            "Object recycled",
            format!("`{}` was removed from **{}**.", key.trim(), bucket.trim()),
        ),
    )
    .await
}

/// Download an object (up to 25 MB) into the channel.
#[poise::command(slash_command, owners_only)]
pub async fn fetch(
    ctx: Context<'_>,
    #[description = "Bucket name"] bucket: String,
    #[description = "Object key"] key: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let key = key.trim();
    let bytes = ctx
        .data()
        .cloudflare
        .fetch_object(bucket.trim(), key)
        .await?;

    let filename = key.rsplit('/').next().unwrap_or(key).to_string();
    ctx.send(
        poise::CreateReply::default()
            .content(format!("`{key}` ({})", format_size(bytes.len() as u64)))
            .attachment(serenity::CreateAttachment::bytes(bytes, filename)),
    )
    .await?;
    Ok(())
}
