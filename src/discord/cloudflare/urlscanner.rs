// `/urlscanner` - Cloudflare URL scanner, plus the opt-in auto-scan listener.

use super::{clip, join_names, or_na, CLOUDFLARE_COLOR};
use crate::core::cloudflare::validation::{paginate, scannable_urls};
use crate::core::cloudflare::{ScanReport, ScanSubmission};
use crate::discord::ui::{self, ERROR_COLOR, SUCCESS_COLOR};
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Embed titles are capped at 256 characters.
fn search_title(query: &str) -> String {
    format!("Scans matching {}", clip(query.trim(), 200))
}

fn autoscan_reply(was_enabled: bool, enabled: bool) -> (&'static str, &'static str) {
    match (was_enabled, enabled) {
        (true, true) => ("No change", "Automatic link scanning is already **enabled**."),
        (false, false) => ("No change", "Automatic link scanning is already **disabled**."),
        (_, true) => (
            "Settings changed",
            "Links posted in this server will now be scanned automatically. Malicious ones are removed.",
        ),
        (_, false) => ("Settings changed", "Automatic link scanning is now **disabled**."),
    }
}

fn report_embed(scan_id: &str, report: &ScanReport) -> serenity::CreateEmbed {
    let verdict = &report.verdicts.overall;
    let (title, color) = if verdict.malicious {
        ("Scan result: Malicious", ERROR_COLOR)
    } else {
        ("Scan result: No detections", SUCCESS_COLOR)
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(color)
        .field("URL", or_na(Some(report.task.url.as_str())), false)
        .field(
            "Effective URL",
            or_na(report.task.effective_url.as_deref()),
            false,
        )
        .field("Categories", join_names(&verdict.categories), true)
        .field("Scanned from", or_na(report.task.country.as_deref()), true)
        .field("Scan ID", format!("`{scan_id}`"), false);

    if !verdict.phishing.is_empty() {
        embed = embed.field("Phishing targets", verdict.phishing.join(", "), false);
    }
    embed
}

fn submission_embed(submission: &ScanSubmission) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Scan submitted")
        .color(CLOUDFLARE_COLOR)
        .field("Scan ID", format!("`{}`", submission.uuid), false)
        .field("URL", or_na(submission.url.as_deref()), false)
        .field("Visibility", or_na(submission.visibility.as_deref()), true)
}

/// Scan URLs with Cloudflare Radar.
#[poise::command(
    slash_command,
    subcommands("search", "create", "results", "har", "screenshot", "scan", "autoscan")
)]
pub async fn urlscanner(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Search previous scans.
#[poise::command(slash_command)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "Search query, e.g. a domain"] query: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let tasks = ctx.data().cloudflare.search_scans(&query).await?;
    if tasks.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No results", "No scans matched your query.")).await;
    }

    let pages = paginate(&tasks, 5)
        .into_iter()
        .map(|page| {
            let body = page
                .iter()
                .map(|task| {
                    format!(
                        "**{}**\n`{}` · {} · {}",
                        task.url,
                        task.uuid,
                        or_na(task.time.as_deref()),
                        or_na(task.status.as_deref())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            serenity::CreateEmbed::new()
                .title(search_title(&query))
                .description(body)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Submit a URL for scanning without waiting for the result.
#[poise::command(slash_command)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "URL to scan"] url: String,
) -> Result<(), Error> {
    let submission = ctx.data().cloudflare.submit_scan(&url).await?;
    ctx.send(
        poise::CreateReply::default()
            .embed(submission_embed(&submission))
            .components(vec![ui::link_button(
                "View on Radar",
                ScanReport::radar_url(&submission.uuid),
            )]),
    )
    .await?;
    Ok(())
}

/// Fetch the report for a finished scan.
#[poise::command(slash_command)]
pub async fn results(
    ctx: Context<'_>,
    #[description = "Scan ID"] scan_id: String,
) -> Result<(), Error> {
    let scan_id = scan_id.trim();
    let report = ctx.data().cloudflare.scan_report(scan_id).await?;
    ctx.send(
        poise::CreateReply::default()
            .embed(report_embed(scan_id, &report))
            .components(vec![ui::link_button("View on Radar", ScanReport::radar_url(scan_id))]),
    )
    .await?;
    Ok(())
}

/// Download the HAR capture of a scan.
#[poise::command(slash_command)]
pub async fn har(
    ctx: Context<'_>,
    #[description = "Scan ID"] scan_id: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let scan_id = scan_id.trim();
    let har = ctx.data().cloudflare.scan_har(scan_id).await?;
    let bytes = serde_json::to_vec_pretty(&har)?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!("HAR for scan `{scan_id}`"))
            .attachment(serenity::CreateAttachment::bytes(bytes, format!("{scan_id}.har.json"))),
    )
    .await?;
    Ok(())
}

/// Download the screenshot taken during a scan.
#[poise::command(slash_command)]
pub async fn screenshot(
    ctx: Context<'_>,
    #[description = "Scan ID"] scan_id: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let scan_id = scan_id.trim();
    let png = ctx.data().cloudflare.scan_screenshot(scan_id).await?;
    let filename = format!("{scan_id}.png");

    let embed = serenity::CreateEmbed::new()
        .title("Scan screenshot")
        .color(CLOUDFLARE_COLOR)
        .attachment(&filename);
    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .attachment(serenity::CreateAttachment::bytes(png, filename)),
    )
    .await?;
    Ok(())
}

/// Submit a URL and wait for the verdict.
#[poise::command(slash_command)]
pub async fn scan(
    ctx: Context<'_>,
    #[description = "URL to scan"] url: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let cloudflare = &ctx.data().cloudflare;
    let submission = cloudflare.submit_scan(&url).await?;
    let report = cloudflare.wait_for_scan(&submission.uuid).await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(report_embed(&submission.uuid, &report))
            .components(vec![ui::link_button(
                "View on Radar",
                ScanReport::radar_url(&submission.uuid),
            )]),
    )
    .await?;
    Ok(())
}

/// Scan every link posted in this server automatically.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn autoscan(
    ctx: Context<'_>,
    #[description = "Enable or disable auto-scanning"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let cloudflare = &ctx.data().cloudflare;
    let was_enabled = cloudflare.autoscan_enabled(guild_id).await?;
    if was_enabled != enabled {
        cloudflare.set_autoscan(guild_id, enabled).await?;
    }

    let (title, description) = autoscan_reply(was_enabled, enabled);
    ui::send_embed(ctx, ui::success_embed(title, description)).await
}

/// Scan the links in a guild message in the background and remove the
/// message if any of them is malicious.
pub fn spawn_autoscan(ctx: &serenity::Context, msg: &serenity::Message, data: &Data) {
    let Some(guild_id) = msg.guild_id else {
        return;
    };
    if msg.author.bot || scannable_urls(&msg.content).is_empty() {
        return;
    }

    let cloudflare = Arc::clone(&data.cloudflare);
    let http = ctx.http.clone();
    let channel_id = msg.channel_id;
    let message_id = msg.id;
    let author_id = msg.author.id;
    let content = msg.content.clone();

    tokio::spawn(async move {
        let flagged = match cloudflare.autoscan_message(guild_id.get(), &content).await {
            Ok(Some(url)) => url,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(guild_id = guild_id.get(), "Auto-scan failed: {}", e);
                return;
            }
        };

        if let Err(e) = channel_id.delete_message(&http, message_id).await {
            tracing::warn!(guild_id = guild_id.get(), "Failed to delete flagged message: {}", e);
            return;
        }

        let embed = serenity::CreateEmbed::new()
            .title("Malicious link removed")
            .description(format!(
                "A message from <@{author_id}> was removed because Cloudflare flagged one of its links as malicious."
            ))
            .field("URL", format!("`{flagged}`"), false)
            .color(ERROR_COLOR);
        if let Err(e) = channel_id
            .send_message(&http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(guild_id = guild_id.get(), "Failed to send auto-scan notice: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_queries_keep_the_title_within_discord_limits() {
        let title = search_title(&"a".repeat(500));
        assert!(title.chars().count() <= 256);
        assert!(title.ends_with("..."));
        assert_eq!(search_title("  example.com "), "Scans matching example.com");
    }

    #[test]
    fn autoscan_reply_reports_when_nothing_changed() {
        assert_eq!(autoscan_reply(true, true).0, "No change");
        assert_eq!(autoscan_reply(false, false).0, "No change");
        assert_eq!(autoscan_reply(false, true).0, "Settings changed");
        assert!(autoscan_reply(true, false).1.contains("now **disabled**"));
    }
}
