// `/emailrouting` - destination addresses, zone settings and forwarding rules.

use super::{or_na, timestamp, yes_no, CLOUDFLARE_COLOR};
use crate::core::cloudflare::validation::paginate;
use crate::core::cloudflare::{EmailRoutingSettings, EmailRule};
use crate::discord::ui;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage Cloudflare Email Routing.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("list", "add", "remove", "settings", "enable", "disable", "dns", "rules")
)]
pub async fn emailrouting(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// List destination addresses.
#[poise::command(slash_command, owners_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let addresses = ctx.data().cloudflare.list_email_addresses().await?;
    if addresses.is_empty() {
        return ui::send_embed(
            ctx,
            ui::error_embed("No addresses", "No destination addresses were found."),
        )
        .await;
    }

    let pages = paginate(&addresses, 10)
        .into_iter()
        .map(|page| {
            let body = page
                .iter()
                .map(|a| {
                    let state = if a.verified.is_some() { "verified" } else { "pending" };
                    format!("**{}** ({state})\n`{}`", a.email, a.id)
                })
                .collect::<Vec<_>>()
                .join("\n");
            serenity::CreateEmbed::new()
                .title("Destination addresses")
                .description(body)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Add a destination address. Cloudflare emails it a verification link.
#[poise::command(slash_command, owners_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Email address"] email: String,
) -> Result<(), Error> {
    let address = ctx.data().cloudflare.add_email_address(&email).await?;
    ui::send_embed(
        ctx,
        ui::success_embed(
            "Address added",
            format!(
                "**{}** was added. Check its inbox for a verification email.",
                address.email
            ),
        ),
    )
    .await
}

/// Remove a destination address.
#[poise::command(slash_command, owners_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Email address"] email: String,
) -> Result<(), Error> {
    let address = ctx.data().cloudflare.find_email_address(&email).await?;

    let prompt = ui::error_embed(
        "Remove address?",
        format!("Mail will no longer be forwarded to **{}**.", address.email),
    );
    if !ui::confirm(ctx, prompt).await? {
        return Ok(());
    }

    ctx.data()
        .cloudflare
        .remove_email_address(&address.id)
        .await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Address removed", format!("**{}** was removed.", address.email)),
    )
    .await
}

fn settings_embed(title: &str, settings: &EmailRoutingSettings) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .color(CLOUDFLARE_COLOR)
        .field("Zone", or_na(settings.name.as_deref()), true)
        .field("Enabled", yes_no(settings.enabled), true)
        .field("Status", or_na(settings.status.as_deref()), true)
        .field("Created", timestamp(settings.created.as_deref()), true)
        .field("Modified", timestamp(settings.modified.as_deref()), true)
}

/// Show Email Routing settings for the zone.
#[poise::command(slash_command, owners_only)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let settings = ctx.data().cloudflare.email_routing_settings().await?;
    ui::send_embed(ctx, settings_embed("Email Routing", &settings)).await
}

/// Enable Email Routing for the zone.
#[poise::command(slash_command, owners_only)]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    toggle(ctx, true).await
}

/// Disable Email Routing for the zone.
#[poise::command(slash_command, owners_only)]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    toggle(ctx, false).await
}

async fn toggle(ctx: Context<'_>, enabled: bool) -> Result<(), Error> {
    let prompt = if enabled {
        ui::error_embed(
            "Enable Email Routing?",
            "Cloudflare will add the MX and TXT records it needs to the zone.",
        )
    } else {
        ui::error_embed(
            "Disable Email Routing?",
            "Mail sent to this zone will stop being forwarded.",
        )
    };
    if !ui::confirm(ctx, prompt).await? {
        return Ok(());
    }

    let settings = ctx.data().cloudflare.set_email_routing(enabled).await?;
    let title = if enabled {
        "Email Routing enabled"
    } else {
        "Email Routing disabled"
    };
    ui::send_embed(ctx, settings_embed(title, &settings)).await
}

/// Show the DNS records Email Routing needs.
#[poise::command(slash_command, owners_only)]
pub async fn dns(ctx: Context<'_>) -> Result<(), Error> {
    let records = ctx.data().cloudflare.email_routing_dns().await?;
    if records.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No records", "No DNS records are required.")).await;
    }

    let embed = records.iter().take(25).fold(
        serenity::CreateEmbed::new()
            .title("Email Routing DNS records")
            .color(CLOUDFLARE_COLOR),
        |embed, record| {
            let priority = record
                .priority
                .map(|p| format!("\nPriority: {p}"))
                .unwrap_or_default();
            embed.field(
                format!("{} {}", record.kind, record.name),
                format!("`{}`{priority}", record.content),
                false,
            )
        },
    );
    ui::send_embed(ctx, embed).await
}

/// Manage forwarding rules.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("rules_list", "rules_add", "rules_remove")
)]
pub async fn rules(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

fn rule_line(rule: &EmailRule) -> String {
    let matchers = rule
        .matchers
        .iter()
        .map(|m| match (&m.field, &m.value) {
            (Some(field), Some(value)) => format!("{field} = {value}"),
            _ => m.kind.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let actions = rule
        .actions
        .iter()
        .map(|a| format!("{} {}", a.kind, a.value.join(", ")))
        .collect::<Vec<_>>()
        .join(", ");
    let state = if rule.enabled.unwrap_or(false) { "on" } else { "off" };

    format!(
        "**{}** ({state})\n`{}`\n{} → {}",
        rule.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Unnamed rule"),
        rule.id,
        if matchers.is_empty() { "N/A".to_string() } else { matchers },
        if actions.is_empty() { "N/A".to_string() } else { actions },
    )
}

/// List forwarding rules.
#[poise::command(slash_command, owners_only, rename = "list")]
pub async fn rules_list(ctx: Context<'_>) -> Result<(), Error> {
    let rules = ctx.data().cloudflare.list_email_rules().await?;
    if rules.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No rules", "No routing rules were found.")).await;
    }

    let pages = paginate(&rules, 5)
        .into_iter()
        .map(|page| {
            let body = page.iter().map(rule_line).collect::<Vec<_>>().join("\n\n");
            serenity::CreateEmbed::new()
                .title("Email routing rules")
                .description(body)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Forward mail sent to one address on to another.
#[poise::command(slash_command, owners_only, rename = "add")]
pub async fn rules_add(
    ctx: Context<'_>,
    #[description = "Address on your zone that receives mail"] source: String,
    #[description = "Verified destination address"] destination: String,
) -> Result<(), Error> {
    let rule = ctx
        .data()
        .cloudflare
        .add_email_rule(&source, &destination)
        .await?;
    let embed = ui::success_embed("Rule created", rule_line(&rule));
    ui::send_embed(ctx, embed).await
}

/// Delete a forwarding rule.
#[poise::command(slash_command, owners_only, rename = "remove")]
pub async fn rules_remove(
    ctx: Context<'_>,
    #[description = "Rule id"] rule_id: String,
) -> Result<(), Error> {
    let rule_id = rule_id.trim();
    ctx.data().cloudflare.remove_email_rule(rule_id).await?;
    ui::send_embed(
        ctx,
        ui::success_embed("Rule removed", format!("Rule `{rule_id}` was removed.")),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloudflare::{RuleAction, RuleMatcher};

    #[test]
    fn rule_line_shows_matchers_and_actions() {
        let rule = EmailRule {
            id: "r1".into(),
            name: Some("Forward support".into()),
            enabled: Some(true),
            matchers: vec![RuleMatcher {
                kind: "literal".into(),
                field: Some("to".into()),
                value: Some("support@bee.example".into()),
            }],
            actions: vec![RuleAction {
                kind: "forward".into(),
                value: vec!["me@mail.example".into()],
            }],
            ..Default::default()
        };
        assert_eq!(
            rule_line(&rule),
            "**Forward support** (on)\n`r1`\nto = support@bee.example → forward me@mail.example"
        );
    }
}
