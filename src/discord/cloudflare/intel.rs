// `/intel` - Cloudflare threat intelligence lookups.

use super::{field_value, join_names, or_na, timestamp, CLOUDFLARE_COLOR};
use crate::core::cloudflare::validation::paginate;
use crate::core::cloudflare::{Categorization, DomainIntel};
use crate::discord::ui::{self, ERROR_COLOR, SUCCESS_COLOR};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Look up domains, IPs and networks.
#[poise::command(
    slash_command,
    subcommands("whois", "domain", "ip", "domainhistory", "asn", "subnets")
)]
pub async fn intel(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Registration details for a domain.
#[poise::command(slash_command)]
pub async fn whois(
    ctx: Context<'_>,
    #[description = "Domain to look up"] domain: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let record = ctx.data().cloudflare.whois(&domain).await?;

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("WHOIS: {}", record.domain.as_deref().unwrap_or(domain.trim())))
        .color(CLOUDFLARE_COLOR)
        .field("Registrar", or_na(record.registrar.as_deref()), true)
        .field("Created", timestamp(record.created_date.as_deref()), true)
        .field("Updated", timestamp(record.updated_date.as_deref()), true)
        .field("Expires", timestamp(record.expiration_date.as_deref()), true)
        .field("DNSSEC", super::yes_no(record.dnssec), true)
        .field("WHOIS server", or_na(record.whois_server.as_deref()), true);

    if !record.nameservers.is_empty() {
        embed = embed.field("Nameservers", field_value(record.nameservers.join("\n")), false);
    }
    if !record.status.is_empty() {
        embed = embed.field("Status", field_value(record.status.join("\n")), false);
    }
    if let Some(email) = record.registrar_email.as_deref() {
        embed = embed.field("Abuse email", email, true);
    }
    if let Some(phone) = record.registrar_phone.as_deref() {
        embed = embed.field("Abuse phone", phone, true);
    }
    ui::send_embed(ctx, embed).await
}

fn domain_embed(intel: &DomainIntel, on_blocklist: bool) -> serenity::CreateEmbed {
    let color = if on_blocklist || !intel.risk_types.is_empty() {
        ERROR_COLOR
    } else {
        SUCCESS_COLOR
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Domain intelligence: {}", intel.domain))
        .color(color)
        .field("Risk score", or_na(intel.risk_score), true)
        .field("Popularity rank", or_na(intel.popularity_rank), true)
        .field(
            "On BeeHive block-list",
            if on_blocklist { "Yes" } else { "No" },
            true,
        )
        .field(
            "Application",
            or_na(intel.application.as_ref().map(|a| a.name.clone())),
            true,
        )
        .field("Content categories", field_value(join_names(&intel.content_categories)), false)
        .field("Risk types", field_value(join_names(&intel.risk_types)), false);

    if let Some(parent) = intel.inherited_from.as_deref() {
        embed = embed
            .field("Inherited from", parent, true)
            .field(
                "Inherited categories",
                field_value(join_names(&intel.inherited_content_categories)),
                false,
            )
            .field(
                "Inherited risk types",
                field_value(join_names(&intel.inherited_risk_types)),
                false,
            );
    }
    if let Some(family) = intel
        .additional_information
        .as_ref()
        .and_then(|info| info.suspected_malware_family.as_deref())
        .filter(|f| !f.is_empty())
    {
        embed = embed.field("Suspected malware family", family, false);
    }
    if !intel.resolves_to_refs.is_empty() {
        let ips = intel
            .resolves_to_refs
            .iter()
            .map(|r| r.value.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Resolves to", field_value(ips), false);
    }
    embed
}

/// Reputation and categories for a domain.
#[poise::command(slash_command)]
pub async fn domain(
    ctx: Context<'_>,
    #[description = "Domain to look up"] domain: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let intel = ctx.data().cloudflare.domain_intel(&domain).await?;
    let on_blocklist = ctx.data().phishing.is_domain_blocked(&intel.domain).await;
    ui::send_embed(ctx, domain_embed(&intel, on_blocklist)).await
}

/// Ownership and risk for a public IP address.
#[poise::command(slash_command)]
pub async fn ip(
    ctx: Context<'_>,
    #[description = "IPv4 or IPv6 address"] ip: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let intel = ctx.data().cloudflare.ip_intel(&ip).await?;
    let owner = intel.belongs_to_ref.clone().unwrap_or_default();

    let ptr = match &intel.ptr_lookup {
        Some(serde_json::Value::Object(map)) => map
            .get("ptr_domains")
            .and_then(|v| v.as_array())
            .map(|domains| {
                domains
                    .iter()
                    .filter_map(|d| d.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|s| !s.is_empty()),
        _ => None,
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("IP intelligence: {}", intel.ip))
        .color(if intel.risk_types.is_empty() {
            CLOUDFLARE_COLOR
        } else {
            ERROR_COLOR
        })
        .field("Owner", or_na(owner.description.as_deref()), true)
        .field("Country", or_na(owner.country.as_deref()), true)
        .field("Type", or_na(owner.kind.as_deref()), true)
        .field("Risk types", field_value(join_names(&intel.risk_types)), false)
        .field("PTR", field_value(or_na(ptr)), false);
    ui::send_embed(ctx, embed).await
}

fn categorization_line(cat: &Categorization) -> String {
    format!(
        "**{} → {}**\n{}",
        or_na(cat.start.as_deref()),
        or_na(cat.end.as_deref()),
        join_names(&cat.categories)
    )
}

/// How a domain has been categorized over time.
#[poise::command(slash_command)]
pub async fn domainhistory(
    ctx: Context<'_>,
    #[description = "Domain to look up"] domain: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let history = ctx.data().cloudflare.domain_history(&domain).await?;
    if history.categorizations.is_empty() {
        return ui::send_embed(
            ctx,
            ui::error_embed("No history", "No categorization history was found for that domain."),
        )
        .await;
    }

    let pages = paginate(&history.categorizations, 5)
        .into_iter()
        .map(|page| {
            let body = page
                .iter()
                .map(categorization_line)
                .collect::<Vec<_>>()
                .join("\n\n");
            serenity::CreateEmbed::new()
                .title(format!("Domain history: {}", history.domain))
                .description(body)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

/// Details about an autonomous system.
#[poise::command(slash_command)]
pub async fn asn(
    ctx: Context<'_>,
    #[description = "AS number"] asn: u64,
) -> Result<(), Error> {
    ctx.defer().await?;
    let info = ctx.data().cloudflare.asn(asn).await?;
    let embed = serenity::CreateEmbed::new()
        .title(format!("AS{}", if info.asn == 0 { asn } else { info.asn }))
        .color(CLOUDFLARE_COLOR)
        .field("Description", or_na(info.description.as_deref()), false)
        .field("Country", or_na(info.country.as_deref()), true)
        .field("Type", or_na(info.kind.as_deref()), true)
        .field("Risk score", or_na(info.risk_score), true);
    ui::send_embed(ctx, embed).await
}

/// Subnets announced by an autonomous system.
#[poise::command(slash_command)]
pub async fn subnets(
    ctx: Context<'_>,
    #[description = "AS number"] asn: u64,
) -> Result<(), Error> {
    ctx.defer().await?;
    let result = ctx.data().cloudflare.asn_subnets(asn).await?;
    if result.subnets.is_empty() {
        return ui::send_embed(ctx, ui::error_embed("No subnets", "No subnets were found for that ASN.")).await;
    }
    let total_ips = or_na(result.ip_count_total);

    let pages = paginate(&result.subnets, 10)
        .into_iter()
        .map(|page| {
            serenity::CreateEmbed::new()
                .title(format!("Subnets for AS{asn}"))
                .description(page.join("\n"))
                .field("Total IPs", total_ips.clone(), true)
                .color(CLOUDFLARE_COLOR)
        })
        .collect();
    ui::paginate(ctx, pages).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloudflare::NamedRef;

    #[test]
    fn categorization_shows_range_and_names() {
        let cat = Categorization {
            categories: vec![NamedRef { id: None, name: "Technology".into() }],
            start: Some("2023-01-01".into()),
            end: None,
        };
        assert_eq!(categorization_line(&cat), "**2023-01-01 → N/A**\nTechnology");
    }
}
