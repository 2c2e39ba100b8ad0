// Cloudflare slash commands. Management groups are owner-only; lookups are public.

pub mod email_routing;
pub mod hyperdrive;
pub mod images;
pub mod intel;
pub mod r2;
pub mod urlscanner;
pub mod zones;

use crate::core::cloudflare::NamedRef;

pub const CLOUDFLARE_COLOR: u32 = 0xff6633;

/// Display helper for optional API fields.
pub(crate) fn or_na<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

pub(crate) fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "N/A",
    }
}

pub(crate) fn join_names(refs: &[NamedRef]) -> String {
    if refs.is_empty() {
        return "N/A".to_string();
    }
    refs.iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// RFC 3339 timestamps become Discord `<t:..:f>` tags; anything else is shown as-is.
pub(crate) fn timestamp(raw: Option<&str>) -> String {
    match raw.map(chrono::DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => format!("<t:{}:f>", dt.timestamp()),
        Some(Err(_)) => or_na(raw),
        None => "N/A".to_string(),
    }
}

/// Cut `text` to at most `max` characters, ending in "..." when shortened.
pub(crate) fn clip(text: impl Into<String>, max: usize) -> String {
    let text: String = text.into();
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Discord field values are capped at 1024 characters.
pub(crate) fn field_value(text: impl Into<String>) -> String {
    clip(text, 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_values_render_as_na() {
        assert_eq!(or_na(None::<String>), "N/A");
        assert_eq!(or_na(Some(String::new())), "N/A");
        assert_eq!(or_na(Some(42)), "42");
    }

    #[test]
    fn names_are_joined() {
        let refs = vec![
            NamedRef { id: None, name: "Phishing".into() },
            NamedRef { id: None, name: "Malware".into() },
        ];
        assert_eq!(join_names(&refs), "Phishing, Malware");
        assert_eq!(join_names(&[]), "N/A");
    }

    #[test]
    fn rfc3339_dates_become_discord_timestamps() {
        assert_eq!(timestamp(Some("2024-01-01T00:00:00Z")), "<t:1704067200:f>");
        assert_eq!(timestamp(Some("2024-01-01")), "2024-01-01");
        assert_eq!(timestamp(None), "N/A");
    }

    #[test]
    fn long_field_values_are_truncated() {
        let long = "x".repeat(2000);
        let value = field_value(long);
        assert_eq!(value.chars().count(), 1024);
        assert!(value.ends_with("..."));
    }
}
