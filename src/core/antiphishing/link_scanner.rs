// Link extraction and block-list matching.
//
// Messages are split on whitespace and each token is tested on its own, so a
// link buried in a sentence is still found.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // A scheme may be followed by userinfo; the host is what comes after `@`.
        Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.\-]*://(?:[^\s/@]+@)?)?[\w\-]+(?:\.[\w\-]+)+(?::\d{1,5})?(?:[/?#][\w\-._~:/?#\[\]@!$&'()*+,;=%]*)?$")
            .expect("static URL pattern is valid")
    })
}

/// Remove characters commonly used to break up links and dodge filters.
pub fn strip_zero_width(content: &str) -> String {
    content.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect()
}

fn clean_token(token: &str) -> &str {
    let token = token.trim_start_matches(['<', '(', '[', '"', '\'']);
    let token = token.trim_end_matches(['>', ')', ']', '"', '\'', ',', '.', '!', '?', ';', ':']);
    // Markdown links put the target in parentheses: [text](https://...)
    match token.rfind("](") {
        Some(idx) => &token[idx + 2..],
        None => token,
    }
}

/// Pull every link-looking token out of a message, in order, without duplicates.
pub fn extract_links(content: &str) -> Vec<String> {
    let cleaned = strip_zero_width(content);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for raw in cleaned.split_whitespace() {
        let token = clean_token(raw);
        if token.is_empty() || !url_pattern().is_match(token) {
            continue;
        }
        if seen.insert(token.to_string()) {
            links.push(token.to_string());
        }
    }

    links
}

/// Lowercased host of a link. Links without a scheme are treated as http.
pub fn domain_of(link: &str) -> Option<String> {
    let parsed = if link.contains("://") {
        Url::parse(link).ok()?
    } else {
        Url::parse(&format!("http://{link}")).ok()?
    };

    parsed
        .host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
        .filter(|h| !h.is_empty())
}

/// True if `domain` or one of its parent domains is block-listed.
pub fn is_blocked(domain: &str, blocklist: &HashSet<String>) -> bool {
    if blocklist.contains(domain) {
        return true;
    }

    let mut rest = domain;
    while let Some(idx) = rest.find('.') {
        rest = &rest[idx + 1..];
        // Never match on a bare TLD.
        if !rest.contains('.') {
            break;
        }
        if blocklist.contains(rest) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(domains: &[&str]) -> HashSet<String> {
        domains.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn finds_links_inside_sentences() {
        let links = extract_links("hey check https://steamcommunnity.ru/gift now, it's free");
        assert_eq!(links, vec!["https://steamcommunnity.ru/gift".to_string()]);
    }

    #[test]
    fn zero_width_characters_do_not_hide_links() {
        let links = extract_links("free nitro: https://disc\u{200B}ord-gift.com/claim");
        assert_eq!(links, vec!["https://discord-gift.com/claim".to_string()]);
    }

    #[test]
    fn angle_brackets_and_duplicates_are_handled() {
        let links = extract_links("<https://a.example.com> https://a.example.com");
        assert_eq!(links, vec!["https://a.example.com".to_string()]);
    }

    #[test]
    fn userinfo_does_not_hide_the_real_host() {
        let links = extract_links("claim https://discord.com@evil.com/gift or https://user:pw@evil.com/");
        assert_eq!(
            links,
            vec![
                "https://discord.com@evil.com/gift".to_string(),
                "https://user:pw@evil.com/".to_string(),
            ]
        );
        for link in &links {
            let domain = domain_of(link).unwrap();
            assert_eq!(domain, "evil.com");
            assert!(is_blocked(&domain, &list(&["evil.com"])));
        }
    }

    #[test]
    fn email_addresses_are_not_links() {
        assert!(extract_links("mail me at someone@example.com").is_empty());
    }

    #[test]
    fn plain_words_are_not_links() {
        assert!(extract_links("hello there, nothing to see").is_empty());
    }

    #[test]
    fn schemeless_links_resolve_to_their_host() {
        assert_eq!(
            domain_of("Evil.Example.com/path?x=1"),
            Some("evil.example.com".to_string())
        );
        assert_eq!(
            domain_of("https://evil.example.com:8443/"),
            Some("evil.example.com".to_string())
        );
    }

    #[test]
    fn subdomains_of_listed_domains_are_blocked() {
        let blocklist = list(&["evil.com"]);
        assert!(is_blocked("evil.com", &blocklist));
        assert!(is_blocked("login.evil.com", &blocklist));
        assert!(!is_blocked("notevil.com", &blocklist));
    }

    #[test]
    fn bare_tlds_never_match() {
        let blocklist = list(&["com"]);
        assert!(!is_blocked("example.com", &blocklist));
    }
}
