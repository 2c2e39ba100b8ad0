// Input checks that run before anything is sent to Cloudflare.

use super::cloudflare_service::CloudflareError;
use std::net::IpAddr;

/// Location hints accepted when creating an R2 bucket.
pub const LOCATION_HINTS: [(&str, &str); 5] = [
    ("apac", "Asia-Pacific"),
    ("eeur", "Eastern Europe"),
    ("enam", "Eastern North America"),
    ("weur", "Western Europe"),
    ("wnam", "Western North America"),
];

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Largest attachment `r2 stash` will upload.
pub const MAX_STASH_BYTES: u64 = 300 * 1024 * 1024;

/// Largest object `r2 fetch` will hand back to Discord.
pub const MAX_FETCH_BYTES: u64 = 25 * 1024 * 1024;

/// Which intel query parameter an address belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn query_key(&self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }
}

fn is_non_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xFE00) == 0xFC00
                // fe80::/10 link local
                || (first & 0xFFC0) == 0xFE80
        }
    }
}

/// Parse an address for an intel lookup. Private ranges are refused.
pub fn validate_public_ip(input: &str) -> Result<(IpAddr, IpVersion), CloudflareError> {
    let ip: IpAddr = input
        .trim()
        .parse()
        .map_err(|_| CloudflareError::InvalidInput("Invalid IP address format.".to_string()))?;

    if is_non_public(&ip) {
        return Err(CloudflareError::InvalidInput(
            "The IP address you entered is a local IP address and cannot be queried.".to_string(),
        ));
    }

    let version = match ip {
        IpAddr::V4(_) => IpVersion::V4,
        IpAddr::V6(_) => IpVersion::V6,
    };
    Ok((ip, version))
}

/// Domain intel takes hostnames only.
pub fn validate_domain(input: &str) -> Result<String, CloudflareError> {
    let domain = input.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.parse::<IpAddr>().is_ok() {
        return Err(CloudflareError::InvalidInput(
            "Domain intelligence needs a domain name. Use `/intel ip` for addresses.".to_string(),
        ));
    }
    if domain.is_empty() || !domain.contains('.') || domain.contains('/') {
        return Err(CloudflareError::InvalidInput(format!(
            "`{input}` is not a valid domain."
        )));
    }
    Ok(domain)
}

pub fn validate_location_hint(hint: &str) -> Result<&'static str, CloudflareError> {
    let hint = hint.trim().to_ascii_lowercase();
    LOCATION_HINTS
        .iter()
        .find(|(key, _)| *key == hint)
        .map(|(key, _)| *key)
        .ok_or_else(|| {
            let valid = LOCATION_HINTS
                .iter()
                .map(|(key, name)| format!("`{key}` for {name}"))
                .collect::<Vec<_>>()
                .join(", ");
            CloudflareError::InvalidInput(format!(
                "'{hint}' is not a valid location hint. Valid hints: {valid}"
            ))
        })
}

pub fn validate_image_filename(filename: &str) -> Result<(), CloudflareError> {
    let lower = filename.to_ascii_lowercase();
    let ok = lower
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(CloudflareError::InvalidInput(
            "Please upload a valid image file (png, jpg, jpeg, gif, webp).".to_string(),
        ))
    }
}

/// Words in a message that are explicit http(s) links.
pub fn scannable_urls(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .filter(|word| word.starts_with("http://") || word.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

/// Split a list into fixed-size pages for embeds.
pub fn paginate<T: Clone>(items: &[T], per_page: usize) -> Vec<Vec<T>> {
    items
        .chunks(per_page.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Human readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} bytes")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_ips_are_accepted_with_version() {
        assert_eq!(validate_public_ip("1.1.1.1").unwrap().1, IpVersion::V4);
        assert_eq!(
            validate_public_ip("2606:4700:4700::1111").unwrap().1,
            IpVersion::V6
        );
    }

    #[test]
    fn private_and_garbage_ips_are_rejected() {
        for input in ["10.0.0.1", "192.168.1.20", "127.0.0.1", "100.64.1.1", "fd00::1", "fe80::1"] {
            assert!(validate_public_ip(input).is_err(), "{input} should be refused");
        }
        assert!(validate_public_ip("not-an-ip").is_err());
    }

    #[test]
    fn domain_lookup_refuses_addresses() {
        assert!(validate_domain("8.8.8.8").is_err());
        assert!(validate_domain("localhost").is_err());
        assert_eq!(validate_domain("Example.COM.").unwrap(), "example.com");
    }

    #[test]
    fn location_hints() {
        assert_eq!(validate_location_hint("WEUR").unwrap(), "weur");
        assert!(validate_location_hint("mars").is_err());
    }

    #[test]
    fn only_known_image_types_upload() {
        assert!(validate_image_filename("cat.PNG").is_ok());
        assert!(validate_image_filename("cat.webp").is_ok());
        assert!(validate_image_filename("cat.bmp").is_err());
        assert!(validate_image_filename("png").is_err());
    }

    #[test]
    fn scannable_urls_need_a_scheme() {
        let urls = scannable_urls("look https://a.example http://b.example c.example");
        assert_eq!(urls, vec!["https://a.example", "http://b.example"]);
    }

    #[test]
    fn pages_are_chunked() {
        let pages = paginate(&(1..=23).collect::<Vec<_>>(), 10);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], vec![21, 22, 23]);
        assert!(paginate::<u8>(&[], 10).is_empty());
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(MAX_FETCH_BYTES), "25.00 MB");
    }
}
