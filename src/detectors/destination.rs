use url::Url;

use crate::config::BrandProfile;

/// Whether `url` points at one of the brand's own domains.
///
/// Unparsable input and host-less URLs (`mailto:`, `data:`) are never
/// legitimate. Allowlist entries match as hostname substrings.
pub fn is_legitimate_domain(url: &str, profile: &BrandProfile) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    profile
        .legitimate_domains
        .iter()
        .any(|domain| host.contains(domain.as_str()))
}
