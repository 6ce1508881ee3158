use once_cell::sync::Lazy;
use regex::Regex;

static IP_ORIGIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://(?:[^/?#@]*@)?\d{1,3}(?:\.\d{1,3}){3}(?::\d+)?(?:[/?#]|$)")
        .expect("ip origin pattern")
});

/// URL whose origin is a dotted IPv4 literal.
pub fn is_ip_literal(url: &str) -> bool {
    IP_ORIGIN.is_match(url.trim())
}

pub fn is_mailto(url: &str) -> bool {
    has_scheme(url, "mailto")
}

/// ACE-encoded (`xn--`) label anywhere in the URL.
pub fn has_punycode(url: &str) -> bool {
    url.to_ascii_lowercase().contains("xn--")
}

/// In-page fragments and `javascript:` pseudo-links never leave the page.
pub fn is_fragment_or_script(raw_href: &str) -> bool {
    raw_href.trim_start().starts_with('#') || has_scheme(raw_href, "javascript")
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    url.trim_start()
        .split_once(':')
        .is_some_and(|(s, _)| s.trim().eq_ignore_ascii_case(scheme))
}
