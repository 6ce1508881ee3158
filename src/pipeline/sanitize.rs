//! Text sanitizers for content rendered into the warning banner.

/// Turns untrusted text into markup-safe text.
pub trait Sanitize: Send {
    fn name(&self) -> &'static str;
    fn sanitize(&self, text: &str) -> String;
}

/// Escapes the five markup-significant characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscapeSanitizer;

impl Sanitize for EscapeSanitizer {
    fn name(&self) -> &'static str {
        "escape"
    }

    fn sanitize(&self, text: &str) -> String {
        escape_html(text)
    }
}

/// Parses the text as an HTML fragment, keeps only its text, then escapes it.
#[cfg(feature = "html")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FragmentSanitizer;

#[cfg(feature = "html")]
impl Sanitize for FragmentSanitizer {
    fn name(&self) -> &'static str {
        "html-fragment"
    }

    fn sanitize(&self, text: &str) -> String {
        let fragment = scraper::Html::parse_fragment(text);
        let plain: String = fragment.root_element().text().collect();
        escape_html(&plain)
    }
}

/// Pick the strongest sanitizer compiled into this build.
pub fn detect() -> Box<dyn Sanitize> {
    #[cfg(feature = "html")]
    {
        Box::new(FragmentSanitizer)
    }
    #[cfg(not(feature = "html"))]
    {
        Box::new(EscapeSanitizer)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
