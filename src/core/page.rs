use url::Url;

use crate::core::dom::{Document, NodeId};

const IMAGE_TAGS: &[&str] = &["img", "svg", "image", "picture"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintAttr {
    Alt,
    Src,
    Class,
}

impl HintAttr {
    fn name(self) -> &'static str {
        match self {
            HintAttr::Alt => "alt",
            HintAttr::Src => "src",
            HintAttr::Class => "class",
        }
    }
}

/// An attribute value that may carry a brand cue.
#[derive(Debug, Clone)]
pub struct AttributeHint {
    pub attr: HintAttr,
    /// Lowercased attribute value.
    pub value: String,
    pub image_like: bool,
}

#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub node: NodeId,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct Anchor {
    pub node: NodeId,
    pub raw_href: String,
    pub resolved: String,
}

/// Everything the detectors read from the page in one pass.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    pub text: String,
    pub forms: Vec<FormSnapshot>,
    pub hints: Vec<AttributeHint>,
    pub anchors: Vec<Anchor>,
}

impl PageContext {
    pub fn capture(doc: &Document) -> Self {
        let base = Url::parse(doc.url()).ok();
        let mut forms = Vec::new();
        let mut hints = Vec::new();
        let mut anchors = Vec::new();

        for node in doc.elements() {
            let tag = doc.tag(node).unwrap_or_default();
            let image_like = IMAGE_TAGS.contains(&tag)
                || (tag == "input"
                    && doc
                        .attr(node, "type")
                        .is_some_and(|t| t.eq_ignore_ascii_case("image")));
            for attr in [HintAttr::Alt, HintAttr::Src, HintAttr::Class] {
                if let Some(value) = doc.attr(node, attr.name()) {
                    if !value.is_empty() {
                        hints.push(AttributeHint {
                            attr,
                            value: value.to_lowercase(),
                            image_like,
                        });
                    }
                }
            }

            match tag {
                "form" => forms.push(FormSnapshot {
                    node,
                    action: resolve_action(base.as_ref(), doc.attr(node, "action")),
                }),
                "a" => {
                    if let Some(raw) = doc.attr(node, "href") {
                        if let Some(resolved) = resolve_href(base.as_ref(), raw) {
                            anchors.push(Anchor {
                                node,
                                raw_href: raw.trim().to_string(),
                                resolved,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            url: doc.url().to_string(),
            title: doc.title(),
            text: doc.visible_text(),
            forms,
            hints,
            anchors,
        }
    }
}

/// Submission target as the browser would report it. Empty stays empty,
/// relative targets are joined against the page URL.
pub fn resolve_action(base: Option<&Url>, raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return String::new();
    }
    match Url::parse(raw) {
        Ok(url) => url.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .and_then(|b| b.join(raw).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

fn resolve_href(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(raw).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::ElementSpec;

    #[test]
    fn relative_actions_resolve_against_page() {
        let base = Url::parse("https://evil.example/a/login").ok();
        assert_eq!(
            resolve_action(base.as_ref(), Some("collect.php")),
            "https://evil.example/a/collect.php"
        );
        assert_eq!(resolve_action(base.as_ref(), Some("  ")), "");
        assert_eq!(resolve_action(base.as_ref(), None), "");
        assert_eq!(
            resolve_action(base.as_ref(), Some("mailto:drop@evil.example")),
            "mailto:drop@evil.example"
        );
    }

    #[test]
    fn capture_collects_hints_and_anchors() {
        let mut doc = Document::new("https://evil.example/");
        let body = doc.body();
        doc.append_spec(body, &ElementSpec::new("img").attr("alt", "Google Logo"));
        doc.append_spec(body, &ElementSpec::new("div").attr("class", "Card"));
        doc.append_spec(body, &ElementSpec::new("a").attr("href", "/next"));
        doc.append_spec(body, &ElementSpec::new("a").attr("href", "http://[bad"));
        doc.append_spec(body, &ElementSpec::new("form"));

        let ctx = PageContext::capture(&doc);
        assert_eq!(ctx.forms.len(), 1);
        assert_eq!(ctx.forms[0].action, "");
        assert_eq!(ctx.anchors.len(), 1);
        assert_eq!(ctx.anchors[0].resolved, "https://evil.example/next");
        assert!(ctx
            .hints
            .iter()
            .any(|h| h.image_like && h.attr == HintAttr::Alt && h.value == "google logo"));
        assert!(ctx.hints.iter().any(|h| !h.image_like && h.value == "card"));
    }
}
