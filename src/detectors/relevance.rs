use crate::config::BrandProfile;
use crate::core::page::{HintAttr, PageContext};

/// Cheap gate in front of the analyzers: a form must exist and the page must
/// carry at least one brand or form cue.
pub fn should_process(ctx: &PageContext, profile: &BrandProfile) -> bool {
    if ctx.forms.is_empty() {
        return false;
    }
    let url = ctx.url.to_lowercase();
    url_hint(&url, profile)
        || ctx.title.to_lowercase().contains(&profile.phrase)
        || ctx.hints.iter().any(|h| {
            h.image_like
                && matches!(h.attr, HintAttr::Alt | HintAttr::Src)
                && h.value.contains(&profile.token)
        })
}

fn url_hint(url: &str, profile: &BrandProfile) -> bool {
    profile.url_hints.iter().any(|hint| url.contains(hint.as_str()))
}
