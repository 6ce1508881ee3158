use crate::config::BrandProfile;
use crate::core::page::PageContext;

/// Whether the page presents itself as the brand.
///
/// Any single weak cue is enough: a missed impersonation defeats the guard,
/// while a false positive only raises scrutiny of the page's destinations.
pub fn looks_like_brand(ctx: &PageContext, profile: &BrandProfile) -> bool {
    ctx.title.to_lowercase().contains(&profile.phrase)
        || ctx.text.to_lowercase().contains(&profile.phrase)
        || ctx.hints.iter().any(|h| h.value.contains(&profile.token))
}
