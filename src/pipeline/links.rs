use crate::config::BrandProfile;
use crate::core::page::{Anchor, PageContext};
use crate::core::types::{LinkFinding, LinkReason};
use crate::detectors::{is_legitimate_domain, looks_like_brand, patterns};

/// Scan every resolvable anchor on the page.
pub fn analyze_links(ctx: &PageContext, profile: &BrandProfile) -> Vec<LinkFinding> {
    analyze_with_verdict(&ctx.anchors, looks_like_brand(ctx, profile), profile)
}

pub(crate) fn analyze_with_verdict(
    anchors: &[Anchor],
    brand_looking: bool,
    profile: &BrandProfile,
) -> Vec<LinkFinding> {
    let mut findings = Vec::new();
    for anchor in anchors {
        let mut reasons = Vec::new();
        if patterns::is_ip_literal(&anchor.resolved) {
            reasons.push(LinkReason::IpAddress);
        }
        if patterns::has_punycode(&anchor.resolved) {
            reasons.push(LinkReason::Punycode);
        }
        // The destination rule only covers links no pattern rule already caught.
        if reasons.is_empty()
            && brand_looking
            && !patterns::is_fragment_or_script(&anchor.raw_href)
            && !patterns::is_fragment_or_script(&anchor.resolved)
            && !is_legitimate_domain(&anchor.resolved, profile)
        {
            reasons.push(LinkReason::NonBrandDomain);
        }
        findings.extend(reasons.into_iter().map(|reason| LinkFinding {
            anchor: anchor.node,
            url: anchor.resolved.clone(),
            reason,
        }));
    }
    findings
}
