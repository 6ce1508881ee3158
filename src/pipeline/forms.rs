use crate::config::BrandProfile;
use crate::core::page::{FormSnapshot, PageContext};
use crate::core::types::FormAnalysis;
use crate::detectors::{is_legitimate_domain, looks_like_brand, patterns};

/// Run every form rule against one form; rules accumulate independently.
pub fn analyze_form(form: &FormSnapshot, ctx: &PageContext, profile: &BrandProfile) -> FormAnalysis {
    analyze_with_verdict(form, looks_like_brand(ctx, profile), profile)
}

/// Same as [`analyze_form`] with the page-level brand verdict precomputed.
pub(crate) fn analyze_with_verdict(
    form: &FormSnapshot,
    brand_looking: bool,
    profile: &BrandProfile,
) -> FormAnalysis {
    let action = form.action.trim();
    let mut reasons = Vec::new();

    if brand_looking && !action.is_empty() && !is_legitimate_domain(action, profile) {
        reasons.push(format!("brand-looking form submits to non-brand domain: {action}"));
    }
    if patterns::is_ip_literal(action) {
        reasons.push("submits to IP address".to_string());
    }
    if patterns::is_mailto(action) {
        reasons.push("uses mailto action".to_string());
    }
    if patterns::has_punycode(action) {
        reasons.push("action contains punycode".to_string());
    }

    FormAnalysis {
        form: form.node,
        action: action.to_string(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::{Document, ElementSpec};

    fn analyze(title: &str, action: &str) -> FormAnalysis {
        let mut doc = Document::new("https://evil.example/");
        let head = doc.head().unwrap();
        doc.append_spec(head, &ElementSpec::new("title").text(title));
        let body = doc.body();
        doc.append_spec(body, &ElementSpec::new("form").attr("action", action));
        let ctx = PageContext::capture(&doc);
        analyze_form(&ctx.forms[0], &ctx, &BrandProfile::default())
    }

    #[test]
    fn legitimate_brand_form_is_clean() {
        let analysis = analyze(
            "Google Form",
            "https://docs.google.com/forms/d/e/xyz/formResponse",
        );
        assert!(!analysis.suspicious());
    }

    #[test]
    fn mailto_on_unbranded_page() {
        let analysis = analyze("Contact us", "mailto:drop@evil.example");
        assert_eq!(analysis.reasons, vec!["uses mailto action"]);
    }

    #[test]
    fn empty_action_never_flags_brand_rule() {
        let analysis = analyze("Google Form", "");
        assert!(analysis.reasons.is_empty());
    }

    #[test]
    fn relative_action_on_brand_page_flags_destination() {
        let analysis = analyze("Google Form", "collect.php");
        assert_eq!(
            analysis.reasons,
            vec!["brand-looking form submits to non-brand domain: https://evil.example/collect.php"]
        );
    }

    #[test]
    fn rules_accumulate_in_order() {
        let analysis = analyze(
            "Google Form",
            "https://accounts-google-secure.xn--80ak6aa92e.com/submit",
        );
        assert_eq!(analysis.reasons.len(), 2);
        assert!(analysis.reasons[0].starts_with("brand-looking form submits to non-brand domain"));
        assert_eq!(analysis.reasons[1], "action contains punycode");
    }
}
