use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::dom::{Document, NodeId};
use crate::pipeline::sanitize::Sanitize;

pub const BANNER_ID: &str = "formguard-banner";
const OVERRIDE_LABEL: &str = "Ignore and submit anyway";
const OVERRIDE_CONSUMED_LABEL: &str = "Submission allowed";
const DISMISS_LABEL: &str = "Dismiss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerControl {
    Override,
    Dismiss,
}

#[derive(Debug)]
struct Banner {
    node: NodeId,
    message: NodeId,
    override_button: NodeId,
    forms: Vec<NodeId>,
    override_consumed: bool,
}

/// Owns the page's single warning banner.
pub struct WarningPresenter {
    brand_name: String,
    sanitizer: Box<dyn Sanitize>,
    banner: Option<Banner>,
}

impl WarningPresenter {
    pub fn new(brand_name: impl Into<String>, sanitizer: Box<dyn Sanitize>) -> Self {
        Self {
            brand_name: brand_name.into(),
            sanitizer,
            banner: None,
        }
    }

    pub fn banner_node(&self) -> Option<NodeId> {
        self.banner.as_ref().map(|b| b.node)
    }

    pub fn override_button(&self) -> Option<NodeId> {
        self.banner.as_ref().map(|b| b.override_button)
    }

    pub fn guarded_forms(&self) -> &[NodeId] {
        self.banner.as_ref().map(|b| b.forms.as_slice()).unwrap_or(&[])
    }

    /// Attach `form` to the banner, creating one if none is usable.
    /// Returns true when a new banner element was inserted.
    pub fn show(&mut self, doc: &mut Document, form: NodeId, reasons: &[String]) -> bool {
        if let Some(banner) = self.banner.as_mut() {
            if !banner.override_consumed && doc.is_connected(banner.node) {
                if !banner.forms.contains(&form) {
                    banner.forms.push(form);
                }
                if !reasons.is_empty() {
                    let extra = format!(" <em>{}</em>", self.sanitizer.sanitize(&reasons.join("; ")));
                    let extra = doc.create_markup(extra);
                    doc.append_child(banner.message, extra);
                }
                debug!("banner already showing; {form} joins it");
                return false;
            }
            doc.remove(banner.node);
        }
        let banner = self.render(doc, form, reasons);
        info!("warning banner shown for {form}");
        self.banner = Some(banner);
        true
    }

    fn render(&self, doc: &mut Document, form: NodeId, reasons: &[String]) -> Banner {
        let node = doc.create_element("div");
        doc.set_attr(node, "id", BANNER_ID);
        doc.set_attr(node, "role", "alert");

        let message = doc.create_element("p");
        let markup = format!(
            "<strong>Possible phishing page.</strong> This page looks like {} but its form sends data elsewhere, so submission was blocked. <em>{}</em>",
            self.sanitizer.sanitize(&self.brand_name),
            self.sanitizer.sanitize(&reasons.join("; ")),
        );
        let markup = doc.create_markup(markup);
        doc.append_child(message, markup);
        doc.append_child(node, message);

        let override_button = control_button(doc, BannerControl::Override, OVERRIDE_LABEL);
        let dismiss_button = control_button(doc, BannerControl::Dismiss, DISMISS_LABEL);
        doc.append_child(node, override_button);
        doc.append_child(node, dismiss_button);

        let body = doc.body();
        doc.prepend_child(body, node);

        Banner {
            node,
            message,
            override_button,
            forms: vec![form],
            override_consumed: false,
        }
    }

    /// Put `forms` under the live banner's override, skipping ones it
    /// already guards. Used to carry forms over from a dismissed banner.
    pub fn adopt(&mut self, forms: &[NodeId]) {
        let Some(banner) = self.banner.as_mut() else {
            return;
        };
        if banner.override_consumed {
            return;
        }
        for form in forms {
            if !banner.forms.contains(form) {
                banner.forms.push(*form);
            }
        }
    }

    /// Consume the override control. The first call returns the forms the
    /// banner guards; every later call returns nothing.
    pub fn take_override(&mut self, doc: &mut Document) -> Vec<NodeId> {
        let Some(banner) = self.banner.as_mut() else {
            return Vec::new();
        };
        if banner.override_consumed {
            debug!("override already used on this banner");
            return Vec::new();
        }
        banner.override_consumed = true;
        doc.set_disabled(banner.override_button, true);
        doc.set_text(banner.override_button, OVERRIDE_CONSUMED_LABEL);
        banner.forms.clone()
    }

    /// Remove the banner. Blocked forms stay blocked.
    pub fn dismiss(&mut self, doc: &mut Document) -> bool {
        match self.banner.take() {
            Some(banner) => {
                doc.remove(banner.node);
                info!("warning banner dismissed");
                true
            }
            None => false,
        }
    }
}

fn control_button(doc: &mut Document, control: BannerControl, label: &str) -> NodeId {
    let button = doc.create_element("button");
    doc.set_attr(button, "type", "button");
    let name = match control {
        BannerControl::Override => "override",
        BannerControl::Dismiss => "dismiss",
    };
    doc.set_data(button, "fg-control", name);
    doc.set_text(button, label);
    button
}
