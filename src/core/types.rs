use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::dom::NodeId;

/// Result of running the form rules over one form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormAnalysis {
    #[serde(skip)]
    pub form: NodeId,
    pub action: String,
    pub reasons: Vec<String>,
}

impl FormAnalysis {
    pub fn suspicious(&self) -> bool {
        !self.reasons.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum LinkReason {
    IpAddress,
    Punycode,
    NonBrandDomain,
}

impl fmt::Display for LinkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LinkReason::IpAddress => "link to IP address",
            LinkReason::Punycode => "link contains punycode",
            LinkReason::NonBrandDomain => "non-brand link on brand-looking page",
        };
        f.write_str(text)
    }
}

/// One violated rule on one anchor. An anchor can produce several.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkFinding {
    #[serde(skip)]
    pub anchor: NodeId,
    pub url: String,
    pub reason: LinkReason,
}

/// Per-form submission guard state. `Overridden` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    #[default]
    Unseen,
    Blocked,
    Overridden,
}

impl GuardState {
    pub fn is_processed(self) -> bool {
        !matches!(self, GuardState::Unseen)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertLink {
    pub url: String,
    pub reason: String,
}

/// Redacted record handed to the alerting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub reason: String,
    pub form_action: String,
    pub page_url: String,
    pub suspicious_links: Vec<AlertLink>,
    pub timestamp: i64,
}
