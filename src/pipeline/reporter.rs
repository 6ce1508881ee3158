use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::core::dom::{Document, NodeId};
use crate::core::error::GuardError;
use crate::core::page::PageContext;
use crate::core::time::now_utc;
use crate::core::types::{AlertRecord, FormAnalysis, GuardState, LinkFinding};
use crate::pipeline::scanner::{PassOutcome, Scanner};
use crate::pipeline::watcher::SubmitRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormReport {
    pub index: usize,
    pub action: String,
    pub state: GuardState,
    pub reasons: Vec<String>,
}

/// Summary of everything the guard saw and did on one page.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub page_url: String,
    pub generated_at: String,
    pub passes: usize,
    pub relevant: bool,
    pub brand_looking: bool,
    pub banner_shown: bool,
    pub forms: Vec<FormReport>,
    pub link_findings: Vec<LinkFinding>,
    pub alerts: Vec<AlertRecord>,
    pub submissions: Vec<SubmitRecord>,
}

impl Report {
    pub fn build(
        doc: &Document,
        scanner: &Scanner,
        passes: &[PassOutcome],
        submissions: &[SubmitRecord],
    ) -> Self {
        let mut latest: HashMap<NodeId, &FormAnalysis> = HashMap::new();
        for pass in passes {
            for analysis in &pass.analyses {
                latest.insert(analysis.form, analysis);
            }
        }

        let ctx = PageContext::capture(doc);
        let forms = ctx
            .forms
            .iter()
            .enumerate()
            .map(|(index, form)| FormReport {
                index,
                action: form.action.clone(),
                state: scanner.state(form.node),
                reasons: latest
                    .get(&form.node)
                    .map(|a| a.reasons.clone())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            page_url: doc.url().to_string(),
            generated_at: now_utc().to_rfc3339(),
            passes: passes.len(),
            relevant: passes.iter().any(|p| p.relevant),
            brand_looking: passes
                .iter()
                .rev()
                .find(|p| p.relevant)
                .is_some_and(|p| p.brand_looking),
            banner_shown: scanner.presenter().banner_node().is_some(),
            forms,
            link_findings: passes.iter().flat_map(|p| p.new_links.clone()).collect(),
            alerts: passes.iter().flat_map(|p| p.alerts.clone()).collect(),
            submissions: submissions.to_vec(),
        }
    }
}

pub fn write_report(report: &Report, format: OutputFormat, path: &Path) -> Result<(), GuardError> {
    let body = render(report, format)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body).map_err(|e| GuardError::Config(e.to_string()))
}

pub fn render(report: &Report, format: OutputFormat) -> Result<String, GuardError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|_| GuardError::Unknown),
        OutputFormat::Markdown => Ok(render_markdown(report)),
    }
}

fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# formguard report\n\n");
    out.push_str(&format!(
        "- Page: {}\n- Generated: {}\n- Passes: {}\n- Relevant: {}\n- Brand-looking: {}\n- Banner shown: {}\n\n",
        report.page_url,
        report.generated_at,
        report.passes,
        report.relevant,
        report.brand_looking,
        report.banner_shown
    ));

    out.push_str("## Forms\n\n");
    if report.forms.is_empty() {
        out.push_str("_No forms on page._\n");
    }
    for form in &report.forms {
        let action = if form.action.is_empty() {
            "(none)"
        } else {
            form.action.as_str()
        };
        out.push_str(&format!("- #{} `{}` state={:?}\n", form.index, action, form.state));
        for reason in &form.reasons {
            out.push_str(&format!("  - {reason}\n"));
        }
    }

    out.push_str("\n## Links\n\n");
    if report.link_findings.is_empty() {
        out.push_str("_No suspicious links._\n");
    }
    for finding in &report.link_findings {
        out.push_str(&format!("- {} ({})\n", finding.url, finding.reason));
    }

    out.push_str(&format!("\n## Alerts ({})\n\n", report.alerts.len()));
    for alert in &report.alerts {
        out.push_str(&format!("- {} | action={} | links={}\n", alert.reason, alert.form_action, alert.suspicious_links.len()));
    }

    if !report.submissions.is_empty() {
        out.push_str("\n## Submissions\n\n");
        for sub in &report.submissions {
            out.push_str(&format!(
                "- form #{} via {:?}: {:?}\n",
                sub.form_index, sub.trigger, sub.outcome
            ));
        }
    }
    out
}
