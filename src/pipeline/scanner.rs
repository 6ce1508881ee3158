use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::{AppConfig, BrandProfile};
use crate::core::dom::{Document, NodeId};
use crate::core::page::PageContext;
use crate::core::types::{AlertRecord, FormAnalysis, GuardState, LinkFinding};
use crate::detectors::{looks_like_brand, should_process};
use crate::pipeline::alert::{AlertEmitter, AlertSink};
use crate::pipeline::guard::FormGuard;
use crate::pipeline::presenter::{BannerControl, WarningPresenter};
use crate::pipeline::sanitize::{self, Sanitize};
use crate::pipeline::{forms, links};

/// What one analysis pass found and did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassOutcome {
    pub relevant: bool,
    pub brand_looking: bool,
    pub analyses: Vec<FormAnalysis>,
    #[serde(skip)]
    pub blocked: Vec<NodeId>,
    pub new_links: Vec<LinkFinding>,
    pub alerts: Vec<AlertRecord>,
}

/// The detection pipeline plus the per-page state it carries between passes.
pub struct Scanner {
    profile: BrandProfile,
    guard: FormGuard,
    presenter: WarningPresenter,
    emitter: AlertEmitter,
    reported_anchors: HashSet<NodeId>,
}

impl Scanner {
    pub fn new(config: &AppConfig, sink: Box<dyn AlertSink>) -> Self {
        Self::with_sanitizer(config, sink, sanitize::detect())
    }

    pub fn with_sanitizer(
        config: &AppConfig,
        sink: Box<dyn AlertSink>,
        sanitizer: Box<dyn Sanitize>,
    ) -> Self {
        debug!("banner sanitizer: {}", sanitizer.name());
        Self {
            profile: config.brand.clone(),
            guard: FormGuard::new(),
            presenter: WarningPresenter::new(config.brand.name.clone(), sanitizer),
            emitter: AlertEmitter::new(sink, config.limits),
            reported_anchors: HashSet::new(),
        }
    }

    pub fn guard(&self) -> &FormGuard {
        &self.guard
    }

    pub fn presenter(&self) -> &WarningPresenter {
        &self.presenter
    }

    pub fn state(&self, form: NodeId) -> GuardState {
        self.guard.state(form)
    }

    /// One full pass over the page. Safe to call any number of times:
    /// processed forms and already reported links are skipped.
    pub fn scan(&mut self, doc: &mut Document) -> PassOutcome {
        self.guard.enforce(doc);
        let ctx = PageContext::capture(doc);
        if !should_process(&ctx, &self.profile) {
            debug!("page not relevant: {}", ctx.url);
            return PassOutcome::default();
        }

        let brand_looking = looks_like_brand(&ctx, &self.profile);
        let mut outcome = PassOutcome {
            relevant: true,
            brand_looking,
            ..PassOutcome::default()
        };

        let mut flagged = Vec::new();
        for form in &ctx.forms {
            if self.guard.is_processed(form.node) {
                continue;
            }
            let analysis = forms::analyze_with_verdict(form, brand_looking, &self.profile);
            if analysis.suspicious() && self.guard.block(doc, form.node) {
                self.presenter.show(doc, form.node, &analysis.reasons);
                self.presenter.adopt(&self.guard.blocked_forms());
                outcome.blocked.push(form.node);
                flagged.push(analysis.clone());
            }
            outcome.analyses.push(analysis);
        }

        let new_links: Vec<LinkFinding> =
            links::analyze_with_verdict(&ctx.anchors, brand_looking, &self.profile)
                .into_iter()
                .filter(|f| !self.reported_anchors.contains(&f.anchor))
                .collect();

        for analysis in &flagged {
            outcome
                .alerts
                .push(self.emitter.emit(Some(analysis), &new_links, &ctx.url));
        }
        if flagged.is_empty() && brand_looking && !new_links.is_empty() {
            outcome.alerts.push(self.emitter.emit(None, &new_links, &ctx.url));
        }
        if !outcome.alerts.is_empty() {
            self.reported_anchors
                .extend(new_links.iter().map(|f| f.anchor));
        }

        debug!(
            "pass done: {} forms analyzed, {} blocked, {} new link findings",
            outcome.analyses.len(),
            outcome.blocked.len(),
            new_links.len()
        );
        outcome.new_links = new_links;
        outcome
    }

    /// Handle a click on one of the banner's controls.
    pub fn handle_banner(&mut self, doc: &mut Document, control: BannerControl) -> Vec<NodeId> {
        match control {
            BannerControl::Override => self
                .presenter
                .take_override(doc)
                .into_iter()
                .filter(|form| self.guard.release(doc, *form))
                .collect(),
            BannerControl::Dismiss => {
                self.presenter.dismiss(doc);
                Vec::new()
            }
        }
    }
}
