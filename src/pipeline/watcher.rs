//! Debounced re-scan loop driven by page events.
//!
//! One task owns the [`Document`] and the [`Scanner`]; every page event,
//! timer expiry and banner click is handled to completion before the next
//! one is looked at, so analysis passes and overrides never interleave.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::dom::{Document, ElementSpec, NodeId, SubmitOutcome, SubmitTrigger};
use crate::pipeline::presenter::BannerControl;
use crate::pipeline::scanner::{PassOutcome, Scanner};

/// DOM change requested by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Append an element tree; `parent` defaults to `body`.
    Append {
        #[serde(default)]
        parent: Option<NodeId>,
        node: ElementSpec,
    },
    #[cfg(feature = "html")]
    AppendHtml {
        #[serde(default)]
        parent: Option<NodeId>,
        html: String,
    },
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    Remove {
        node: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Mutation(Mutation),
    Banner(BannerControl),
    /// Submit the `form_index`-th form currently on the page.
    Submit {
        form_index: usize,
        trigger: SubmitTrigger,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRecord {
    pub form_index: usize,
    pub trigger: SubmitTrigger,
    pub outcome: SubmitOutcome,
}

pub struct WatchOutcome {
    pub document: Document,
    pub scanner: Scanner,
    pub passes: Vec<PassOutcome>,
    pub submissions: Vec<SubmitRecord>,
}

pub struct MutationWatcher {
    document: Document,
    scanner: Scanner,
    debounce: Duration,
    pending: Option<Instant>,
    passes: Vec<PassOutcome>,
    submissions: Vec<SubmitRecord>,
}

impl MutationWatcher {
    pub fn new(document: Document, scanner: Scanner, debounce: Duration) -> Self {
        Self {
            document,
            scanner,
            debounce,
            pending: None,
            passes: Vec::new(),
            submissions: Vec::new(),
        }
    }

    /// Run the document-ready pass, then serve events until the sender side
    /// closes. A re-scan still pending at that point is flushed.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> WatchOutcome {
        self.run_pass("initial");

        loop {
            let deadline = self.pending;
            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = timer => {
                    self.pending = None;
                    self.run_pass("mutation");
                }
            }
        }

        if self.pending.take().is_some() {
            self.run_pass("flush");
        }

        WatchOutcome {
            document: self.document,
            scanner: self.scanner,
            passes: self.passes,
            submissions: self.submissions,
        }
    }

    fn run_pass(&mut self, cause: &str) {
        let outcome = self.scanner.scan(&mut self.document);
        debug!(
            "{cause} pass: relevant={} blocked={} alerts={}",
            outcome.relevant,
            outcome.blocked.len(),
            outcome.alerts.len()
        );
        self.passes.push(outcome);
    }

    fn handle(&mut self, event: PageEvent) {
        match event {
            PageEvent::Mutation(mutation) => {
                let added = self.apply(mutation);
                if added.iter().any(|node| self.document.contains_tag(*node, "form")) {
                    self.schedule();
                }
            }
            PageEvent::Banner(control) => {
                let released = self.scanner.handle_banner(&mut self.document, control);
                if !released.is_empty() {
                    info!("{} form(s) released by user override", released.len());
                }
            }
            PageEvent::Submit {
                form_index,
                trigger,
            } => {
                let outcome = match self.document.forms().get(form_index) {
                    Some(form) => self.document.dispatch_submit(*form, trigger),
                    None => {
                        warn!("no form at index {form_index}");
                        SubmitOutcome::Prevented
                    }
                };
                self.submissions.push(SubmitRecord {
                    form_index,
                    trigger,
                    outcome,
                });
            }
        }
    }

    /// Apply a mutation and return the roots of any added subtrees.
    fn apply(&mut self, mutation: Mutation) -> Vec<NodeId> {
        let doc = &mut self.document;
        match mutation {
            Mutation::Append { parent, node } => {
                let parent = parent.unwrap_or_else(|| doc.body());
                if !doc.is_connected(parent) {
                    warn!("append target {parent} is detached; ignored");
                    return Vec::new();
                }
                vec![doc.append_spec(parent, &node)]
            }
            #[cfg(feature = "html")]
            Mutation::AppendHtml { parent, html } => {
                let parent = parent.unwrap_or_else(|| doc.body());
                match crate::core::html::append_fragment(doc, parent, &html) {
                    Ok(added) => added,
                    Err(err) => {
                        warn!("fragment not applied: {err}");
                        Vec::new()
                    }
                }
            }
            Mutation::SetAttribute { node, name, value } => {
                doc.set_attr(node, &name, value);
                Vec::new()
            }
            Mutation::Remove { node } => {
                doc.remove(node);
                Vec::new()
            }
        }
    }

    /// Depth-1 queue: a pending re-scan absorbs later triggers.
    fn schedule(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Instant::now() + self.debounce);
            debug!("re-scan scheduled in {:?}", self.debounce);
        }
    }
}
