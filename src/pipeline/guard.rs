use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::dom::{Document, NodeId};
use crate::core::types::GuardState;

/// Dataset key recording a control's disabled state before blocking.
pub const PREV_DISABLED_KEY: &str = "fg-prev-disabled";

/// Per-form submission guard.
///
/// State is keyed by the form's [`NodeId`]; no marker attribute is written to
/// the form itself. Forms never seen by [`FormGuard::block`] are `Unseen`.
#[derive(Debug, Default)]
pub struct FormGuard {
    states: HashMap<NodeId, GuardState>,
}

impl FormGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, form: NodeId) -> GuardState {
        self.states.get(&form).copied().unwrap_or_default()
    }

    pub fn is_processed(&self, form: NodeId) -> bool {
        self.state(form).is_processed()
    }

    pub fn blocked_forms(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, state)| **state == GuardState::Blocked)
            .map(|(form, _)| *form)
            .collect();
        out.sort();
        out
    }

    /// `Unseen -> Blocked`. Returns false if the form was already processed.
    pub fn block(&mut self, doc: &mut Document, form: NodeId) -> bool {
        if self.is_processed(form) {
            debug!("{form} already processed; not blocking again");
            return false;
        }
        let disabled = disable_controls(doc, form);
        doc.intercept_submit(form);
        self.states.insert(form, GuardState::Blocked);
        info!("blocked {form} ({disabled} submit controls disabled)");
        true
    }

    /// Disable submit controls added to blocked forms since they were blocked.
    /// Returns how many controls were newly disabled.
    pub fn enforce(&self, doc: &mut Document) -> usize {
        let mut total = 0;
        for form in self.blocked_forms() {
            let disabled = disable_controls(doc, form);
            if disabled > 0 {
                debug!("{form}: disabled {disabled} late submit controls");
            }
            total += disabled;
        }
        total
    }

    /// `Blocked -> Overridden`, user-initiated only. Returns false otherwise.
    pub fn release(&mut self, doc: &mut Document, form: NodeId) -> bool {
        if self.state(form) != GuardState::Blocked {
            return false;
        }
        for control in doc.submit_controls(form) {
            let previous = doc.data(control, PREV_DISABLED_KEY).map(|v| v == "true");
            if let Some(was_disabled) = previous {
                doc.set_disabled(control, was_disabled);
                doc.remove_data(control, PREV_DISABLED_KEY);
            }
        }
        doc.release_submit(form);
        self.states.insert(form, GuardState::Overridden);
        info!("user override released {form}");
        true
    }
}

/// Disable every submit control of `form` not already under guard, recording
/// its prior disabled state.
fn disable_controls(doc: &mut Document, form: NodeId) -> usize {
    let mut count = 0;
    for control in doc.submit_controls(form) {
        if doc.data(control, PREV_DISABLED_KEY).is_some() {
            continue;
        }
        let was_disabled = doc.is_disabled(control);
        doc.set_data(control, PREV_DISABLED_KEY, was_disabled.to_string());
        doc.set_disabled(control, true);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::{ElementSpec, SubmitOutcome, SubmitTrigger};

    fn page_with_form() -> (Document, NodeId) {
        let mut doc = Document::new("https://evil.example/");
        let body = doc.body();
        let form = doc.append_spec(
            body,
            &ElementSpec::new("form")
                .child(ElementSpec::new("button").text("Next"))
                .child(ElementSpec::new("input").attr("type", "submit").attr("disabled", "")),
        );
        (doc, form)
    }

    #[test]
    fn unseen_forms_are_not_processed() {
        let (_, form) = page_with_form();
        let guard = FormGuard::new();
        assert_eq!(guard.state(form), GuardState::Unseen);
        assert!(!guard.is_processed(form));
    }

    #[test]
    fn block_disables_controls_and_intercepts() {
        let (mut doc, form) = page_with_form();
        let mut guard = FormGuard::new();
        assert!(guard.block(&mut doc, form));

        let controls = doc.submit_controls(form);
        assert!(controls.iter().all(|c| doc.is_disabled(*c)));
        assert_eq!(doc.data(controls[0], PREV_DISABLED_KEY), Some("false"));
        assert_eq!(doc.data(controls[1], PREV_DISABLED_KEY), Some("true"));
        assert_eq!(doc.dispatch_submit(form, SubmitTrigger::EnterKey), SubmitOutcome::Prevented);
        assert_eq!(guard.blocked_forms(), vec![form]);
    }

    #[test]
    fn block_is_at_most_once() {
        let (mut doc, form) = page_with_form();
        let mut guard = FormGuard::new();
        assert!(guard.block(&mut doc, form));
        assert!(!guard.block(&mut doc, form));
        assert_eq!(guard.state(form), GuardState::Blocked);
    }

    #[test]
    fn release_restores_previous_disabled_state() {
        let (mut doc, form) = page_with_form();
        let mut guard = FormGuard::new();
        guard.block(&mut doc, form);
        assert!(guard.release(&mut doc, form));

        let controls = doc.submit_controls(form);
        assert!(!doc.is_disabled(controls[0]));
        assert!(doc.is_disabled(controls[1]));
        assert_eq!(doc.data(controls[0], PREV_DISABLED_KEY), None);
        assert!(!doc.is_submit_intercepted(form));
        assert_eq!(doc.dispatch_submit(form, SubmitTrigger::Button), SubmitOutcome::Submitted);
    }

    #[test]
    fn override_is_terminal() {
        let (mut doc, form) = page_with_form();
        let mut guard = FormGuard::new();
        assert!(!guard.release(&mut doc, form));
        guard.block(&mut doc, form);
        guard.release(&mut doc, form);
        assert!(!guard.block(&mut doc, form));
        assert!(!guard.release(&mut doc, form));
        assert_eq!(guard.state(form), GuardState::Overridden);
    }

    #[test]
    fn form_without_controls_still_blocks() {
        let mut doc = Document::new("https://evil.example/");
        let body = doc.body();
        let form = doc.append_spec(body, &ElementSpec::new("form"));
        let mut guard = FormGuard::new();
        assert!(guard.block(&mut doc, form));
        assert_eq!(doc.dispatch_submit(form, SubmitTrigger::Script), SubmitOutcome::Prevented);
    }

    #[test]
    fn late_submit_controls_are_disabled_and_restored() {
        let (mut doc, form) = page_with_form();
        let mut guard = FormGuard::new();
        guard.block(&mut doc, form);
        let late = doc.append_spec(form, &ElementSpec::new("button").text("Continue"));
        assert!(!doc.is_disabled(late));

        assert_eq!(guard.enforce(&mut doc), 1);
        assert!(doc.is_disabled(late));
        assert_eq!(guard.enforce(&mut doc), 0);

        guard.release(&mut doc, form);
        assert!(!doc.is_disabled(late));
    }
}
