use std::time::Duration;

use formguard::config::AppConfig;
use formguard::core::dom::{Document, ElementSpec, SubmitOutcome, SubmitTrigger};
use formguard::core::types::{AlertRecord, GuardState};
use formguard::pipeline::alert::ChannelSink;
use formguard::pipeline::presenter::BannerControl;
use formguard::pipeline::scanner::Scanner;
use formguard::pipeline::watcher::{Mutation, MutationWatcher, PageEvent, WatchOutcome};
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver};
use tokio::task::JoinHandle;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn brand_page() -> Document {
    let mut doc = Document::new("https://survey-login.example/view");
    let head = doc.head().expect("head");
    doc.append_spec(head, &ElementSpec::new("title").text("Google Form"));
    let body = doc.body();
    doc.append_spec(
        body,
        &ElementSpec::new("form")
            .attr("action", "https://docs.google.com/forms/d/e/xyz/formResponse")
            .child(ElementSpec::new("button").text("Submit")),
    );
    doc
}

fn phishing_form(action: &str) -> PageEvent {
    PageEvent::Mutation(Mutation::Append {
        parent: None,
        node: ElementSpec::new("div").child(
            ElementSpec::new("form")
                .attr("action", action)
                .child(ElementSpec::new("button").text("Next")),
        ),
    })
}

fn start(
    doc: Document,
) -> (
    Sender<PageEvent>,
    JoinHandle<WatchOutcome>,
    UnboundedReceiver<AlertRecord>,
) {
    let (alert_tx, alert_rx) = mpsc::unbounded_channel();
    let scanner = Scanner::new(&AppConfig::default(), Box::new(ChannelSink::new(alert_tx)));
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(MutationWatcher::new(doc, scanner, DEBOUNCE).run(rx));
    (tx, handle, alert_rx)
}

fn alert_count(rx: &mut UnboundedReceiver<AlertRecord>) -> usize {
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}

#[tokio::test(start_paused = true)]
async fn burst_of_injected_forms_triggers_one_rescan() {
    let (tx, handle, mut alerts) = start(brand_page());
    for i in 0..3 {
        tx.send(phishing_form(&format!("http://203.0.113.{i}/x")))
            .await
            .unwrap();
    }
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
    drop(tx);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome.passes.len(), 2);
    assert_eq!(outcome.passes[1].blocked.len(), 3);
    assert_eq!(alert_count(&mut alerts), 3);
    assert_eq!(outcome.scanner.guard().blocked_forms().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn later_injection_schedules_a_fresh_rescan() {
    let (tx, handle, _alerts) = start(brand_page());
    tx.send(phishing_form("http://203.0.113.1/x")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    tx.send(phishing_form("mailto:drop@evil.example")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    drop(tx);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome.passes.len(), 3);
    assert_eq!(outcome.passes[1].blocked.len(), 1);
    assert_eq!(outcome.passes[2].blocked.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn mutations_without_forms_do_not_rescan() {
    let (tx, handle, _alerts) = start(brand_page());
    tx.send(PageEvent::Mutation(Mutation::Append {
        parent: None,
        node: ElementSpec::new("p").child(ElementSpec::new("a").attr("href", "http://198.51.100.9/")),
    }))
    .await
    .unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;
    drop(tx);
    let outcome = handle.await.unwrap();
    assert_eq!(outcome.passes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn closing_the_channel_flushes_a_pending_rescan() {
    let (tx, handle, mut alerts) = start(brand_page());
    tx.send(phishing_form("http://203.0.113.9/x")).await.unwrap();
    drop(tx);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome.passes.len(), 2);
    assert_eq!(outcome.passes[1].blocked.len(), 1);
    assert_eq!(alert_count(&mut alerts), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_is_blocked_until_the_user_overrides() {
    let mut doc = brand_page();
    let body = doc.body();
    doc.append_spec(
        body,
        &ElementSpec::new("form")
            .attr("action", "http://203.0.113.5/submit")
            .child(ElementSpec::new("button").text("Next")),
    );
    let (tx, handle, _alerts) = start(doc);

    let submit = |trigger| PageEvent::Submit {
        form_index: 1,
        trigger,
    };
    tx.send(submit(SubmitTrigger::Button)).await.unwrap();
    tx.send(submit(SubmitTrigger::EnterKey)).await.unwrap();
    tx.send(PageEvent::Banner(BannerControl::Override)).await.unwrap();
    tx.send(submit(SubmitTrigger::Button)).await.unwrap();
    tx.send(phishing_form("http://203.0.113.6/x")).await.unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;
    drop(tx);
    let outcome = handle.await.unwrap();

    let results: Vec<SubmitOutcome> = outcome.submissions.iter().map(|s| s.outcome).collect();
    assert_eq!(
        results,
        vec![
            SubmitOutcome::Prevented,
            SubmitOutcome::Prevented,
            SubmitOutcome::Submitted
        ]
    );
    let forms = outcome.document.forms();
    assert_eq!(outcome.scanner.state(forms[0]), GuardState::Unseen);
    assert_eq!(outcome.scanner.state(forms[1]), GuardState::Overridden);
    assert_eq!(outcome.scanner.state(forms[2]), GuardState::Blocked);
}

#[cfg(feature = "html")]
#[tokio::test(start_paused = true)]
async fn html_fragments_are_watched() {
    let (tx, handle, _alerts) = start(brand_page());
    tx.send(PageEvent::Mutation(Mutation::AppendHtml {
        parent: None,
        html: "<section><form action='https://xn--bcher-kva.example/s'><button>Go</button></form></section>".into(),
    }))
    .await
    .unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;
    drop(tx);
    let outcome = handle.await.unwrap();

    let rescan = &outcome.passes[1];
    assert_eq!(outcome.passes.len(), 2);
    assert_eq!(rescan.blocked.len(), 1);
    let injected = rescan
        .analyses
        .iter()
        .find(|a| a.form == rescan.blocked[0])
        .expect("analysis for injected form");
    assert!(injected
        .reasons
        .contains(&"action contains punycode".to_string()));
}
