use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::core::dom::{ElementSpec, SubmitTrigger};
use crate::pipeline::presenter::BannerControl;
use crate::pipeline::watcher::{Mutation, PageEvent};

/// A page plus the timed events to replay against it.
#[derive(Debug, Clone)]
pub struct Session {
    pub page: PathBuf,
    pub url: String,
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Clone)]
pub struct TimedEvent {
    pub delay_ms: u64,
    pub event: PageEvent,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum EventKind {
    Append,
    AppendHtml,
    Click,
    Submit,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionRaw {
    page: PathBuf,
    url: String,
    #[serde(default)]
    events: Vec<EventRaw>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventRaw {
    #[serde(default)]
    delay_ms: u64,
    kind: EventKind,
    #[serde(default)]
    node: Option<ElementSpec>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    control: Option<BannerControl>,
    #[serde(default)]
    form_index: Option<usize>,
    #[serde(default)]
    trigger: Option<SubmitTrigger>,
}

pub fn load_session(path: &Path) -> Result<Session> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading session {}", path.display()))?;
    let mut session = parse_session(&data)?;
    if session.page.is_relative() {
        if let Some(dir) = path.parent() {
            session.page = dir.join(&session.page);
        }
    }
    Ok(session)
}

pub fn parse_session(data: &str) -> Result<Session> {
    let raw: SessionRaw = toml::from_str(data)?;
    let events = raw
        .events
        .into_iter()
        .enumerate()
        .map(|(i, ev)| {
            let delay_ms = ev.delay_ms;
            to_event(ev)
                .map(|event| TimedEvent { delay_ms, event })
                .with_context(|| format!("session event #{i}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Session {
        page: raw.page,
        url: raw.url,
        events,
    })
}

fn to_event(raw: EventRaw) -> Result<PageEvent> {
    match raw.kind {
        EventKind::Append => {
            let node = raw.node.ok_or_else(|| anyhow!("append needs `node`"))?;
            Ok(PageEvent::Mutation(Mutation::Append { parent: None, node }))
        }
        EventKind::AppendHtml => {
            let html = raw.html.ok_or_else(|| anyhow!("append_html needs `html`"))?;
            append_html(html)
        }
        EventKind::Click => {
            let control = raw.control.ok_or_else(|| anyhow!("click needs `control`"))?;
            Ok(PageEvent::Banner(control))
        }
        EventKind::Submit => Ok(PageEvent::Submit {
            form_index: raw.form_index.unwrap_or(0),
            trigger: raw.trigger.unwrap_or(SubmitTrigger::Button),
        }),
    }
}

#[cfg(feature = "html")]
fn append_html(html: String) -> Result<PageEvent> {
    Ok(PageEvent::Mutation(Mutation::AppendHtml { parent: None, html }))
}

#[cfg(not(feature = "html"))]
fn append_html(_html: String) -> Result<PageEvent> {
    Err(anyhow!("append_html requires the `html` feature"))
}
