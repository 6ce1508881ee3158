use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::config::AlertLimits;
use crate::core::error::GuardError;
use crate::core::time::now_millis;
use crate::core::types::{AlertLink, AlertRecord, FormAnalysis, LinkFinding};

pub const LINK_ONLY_REASON: &str = "suspicious links on brand-looking page";

/// One-way hand-off to whatever stores and surfaces alerts.
pub trait AlertSink: Send {
    fn deliver(&self, record: &AlertRecord) -> Result<(), GuardError>;
}

/// Forwards records over an in-process channel.
pub struct ChannelSink {
    tx: UnboundedSender<AlertRecord>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<AlertRecord>) -> Self {
        Self { tx }
    }
}

impl AlertSink for ChannelSink {
    fn deliver(&self, record: &AlertRecord) -> Result<(), GuardError> {
        self.tx
            .send(record.clone())
            .map_err(|_| GuardError::Delivery("alert channel closed".into()))
    }
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> Result<Self, GuardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AlertSink for JsonlSink {
    fn deliver(&self, record: &AlertRecord) -> Result<(), GuardError> {
        let line = serde_json::to_string(record)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| GuardError::Delivery("alert log poisoned".into()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Builds capped alert records and hands them off without waiting.
pub struct AlertEmitter {
    sink: Box<dyn AlertSink>,
    limits: AlertLimits,
}

impl AlertEmitter {
    pub fn new(sink: Box<dyn AlertSink>, limits: AlertLimits) -> Self {
        Self { sink, limits }
    }

    /// Build and deliver. Delivery failures are logged and swallowed.
    pub fn emit(
        &self,
        analysis: Option<&FormAnalysis>,
        links: &[LinkFinding],
        page_url: &str,
    ) -> AlertRecord {
        let record = build_record(analysis, links, page_url, &self.limits);
        match self.sink.deliver(&record) {
            Ok(()) => info!(
                "alert sent: {} ({} links)",
                record.reason,
                record.suspicious_links.len()
            ),
            Err(err) => warn!("alert not delivered: {err}"),
        }
        record
    }
}

pub fn build_record(
    analysis: Option<&FormAnalysis>,
    links: &[LinkFinding],
    page_url: &str,
    limits: &AlertLimits,
) -> AlertRecord {
    let (reason, form_action) = match analysis {
        Some(a) => (a.reasons.join("; "), a.action.as_str()),
        None => (LINK_ONLY_REASON.to_string(), ""),
    };
    AlertRecord {
        reason: truncate(&reason, limits.reason_chars),
        form_action: truncate(form_action, limits.form_action_chars),
        page_url: truncate(page_url, limits.page_url_chars),
        suspicious_links: links
            .iter()
            .take(limits.max_links)
            .map(|f| AlertLink {
                url: truncate(&f.url, limits.link_url_chars),
                reason: truncate(&f.reason.to_string(), limits.link_reason_chars),
            })
            .collect(),
        timestamp: now_millis(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::Document;
    use crate::core::types::LinkReason;
    use tokio::sync::mpsc;

    fn finding(doc: &mut Document, url: &str) -> LinkFinding {
        LinkFinding {
            anchor: doc.create_element("a"),
            url: url.to_string(),
            reason: LinkReason::IpAddress,
        }
    }

    #[test]
    fn record_fields_are_capped() {
        let mut doc = Document::new("https://evil.example/");
        let long = format!("http://203.0.113.5/{}", "a".repeat(400));
        let analysis = FormAnalysis {
            form: doc.create_element("form"),
            action: long.clone(),
            reasons: vec!["r".repeat(300), "s".repeat(300)],
        };
        let links: Vec<_> = (0..15).map(|_| finding(&mut doc, &long)).collect();
        let page_url = format!("https://evil.example/{}", "p".repeat(300));

        let record = build_record(Some(&analysis), &links, &page_url, &AlertLimits::default());
        assert_eq!(record.reason.chars().count(), 500);
        assert_eq!(record.form_action.chars().count(), 200);
        assert_eq!(record.page_url.chars().count(), 200);
        assert_eq!(record.suspicious_links.len(), 10);
        assert!(record.suspicious_links.iter().all(|l| l.url.chars().count() == 200));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("ééé", 2), "éé");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[test]
    fn link_only_record() {
        let mut doc = Document::new("https://evil.example/");
        let links = vec![finding(&mut doc, "http://198.51.100.9/track")];
        let record = build_record(None, &links, "https://evil.example/", &AlertLimits::default());
        assert_eq!(record.reason, LINK_ONLY_REASON);
        assert_eq!(record.form_action, "");
        assert_eq!(record.suspicious_links[0].reason, "link to IP address");
    }

    #[test]
    fn closed_channel_does_not_propagate() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let emitter = AlertEmitter::new(Box::new(ChannelSink::new(tx)), AlertLimits::default());
        let record = emitter.emit(None, &[], "https://evil.example/");
        assert_eq!(record.page_url, "https://evil.example/");
    }

    #[test]
    fn channel_sink_forwards_records() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = AlertEmitter::new(Box::new(ChannelSink::new(tx)), AlertLimits::default());
        emitter.emit(None, &[], "https://evil.example/");
        let got = rx.try_recv().unwrap();
        assert_eq!(got.reason, LINK_ONLY_REASON);
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let path = std::env::temp_dir().join(format!("fg_alerts_{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let sink = JsonlSink::open(&path).unwrap();
        let record = build_record(None, &[], "https://evil.example/", &AlertLimits::default());
        sink.deliver(&record).unwrap();
        sink.deliver(&record).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        assert_eq!(data.lines().count(), 2);
        assert!(data.contains("\"pageUrl\":\"https://evil.example/\""));
        let _ = std::fs::remove_file(&path);
    }
}
