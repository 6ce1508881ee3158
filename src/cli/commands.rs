use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;

use crate::cli::flags::{Cli, Command, OutputArgs};
use crate::cli::session::load_session;
use crate::config::{load_config, AppConfig};
use crate::core::dom::Document;
use crate::core::types::AlertRecord;
use crate::pipeline::alert::{AlertSink, ChannelSink, JsonlSink};
use crate::pipeline::reporter::{render, write_report, Report};
use crate::pipeline::scanner::Scanner;
use crate::pipeline::watcher::MutationWatcher;

pub async fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Scan { page, url, output } => run_scan(&cfg, &page, &url, &output),
        Command::Replay { session, output } => run_replay(&cfg, &session, &output).await,
    }
}

fn run_scan(cfg: &AppConfig, page: &Path, url: &str, out: &OutputArgs) -> Result<()> {
    let mut doc = load_page(page, url)?;
    let (sink, _alerts) = alert_sink(out)?;
    let mut scanner = Scanner::new(cfg, sink);
    let pass = scanner.scan(&mut doc);
    let report = Report::build(&doc, &scanner, &[pass], &[]);
    emit(&report, &doc, out)
}

async fn run_replay(cfg: &AppConfig, session_path: &Path, out: &OutputArgs) -> Result<()> {
    let session = load_session(session_path)?;
    let doc = load_page(&session.page, &session.url)?;
    let (sink, _alerts) = alert_sink(out)?;
    let scanner = Scanner::new(cfg, sink);

    let (tx, rx) = mpsc::channel(64);
    let watcher = MutationWatcher::new(doc, scanner, cfg.debounce());
    let handle = tokio::spawn(watcher.run(rx));

    for timed in session.events {
        if timed.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(timed.delay_ms)).await;
        }
        tx.send(timed.event)
            .await
            .map_err(|_| anyhow!("watcher stopped before the session finished"))?;
    }
    drop(tx);

    let outcome = handle.await.context("watcher task failed")?;
    tracing::info!("replay finished after {} passes", outcome.passes.len());
    let report = Report::build(
        &outcome.document,
        &outcome.scanner,
        &outcome.passes,
        &outcome.submissions,
    );
    emit(&report, &outcome.document, out)
}

/// JSONL file when `--alerts` is given, otherwise an in-process channel whose
/// receiver the caller keeps alive for the duration of the run.
fn alert_sink(
    out: &OutputArgs,
) -> Result<(Box<dyn AlertSink>, Option<mpsc::UnboundedReceiver<AlertRecord>>)> {
    match &out.alerts {
        Some(path) => {
            let sink = JsonlSink::open(path)
                .with_context(|| format!("opening alert log {}", path.display()))?;
            Ok((Box::new(sink), None))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            Ok((Box::new(ChannelSink::new(tx)), Some(rx)))
        }
    }
}

fn emit(report: &Report, doc: &Document, out: &OutputArgs) -> Result<()> {
    let format = out.format.clone().into();
    match &out.output {
        Some(path) => {
            write_report(report, format, path)?;
            tracing::info!("report written to {}", path.display());
        }
        None => println!("{}", render(report, format)?),
    }
    if let Some(path) = &out.guarded_html {
        std::fs::write(path, doc.to_html())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

#[cfg(feature = "html")]
fn load_page(path: &Path, url: &str) -> Result<Document> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading page {}", path.display()))?;
    Ok(crate::core::html::parse_document(url, &html))
}

#[cfg(not(feature = "html"))]
fn load_page(_path: &Path, _url: &str) -> Result<Document> {
    Err(anyhow!("loading HTML pages requires the `html` feature"))
}
