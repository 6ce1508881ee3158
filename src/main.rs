use std::{fs, path::Path};

use clap::Parser;
use formguard::cli::{commands, flags::Cli};
use formguard::core::error::GuardError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    commands::run(cli).await
}

fn init_tracing(cli: &Cli) -> Result<(), GuardError> {
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = open_log_file(Path::new(&cli.log_file))?;

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false);

    // Reports go to stdout, so logs go to stderr.
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| GuardError::Config(e.to_string()))
}

/// Open the log file for appending, rotating it once it passes 1 MB.
fn open_log_file(path: &Path) -> Result<fs::File, GuardError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::metadata(path).is_ok_and(|meta| meta.len() > 1_000_000) {
        let _ = fs::rename(path, path.with_extension("log.1"));
    }
    Ok(fs::OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_errors_surface_as_io() {
        let dir = std::env::temp_dir().join(format!("formguard-log-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let err = open_log_file(&blocker.join("formguard.log")).unwrap_err();
        assert!(matches!(err, GuardError::Io(_)), "{err:?}");

        let ok = dir.join("logs").join("formguard.log");
        assert!(open_log_file(&ok).is_ok());
        assert!(ok.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
