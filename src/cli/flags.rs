use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::pipeline::reporter::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "formguard",
    version,
    about = "Local guard against pages impersonating Google Forms"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML). Default: config/formguard.toml
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Increase verbosity (debug, trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path
    #[arg(long, default_value = "data/formguard.log", global = true)]
    pub log_file: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a saved HTML page once
    Scan {
        /// HTML file to analyze
        page: PathBuf,
        /// URL the page was served from
        #[arg(long)]
        url: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Replay a timed session of page events through the mutation watcher
    Replay {
        /// Session file (TOML)
        #[arg(long)]
        session: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Report format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,

    /// Report path (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Append alert records as JSON lines to this file
    #[arg(long)]
    pub alerts: Option<PathBuf>,

    /// Write the page as it looks after guarding
    #[arg(long)]
    pub guarded_html: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormatArg {
    Json,
    Markdown,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}
