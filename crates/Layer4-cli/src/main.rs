//! MediMind CLI - Main entry point

mod cli;
mod display;
mod session;

use clap::{Parser, Subcommand};
use medimind_assistant::ReportAssistant;
use medimind_foundation::MediMindConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::display::OutputMode;
use crate::session::Session;

/// MediMind - medical report summaries, answers and literature search
#[derive(Parser, Debug)]
#[command(name = "medimind")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print cache and timing statistics before exiting
    #[arg(long, global = true)]
    stats: bool,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the plain text of a report
    Extract {
        file: PathBuf,
    },
    /// Summarize a report
    Summarize {
        file: PathBuf,
        /// Output language (code or name)
        #[arg(short, long, default_value = "en")]
        lang: String,
    },
    /// Ask a question about a report
    Ask {
        file: PathBuf,
        question: String,
    },
    /// Translate free text
    Translate {
        text: String,
        /// Target language (code or name)
        #[arg(short, long)]
        lang: String,
    },
    /// Search PubMed (several terms run as one batch)
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Maximum number of articles (defaults to the configured value)
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// List supported output languages
    Languages,
    /// Interactive session reusing the cache across requests
    Session {
        /// Report to load at start
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mode = OutputMode::from_flag(args.json);

    if let Command::Languages = args.command {
        println!("{}", display::render_languages(mode));
        return Ok(());
    }

    // Load configuration
    let config = MediMindConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        MediMindConfig::default()
    });

    let assistant = ReportAssistant::from_config(&config);
    let sweeper = assistant.context().spawn_sweeper();
    let default_max = config.literature.default_max_results;

    let result = match args.command {
        Command::Extract { file } => cli::extract(&assistant, &file, mode).await,
        Command::Summarize { file, lang } => cli::summarize(&assistant, &file, &lang, mode).await,
        Command::Ask { file, question } => cli::ask(&assistant, &file, &question, mode).await,
        Command::Translate { text, lang } => cli::translate(&assistant, &text, &lang, mode).await,
        Command::Search { terms, max } => {
            cli::search(&assistant, &terms, max.unwrap_or(default_max), mode).await
        }
        Command::Session { file } => {
            session::run(Session::new(assistant.clone(), mode, default_max), file).await
        }
        Command::Languages => Ok(()),
    };

    if let Some(handle) = sweeper {
        handle.abort();
    }

    if args.stats {
        eprintln!(
            "\n{}",
            display::render_stats(mode, &assistant.stats(), assistant.context().monitor())
        );
    }

    result
}
