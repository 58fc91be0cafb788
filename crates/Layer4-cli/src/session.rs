//! Interactive session - 한 프로세스에서 여러 요청 처리
//!
//! The session keeps one `ReportAssistant` alive, so the result cache and
//! the lazily built clients are reused across requests. Commands:
//!
//! - `load <file>` - load a report
//! - `summary [lang]` - summarize the loaded report
//! - `ask <question>` - ask about the loaded report
//! - `translate <lang> <text>` - translate free text
//! - `search <term> [--max N]` - search the literature
//! - `stats` / `cache [clear]` - performance and cache state
//! - `help`, `quit`

use anyhow::{anyhow, bail};
use medimind_assistant::{Document, ReportAssistant};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::display::{self, OutputMode};

const PROMPT: &str = "medimind";

const HELP: &str = "\
Commands:
  load <file>               load a report (.txt, .data, .csv)
  summary [lang]            summarize the loaded report (default: en)
  ask <question>            ask a question about the loaded report
  translate <lang> <text>   translate free text
  search <term> [--max N]   search PubMed
  languages                 list output languages
  stats                     cache, memory and timing statistics
  cache [clear]             cache statistics, or drop every entry
  help                      show this help
  quit                      leave the session";

/// A parsed session line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Load(PathBuf),
    Summary(Option<String>),
    Ask(String),
    Translate { language: String, text: String },
    Search { term: String, max_results: Option<usize> },
    Languages,
    Stats,
    Cache { clear: bool },
    Help,
    Quit,
    Empty,
}

impl SessionCommand {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "" => SessionCommand::Empty,
            "load" | "open" => {
                if rest.is_empty() {
                    bail!("usage: load <file>");
                }
                SessionCommand::Load(PathBuf::from(rest))
            }
            "summary" | "summarize" => {
                SessionCommand::Summary((!rest.is_empty()).then(|| rest.to_string()))
            }
            "ask" => {
                if rest.is_empty() {
                    bail!("usage: ask <question>");
                }
                SessionCommand::Ask(rest.to_string())
            }
            "translate" => {
                let (language, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("usage: translate <lang> <text>"))?;
                SessionCommand::Translate {
                    language: language.to_string(),
                    text: text.trim().to_string(),
                }
            }
            "search" => parse_search(rest)?,
            "languages" | "langs" => SessionCommand::Languages,
            "stats" => SessionCommand::Stats,
            "cache" => match rest {
                "" => SessionCommand::Cache { clear: false },
                "clear" => SessionCommand::Cache { clear: true },
                other => bail!("unknown cache action '{}'", other),
            },
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => bail!("unknown command '{}' (try 'help')", other),
        };
        Ok(command)
    }
}

fn parse_search(rest: &str) -> anyhow::Result<SessionCommand> {
    let (term, max_results) = match rest.rsplit_once("--max") {
        Some((term, max)) => {
            let max = max
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow!("--max expects a number, got '{}'", max.trim()))?;
            (term.trim(), Some(max))
        }
        None => (rest, None),
    };
    if term.is_empty() {
        bail!("usage: search <term> [--max N]");
    }
    Ok(SessionCommand::Search {
        term: term.to_string(),
        max_results,
    })
}

/// Whether the loop keeps running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Session state
pub struct Session {
    assistant: ReportAssistant,
    mode: OutputMode,
    default_max_results: usize,
    document: Option<Document>,
}

impl Session {
    pub fn new(assistant: ReportAssistant, mode: OutputMode, default_max_results: usize) -> Self {
        Self {
            assistant,
            mode,
            default_max_results,
            document: None,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    fn loaded(&self) -> anyhow::Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| anyhow!("no report loaded (use 'load <file>')"))
    }

    pub async fn load(&mut self, path: &Path) -> anyhow::Result<String> {
        let doc = Document::from_path(path).await?;
        let line = format!(
            "Loaded {}",
            display::describe_document(doc.name(), doc.format().as_str(), doc.len())
        );
        self.document = Some(doc);
        Ok(line)
    }

    /// Execute one command, returning what to print
    pub async fn handle(&mut self, command: SessionCommand) -> anyhow::Result<(Flow, Option<String>)> {
        let mode = self.mode;
        let output = match command {
            SessionCommand::Empty => None,
            SessionCommand::Load(path) => Some(self.load(&path).await?),
            SessionCommand::Summary(language) => {
                let language = language.as_deref().unwrap_or("en");
                let summary = self.assistant.summarize(self.loaded()?, language).await?;
                Some(display::render_text(mode, "summary", &summary))
            }
            SessionCommand::Ask(question) => {
                let answer = self.assistant.answer(self.loaded()?, &question).await?;
                Some(display::render_text(mode, "answer", &answer))
            }
            SessionCommand::Translate { language, text } => {
                let translated = self.assistant.translate(&text, &language).await?;
                Some(display::render_text(mode, "translation", &translated))
            }
            SessionCommand::Search { term, max_results } => {
                let max_results = max_results.unwrap_or(self.default_max_results);
                let articles = self.assistant.search(&term, max_results).await?;
                Some(display::render_articles(mode, &articles))
            }
            SessionCommand::Languages => Some(display::render_languages(mode)),
            SessionCommand::Stats => Some(display::render_stats(
                mode,
                &self.assistant.stats(),
                self.assistant.context().monitor(),
            )),
            SessionCommand::Cache { clear } => {
                if clear {
                    self.assistant.clear_cache();
                }
                let stats = self.assistant.context().cache().stats();
                Some(match mode {
                    OutputMode::Json => serde_json::to_string(&stats)?,
                    OutputMode::Text => format!(
                        "{} live / {} capacity, {} hits, {} misses",
                        stats.live_entries, stats.capacity, stats.hits, stats.misses
                    ),
                })
            }
            SessionCommand::Help => Some(HELP.to_string()),
            SessionCommand::Quit => return Ok((Flow::Quit, None)),
        };
        Ok((Flow::Continue, output))
    }
}

/// Run the read-eval-print loop on stdin until `quit` or end of input
pub async fn run(mut session: Session, initial: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(path) = initial {
        match session.load(&path).await {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    println!("MediMind session. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match session.document() {
            Some(doc) => print!("{}[{}]> ", PROMPT, doc.name()),
            None => print!("{}> ", PROMPT),
        }
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let result = match SessionCommand::parse(&line) {
            Ok(command) => {
                debug!(?command, "session command");
                session.handle(command).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, Some(output))) => println!("{}", output),
            Ok((Flow::Continue, None)) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}
