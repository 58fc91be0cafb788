//! Non-interactive CLI mode - one request per process

use medimind_assistant::{language_code, Document, ReportAssistant};
use std::path::Path;

use crate::display::{self, OutputMode};

/// Print the plain text of a report
pub async fn extract(assistant: &ReportAssistant, file: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let doc = Document::from_path(file).await?;
    let text = assistant.extract(&doc).await?;
    println!("{}", display::render_text(mode, "text", &text));
    Ok(())
}

/// Print a report summary in `language`
pub async fn summarize(
    assistant: &ReportAssistant,
    file: &Path,
    language: &str,
    mode: OutputMode,
) -> anyhow::Result<()> {
    // reject an unknown language before reading the file
    language_code(language)?;
    let doc = Document::from_path(file).await?;
    let summary = assistant.summarize(&doc, language).await?;
    println!("{}", display::render_text(mode, "summary", &summary));
    Ok(())
}

/// Answer one question about a report
pub async fn ask(
    assistant: &ReportAssistant,
    file: &Path,
    question: &str,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let doc = Document::from_path(file).await?;
    let answer = assistant.answer(&doc, question).await?;
    println!("{}", display::render_text(mode, "answer", &answer));
    Ok(())
}

/// Translate free text
pub async fn translate(
    assistant: &ReportAssistant,
    text: &str,
    language: &str,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let translated = assistant.translate(text, language).await?;
    println!("{}", display::render_text(mode, "translation", &translated));
    Ok(())
}

/// Search the literature; more than one term prints one section per term
pub async fn search(
    assistant: &ReportAssistant,
    terms: &[String],
    max_results: usize,
    mode: OutputMode,
) -> anyhow::Result<()> {
    if let [term] = terms {
        let articles = assistant.search(term, max_results).await?;
        println!("{}", display::render_articles(mode, &articles));
        return Ok(());
    }

    let queries: Vec<&str> = terms.iter().map(String::as_str).collect();
    let results = assistant.search_batch(&queries, max_results).await?;
    println!("{}", display::render_batch(mode, &results));
    Ok(())
}
