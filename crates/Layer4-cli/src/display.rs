//! Output rendering - 텍스트 / JSON 출력

use medimind_assistant::AssistantStats;
use medimind_foundation::{format_bytes, PerformanceMonitor};
use medimind_provider::{Article, SUPPORTED_LANGUAGES};
use serde_json::json;
use std::fmt::Write;

const WRAP_WIDTH: usize = 88;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

/// Render a text result (extracted text, summary, answer, translation)
pub fn render_text(mode: OutputMode, kind: &str, text: &str) -> String {
    match mode {
        OutputMode::Json => json!({ kind: text }).to_string(),
        OutputMode::Text => wrap(text),
    }
}

/// Render literature search results
pub fn render_articles(mode: OutputMode, articles: &[Article]) -> String {
    if mode == OutputMode::Json {
        return json!({ "articles": articles }).to_string();
    }
    if articles.is_empty() {
        return "No articles found.".to_string();
    }

    let mut out = String::new();
    for (i, article) in articles.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, article.title);
        let _ = writeln!(out, "   {}", article.link);
        let body = textwrap::indent(&textwrap::fill(&article.abstract_text, WRAP_WIDTH - 3), "   ");
        let _ = writeln!(out, "{}", body.trim_end());
        if i + 1 < articles.len() {
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

/// Render a batch search, one section per query
pub fn render_batch(mode: OutputMode, results: &[(String, Vec<Article>)]) -> String {
    if mode == OutputMode::Json {
        let batch: Vec<_> = results
            .iter()
            .map(|(query, articles)| json!({ "query": query, "articles": articles }))
            .collect();
        return json!({ "results": batch }).to_string();
    }

    results
        .iter()
        .map(|(query, articles)| {
            format!("== {} ==\n{}", query, render_articles(OutputMode::Text, articles))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_languages(mode: OutputMode) -> String {
    if mode == OutputMode::Json {
        return json!({ "languages": SUPPORTED_LANGUAGES }).to_string();
    }
    SUPPORTED_LANGUAGES
        .iter()
        .map(|l| format!("{:<6} {}", l.code, l.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cache, reclamation and resource summary followed by the timing table
pub fn render_stats(mode: OutputMode, stats: &AssistantStats, monitor: &PerformanceMonitor) -> String {
    if mode == OutputMode::Json {
        return serde_json::to_string_pretty(stats).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
    }

    let cache = &stats.cache;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cache      {} live / {} capacity, {} hits, {} misses ({:.0}% hit rate), {} expired, {} evicted",
        cache.live_entries,
        cache.capacity,
        cache.hits,
        cache.misses,
        cache.hit_rate() * 100.0,
        cache.expirations,
        cache.evictions,
    );
    let _ = writeln!(
        out,
        "Reclaim    {} passes, {} skipped, {} items freed, {} hook failures",
        stats.reclaim.passes,
        stats.reclaim.skipped,
        stats.reclaim.items_reclaimed,
        stats.reclaim.hook_failures,
    );
    if let Some(memory) = &stats.memory {
        let _ = writeln!(
            out,
            "Memory     {} resident, {} virtual",
            format_bytes(memory.resident_bytes),
            format_bytes(memory.virtual_bytes),
        );
    }
    for resource in &stats.resources {
        let _ = writeln!(
            out,
            "Resource   {:<11} {:?} after {} attempt(s)",
            resource.kind, resource.status, resource.attempts
        );
    }
    out.push('\n');
    out.push_str(&monitor.render_table());
    out.trim_end().to_string()
}

/// One-line description of a loaded document
pub fn describe_document(name: &str, format: &str, size: usize) -> String {
    format!("{} ({}, {})", name, format, format_bytes(size as u64))
}

fn wrap(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.len() > WRAP_WIDTH {
                textwrap::fill(line, WRAP_WIDTH)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
