//! Delegate traits and common types
//!
//! The assistant core never knows how text is extracted, generated,
//! translated or searched; it only calls through these traits. Every
//! delegate reports failures as [`ProviderError`].

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Document format
// ============================================================================

/// 지원하는 문서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Txt,
    Data,
    Csv,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Pdf,
        DocumentFormat::Txt,
        DocumentFormat::Data,
        DocumentFormat::Csv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Txt => "txt",
            DocumentFormat::Data => "data",
            DocumentFormat::Csv => "csv",
        }
    }

    /// Detect the format from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ProviderError::UnsupportedFormat(format!(
                    "{} has no file extension",
                    path.display()
                ))
            })?;
        ext.parse()
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" => Ok(DocumentFormat::Txt),
            "data" => Ok(DocumentFormat::Data),
            "csv" => Ok(DocumentFormat::Csv),
            other => Err(ProviderError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ============================================================================
// Languages
// ============================================================================

/// 출력 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    /// Translator language code
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages a summary can be produced in
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "te", name: "Telugu" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "zh-CN", name: "Chinese" },
];

/// Language the generator writes in
pub const SOURCE_LANGUAGE: &str = "en";

/// Resolve a language by code or English name (case-insensitive)
pub fn find_language(code_or_name: &str) -> Option<&'static Language> {
    let needle = code_or_name.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(needle) || l.name.eq_ignore_ascii_case(needle))
}

// ============================================================================
// Literature
// ============================================================================

/// 문헌 검색 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub link: String,
}

impl Article {
    pub fn footprint(&self) -> usize {
        self.title.len() + self.abstract_text.len() + self.link.len()
    }
}

// ============================================================================
// Delegate traits
// ============================================================================

/// Raw document bytes → plain text
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn extract_text(&self, raw: &[u8], format: DocumentFormat)
        -> Result<String, ProviderError>;
}

/// Text → summary in a target language
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;
}

/// Text + question → answer
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, text: &str, question: &str) -> Result<String, ProviderError>;
}

/// The generative backend answers both summaries and questions
pub trait Generator: Summarizer + QuestionAnswerer {}

impl<T: Summarizer + QuestionAnswerer + ?Sized> Generator for T {}

/// Text → text in a target language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;

    /// Largest input (in chars) one request accepts, if limited
    fn max_request_chars(&self) -> Option<usize> {
        None
    }
}

/// Query → articles
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Article>, ProviderError>;
}
