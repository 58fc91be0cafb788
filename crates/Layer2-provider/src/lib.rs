//! # medimind-provider
//!
//! Delegate layer for MediMind.
//! The assistant core calls external collaborators only through the traits
//! defined here; this crate also ships the concrete implementations.
//!
//! ## Features
//! - Document parsing (txt, data, csv)
//! - Summaries and answers from Google Gemini
//! - Translation through Google Translate
//! - Literature search through PubMed E-utilities

pub mod error;
pub mod parser;
pub mod providers;
pub mod r#trait;

// Core traits and types
pub use r#trait::{
    find_language, Article, DocumentFormat, DocumentParser, Generator, Language,
    LiteratureSearch, QuestionAnswerer, Summarizer, Translator, SOURCE_LANGUAGE,
    SUPPORTED_LANGUAGES,
};

// Error
pub use error::ProviderError;

// Implementations
pub use parser::TextDocumentParser;
pub use providers::gemini::GeminiClient;
pub use providers::google_translate::GoogleTranslator;
pub use providers::pubmed::PubMedClient;
