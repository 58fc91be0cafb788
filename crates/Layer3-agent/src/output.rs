//! Cached operation outputs

use medimind_foundation::MemoryFootprint;
use medimind_provider::Article;
use std::sync::Arc;

use crate::error::{AssistantError, Result};

/// Value stored in the result cache
///
/// Cloning is cheap; the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedOutput {
    Text(Arc<str>),
    Articles(Arc<[Article]>),
}

impl CachedOutput {
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        CachedOutput::Text(text.into())
    }

    pub fn articles(articles: Vec<Article>) -> Self {
        CachedOutput::Articles(articles.into())
    }

    pub fn into_text(self, operation: &str) -> Result<String> {
        match self {
            CachedOutput::Text(text) => Ok(text.to_string()),
            CachedOutput::Articles(_) => Err(AssistantError::UnexpectedCachedValue {
                operation: operation.to_string(),
                expected: "text",
            }),
        }
    }

    pub fn into_articles(self, operation: &str) -> Result<Vec<Article>> {
        match self {
            CachedOutput::Articles(articles) => Ok(articles.to_vec()),
            CachedOutput::Text(_) => Err(AssistantError::UnexpectedCachedValue {
                operation: operation.to_string(),
                expected: "articles",
            }),
        }
    }
}

impl MemoryFootprint for CachedOutput {
    fn footprint(&self) -> usize {
        match self {
            CachedOutput::Text(text) => text.len(),
            CachedOutput::Articles(articles) => articles.iter().map(Article::footprint).sum(),
        }
    }
}
