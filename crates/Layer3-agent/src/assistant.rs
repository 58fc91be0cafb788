//! Report Assistant
//!
//! Each operation is one `PerfContext::run_cached` call under its own
//! operation name, so it is timed, served from the cache when a fresh result
//! exists, and computed through the delegates otherwise.
//!
//! | Operation   | Fingerprint parameters          |
//! |-------------|---------------------------------|
//! | `extract`   | document hash, format           |
//! | `summarize` | document hash, language         |
//! | `answer`    | document hash, trimmed question |
//! | `translate` | text, language                  |
//! | `search`    | trimmed query, result limit     |
//!
//! Summaries are generated in English; any other language is the English
//! summary run through the translator in bounded chunks. A batch search is
//! one `search` per query, so each query has its own cache entry.

use medimind_foundation::{
    operations, process_text_in_chunks_async, CacheStats, Fingerprint, MediMindConfig,
    MemoryUsage, MetricsAggregate, PerfContext, ReclaimStats,
};
use medimind_provider::{find_language, Article, Translator, SOURCE_LANGUAGE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{AssistantError, Result};
use crate::output::CachedOutput;
use crate::resources::{AssistantResources, ResourceReport};

/// Snapshot of cache, reclamation, timing and resource state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantStats {
    pub cache: CacheStats,
    pub reclaim: ReclaimStats,
    pub operations: Vec<MetricsAggregate>,
    pub resources: Vec<ResourceReport>,
    /// Process memory, when the platform reports it
    pub memory: Option<MemoryUsage>,
}

/// Cached medical report assistant
#[derive(Clone)]
pub struct ReportAssistant {
    ctx: PerfContext<CachedOutput>,
    resources: Arc<AssistantResources>,
}

impl ReportAssistant {
    pub fn new(ctx: PerfContext<CachedOutput>, resources: Arc<AssistantResources>) -> Self {
        Self { ctx, resources }
    }

    /// Assistant with the concrete delegates
    pub fn from_config(config: &MediMindConfig) -> Self {
        let ctx = PerfContext::new(config.cache.clone(), config.memory.clone());
        let resources = Arc::new(AssistantResources::from_config(config));
        Self::new(ctx, resources)
    }

    pub fn context(&self) -> &PerfContext<CachedOutput> {
        &self.ctx
    }

    pub fn resources(&self) -> &Arc<AssistantResources> {
        &self.resources
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Plain text of a document
    pub async fn extract(&self, doc: &Document) -> Result<String> {
        let fingerprint = Fingerprint::builder(operations::EXTRACT)
            .content(doc.hash())
            .param("format", doc.format())
            .finish();

        self.ctx
            .run_cached(operations::EXTRACT, fingerprint, doc.len(), || async {
                let text = self
                    .resources
                    .parser
                    .extract_text(doc.bytes(), doc.format())
                    .await?;
                debug!(document = doc.name(), chars = text.len(), "extracted document text");
                Ok::<_, AssistantError>(CachedOutput::text(text))
            })
            .await?
            .into_text(operations::EXTRACT)
    }

    /// Summary of a document in `language` (code or English name)
    pub async fn summarize(&self, doc: &Document, language: &str) -> Result<String> {
        let code = language_code(language)?;
        let source = Fingerprint::builder(operations::SUMMARIZE)
            .content(doc.hash())
            .param("lang", SOURCE_LANGUAGE)
            .finish();

        if code == SOURCE_LANGUAGE {
            return self
                .ctx
                .run_cached(operations::SUMMARIZE, source, doc.len(), || {
                    self.generate_summary(doc)
                })
                .await?
                .into_text(operations::SUMMARIZE);
        }

        let fingerprint = Fingerprint::builder(operations::SUMMARIZE)
            .content(doc.hash())
            .param("lang", code)
            .finish();

        self.ctx
            .run_cached(operations::SUMMARIZE, fingerprint, doc.len(), || async {
                // English summary shares the cache entry but not the measurement
                let summary = self
                    .ctx
                    .get_or_compute(operations::SUMMARIZE, source, doc.len(), || {
                        self.generate_summary(doc)
                    })
                    .await?
                    .into_text(operations::SUMMARIZE)?;
                let translated = self.translate_chunked(&summary, code).await?;
                Ok::<_, AssistantError>(CachedOutput::text(translated))
            })
            .await?
            .into_text(operations::SUMMARIZE)
    }

    /// English summary straight from the generator
    async fn generate_summary(&self, doc: &Document) -> Result<CachedOutput> {
        let text = self.extract(doc).await?;
        let generator = self.resources.generator.acquire().await?;
        let summary = generator.summarize(&text, SOURCE_LANGUAGE).await?;
        Ok(CachedOutput::text(summary))
    }

    /// Answer a question about a document
    pub async fn answer(&self, doc: &Document, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::invalid_input("question must not be empty"));
        }

        let fingerprint = Fingerprint::builder(operations::ANSWER)
            .content(doc.hash())
            .param("question", question)
            .finish();

        self.ctx
            .run_cached(
                operations::ANSWER,
                fingerprint,
                doc.len() + question.len(),
                || async {
                    let text = self.extract(doc).await?;
                    let generator = self.resources.generator.acquire().await?;
                    let answer = generator.answer(&text, question).await?;
                    Ok::<_, AssistantError>(CachedOutput::text(answer))
                },
            )
            .await?
            .into_text(operations::ANSWER)
    }

    /// Translate arbitrary text into `language`
    pub async fn translate(&self, text: &str, language: &str) -> Result<String> {
        let code = language_code(language)?;
        let fingerprint = Fingerprint::builder(operations::TRANSLATE)
            .input(text.as_bytes())
            .param("lang", code)
            .finish();

        self.ctx
            .run_cached(operations::TRANSLATE, fingerprint, text.len(), || async {
                let translated = self.translate_chunked(text, code).await?;
                Ok::<_, AssistantError>(CachedOutput::text(translated))
            })
            .await?
            .into_text(operations::TRANSLATE)
    }

    /// Literature matching `query`
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Article>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::invalid_input("search query must not be empty"));
        }
        if max_results == 0 {
            return Err(AssistantError::invalid_input("max results must be at least 1"));
        }

        let fingerprint = Fingerprint::builder(operations::SEARCH)
            .input(query.as_bytes())
            .param("max_results", max_results)
            .finish();

        self.ctx
            .run_cached(operations::SEARCH, fingerprint, query.len(), || async {
                let literature = self.resources.literature.acquire().await?;
                let articles = literature.search(query, max_results).await?;
                info!(query, found = articles.len(), "literature search finished");
                Ok::<_, AssistantError>(CachedOutput::articles(articles))
            })
            .await?
            .into_articles(operations::SEARCH)
    }

    /// Literature for several queries, in query order
    ///
    /// Each query goes through [`search`](Self::search). A query that fails
    /// or is blank yields an empty list instead of failing the batch.
    pub async fn search_batch(
        &self,
        queries: &[&str],
        max_results: usize,
    ) -> Result<Vec<(String, Vec<Article>)>> {
        if max_results == 0 {
            return Err(AssistantError::invalid_input("max results must be at least 1"));
        }

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let articles = match self.search(query, max_results).await {
                Ok(articles) => articles,
                Err(e) => {
                    warn!(query = query.trim(), error = %e, "batch search query failed");
                    Vec::new()
                }
            };
            results.push((query.trim().to_string(), articles));
        }
        Ok(results)
    }

    /// Translate in chunks no longer than the translator accepts
    async fn translate_chunked(&self, text: &str, code: &str) -> Result<String> {
        let translator: Arc<dyn Translator> = self.resources.translator.acquire().await?;
        let chunk_size = match translator.max_request_chars() {
            Some(limit) => self.ctx.chunk_size().min(limit),
            None => self.ctx.chunk_size(),
        };

        let translated = process_text_in_chunks_async(text, chunk_size, |chunk| {
            let translator = Arc::clone(&translator);
            let code = code.to_string();
            async move { translator.translate(&chunk, &code).await }
        })
        .await?;
        Ok(translated)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn stats(&self) -> AssistantStats {
        AssistantStats {
            cache: self.ctx.cache().stats(),
            reclaim: self.ctx.reclaimer().stats(),
            operations: self.ctx.monitor().snapshot(),
            resources: self.resources.reports(),
            memory: MemoryUsage::current(),
        }
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.ctx.cache().clear();
    }
}

impl std::fmt::Debug for ReportAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAssistant")
            .field("ctx", &self.ctx)
            .field("resources", &self.resources)
            .finish()
    }
}

/// Normalize a language code or name to a supported code
pub fn language_code(language: &str) -> Result<&'static str> {
    find_language(language).map(|l| l.code).ok_or_else(|| {
        AssistantError::invalid_input(format!("unsupported language '{}'", language.trim()))
    })
}
