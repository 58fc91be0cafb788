//! End-to-end assistant flows against in-memory delegates

use async_trait::async_trait;
use futures::future::join_all;
use medimind_assistant::{kinds, AssistantError, AssistantResources, Document, ReportAssistant};
use medimind_foundation::{
    operations, CacheConfig, LazyResource, PerfContext, ReclaimConfig, ResourceStatus,
};
use medimind_provider::{
    Article, DocumentFormat, DocumentParser, Generator, LiteratureSearch, ProviderError,
    QuestionAnswerer, Summarizer, TextDocumentParser, Translator,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const REPORT: &str = "Patient: 54M. HbA1c 7.2%. Fasting glucose 142 mg/dL. LDL 131 mg/dL.";

// ============================================================================
// Delegates
// ============================================================================

#[derive(Default)]
struct CountingParser {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentParser for CountingParser {
    async fn extract_text(&self, raw: &[u8], format: DocumentFormat) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TextDocumentParser::new().extract_text(raw, format).await
    }
}

#[derive(Default)]
struct MockGenerator {
    summaries: AtomicUsize,
    answers: AtomicUsize,
    fail_next: AtomicBool,
}

#[async_trait]
impl Summarizer for MockGenerator {
    async fn summarize(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        self.summaries.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::ServerError("model overloaded".into()));
        }
        Ok(format!("summary({}) of {} chars", target_language, text.len()))
    }
}

#[async_trait]
impl QuestionAnswerer for MockGenerator {
    async fn answer(&self, _text: &str, question: &str) -> Result<String, ProviderError> {
        self.answers.fetch_add(1, Ordering::SeqCst);
        Ok(format!("answer to '{}'", question))
    }
}

/// Upper-cases its input and records the size of every request
struct MockTranslator {
    limit: Option<usize>,
    requests: Mutex<Vec<usize>>,
}

impl MockTranslator {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<usize> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _target_language: &str) -> Result<String, ProviderError> {
        let chars = text.chars().count();
        if let Some(limit) = self.limit {
            if chars > limit {
                return Err(ProviderError::InvalidRequest(format!("{} > {}", chars, limit)));
            }
        }
        self.requests.lock().push(chars);
        Ok(text.to_uppercase())
    }

    fn max_request_chars(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Default)]
struct MockLiterature {
    searches: AtomicUsize,
}

#[async_trait]
impl LiteratureSearch for MockLiterature {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Article>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok((0..max_results.min(2))
            .map(|i| Article {
                title: format!("{} study {}", query, i),
                abstract_text: "Abstract".into(),
                link: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", i + 1),
            })
            .collect())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    assistant: ReportAssistant,
    parser: Arc<CountingParser>,
    generator: Arc<MockGenerator>,
    translator: Arc<MockTranslator>,
    literature: Arc<MockLiterature>,
}

fn harness_with(reclaim: ReclaimConfig, translator_limit: Option<usize>) -> Harness {
    let parser = Arc::new(CountingParser::default());
    let generator = Arc::new(MockGenerator::default());
    let translator = Arc::new(MockTranslator::new(translator_limit));
    let literature = Arc::new(MockLiterature::default());

    let resources = AssistantResources::new(
        Arc::clone(&parser) as Arc<dyn DocumentParser>,
        LazyResource::ready(kinds::GENERATOR, Arc::clone(&generator) as Arc<dyn Generator>),
        LazyResource::ready(kinds::TRANSLATOR, Arc::clone(&translator) as Arc<dyn Translator>),
        LazyResource::ready(
            kinds::LITERATURE,
            Arc::clone(&literature) as Arc<dyn LiteratureSearch>,
        ),
    );
    let ctx = PerfContext::new(CacheConfig::default(), reclaim);

    Harness {
        assistant: ReportAssistant::new(ctx, Arc::new(resources)),
        parser,
        generator,
        translator,
        literature,
    }
}

fn harness() -> Harness {
    harness_with(ReclaimConfig::default(), Some(5000))
}

fn report() -> Document {
    Document::new("report.txt", DocumentFormat::Txt, REPORT.as_bytes().to_vec())
}

// ============================================================================
// Flows
// ============================================================================

#[tokio::test]
async fn test_summary_cached_then_translated() {
    let h = harness();
    let doc = report();

    let first = h.assistant.summarize(&doc, "en").await.unwrap();
    let second = h.assistant.summarize(&doc, "English").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.generator.summaries.load(Ordering::SeqCst), 1);
    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 1);
    assert!(h.translator.requests().is_empty());

    // different language: new entry, English summary reused, one translation
    let hindi = h.assistant.summarize(&doc, "hi").await.unwrap();
    assert_eq!(hindi, first.to_uppercase());
    assert_eq!(h.generator.summaries.load(Ordering::SeqCst), 1);
    assert_eq!(h.translator.requests().len(), 1);

    let summarize = h.assistant.monitor_snapshot(operations::SUMMARIZE);
    assert_eq!(summarize.failures, 0);
    assert_eq!(summarize.count, 3);
}

#[tokio::test]
async fn test_translated_summary_counts_one_call() {
    let h = harness();
    let doc = report();

    let hindi = h.assistant.summarize(&doc, "hi").await.unwrap();
    assert_eq!(h.generator.summaries.load(Ordering::SeqCst), 1);
    assert_eq!(h.translator.requests().len(), 1);

    let summarize = h.assistant.monitor_snapshot(operations::SUMMARIZE);
    assert_eq!(summarize.count, 1);
    assert_eq!(summarize.failures, 0);

    // the English summary produced on the way is cached for later calls
    let english = h.assistant.summarize(&doc, "en").await.unwrap();
    assert_eq!(hindi, english.to_uppercase());
    assert_eq!(h.generator.summaries.load(Ordering::SeqCst), 1);
    assert_eq!(h.assistant.monitor_snapshot(operations::SUMMARIZE).count, 2);
}

#[tokio::test]
async fn test_answers_keyed_by_trimmed_question() {
    let h = harness();
    let doc = report();

    let a = h.assistant.answer(&doc, "Is HbA1c high?").await.unwrap();
    let b = h.assistant.answer(&doc, "  Is HbA1c high?\n").await.unwrap();
    assert_eq!(a, "answer to 'Is HbA1c high?'");
    assert_eq!(a, b);
    assert_eq!(h.generator.answers.load(Ordering::SeqCst), 1);

    h.assistant.answer(&doc, "What about LDL?").await.unwrap();
    assert_eq!(h.generator.answers.load(Ordering::SeqCst), 2);
    // extraction ran once for both questions
    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_inputs_rejected_without_delegate_calls() {
    let h = harness();
    let doc = report();

    let err = h.assistant.answer(&doc, "   ").await.unwrap_err();
    assert!(matches!(err, AssistantError::InvalidInput(_)));
    assert!(err.is_user_facing());

    assert!(matches!(
        h.assistant.search("", 5).await,
        Err(AssistantError::InvalidInput(_))
    ));
    assert!(matches!(
        h.assistant.search("metformin", 0).await,
        Err(AssistantError::InvalidInput(_))
    ));
    assert!(matches!(
        h.assistant.summarize(&doc, "klingon").await,
        Err(AssistantError::InvalidInput(_))
    ));

    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.generator.answers.load(Ordering::SeqCst), 0);
    assert_eq!(h.literature.searches.load(Ordering::SeqCst), 0);
    assert!(h.assistant.context().cache().is_empty());
}

#[tokio::test]
async fn test_translation_chunked_to_smallest_limit() {
    let text = "abcdefghij".repeat(3);

    // configured chunk size is the tighter bound
    let h = harness_with(
        ReclaimConfig {
            chunk_size: 10,
            ..Default::default()
        },
        Some(5000),
    );
    let out = h.assistant.translate(&text, "fr").await.unwrap();
    assert_eq!(out, text.to_uppercase());
    assert_eq!(h.translator.requests(), vec![10, 10, 10]);

    // translator limit is the tighter bound
    let h = harness_with(ReclaimConfig::default(), Some(8));
    let out = h.assistant.translate(&text, "fr").await.unwrap();
    assert_eq!(out, text.to_uppercase());
    assert_eq!(h.translator.requests(), vec![8, 8, 8, 6]);

    // short text goes out whole
    let h = harness();
    h.assistant.translate("short", "de").await.unwrap();
    assert_eq!(h.translator.requests(), vec![5]);
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let h = harness();
    let doc = report();
    h.generator.fail_next.store(true, Ordering::SeqCst);

    let err = h.assistant.summarize(&doc, "en").await.unwrap_err();
    assert_eq!(
        err,
        AssistantError::Delegate(ProviderError::ServerError("model overloaded".into()))
    );
    assert!(err.is_retryable());

    let ok = h.assistant.summarize(&doc, "en").await.unwrap();
    assert!(ok.starts_with("summary(en)"));
    assert_eq!(h.generator.summaries.load(Ordering::SeqCst), 2);

    let agg = h.assistant.monitor_snapshot(operations::SUMMARIZE);
    assert_eq!(agg.failures, 1);
}

#[tokio::test]
async fn test_search_cached_per_limit() {
    let h = harness();

    let articles = h.assistant.search(" metformin ", 5).await.unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "metformin study 0");

    h.assistant.search("metformin", 5).await.unwrap();
    assert_eq!(h.literature.searches.load(Ordering::SeqCst), 1);

    let one = h.assistant.search("metformin", 1).await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(h.literature.searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_search_batch_routes_each_query_through_cache() {
    let h = harness();
    h.assistant.search("metformin", 3).await.unwrap();

    let results = h
        .assistant
        .search_batch(&["metformin", " statins ", "   "], 3)
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "metformin");
    assert_eq!(results[1].0, "statins");
    assert_eq!(results[1].1[0].title, "statins study 0");
    // a blank query yields nothing and never reaches the delegate
    assert!(results[2].1.is_empty());
    assert_eq!(h.literature.searches.load(Ordering::SeqCst), 2);

    let search = h.assistant.monitor_snapshot(operations::SEARCH);
    assert_eq!(search.count, 3);
    assert_eq!(h.assistant.context().cache().stats().hits, 1);

    assert!(matches!(
        h.assistant.search_batch(&["metformin"], 0).await,
        Err(AssistantError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_init_failure_surfaces_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let generator: LazyResource<dyn Generator> = LazyResource::new(kinds::GENERATOR, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<Arc<dyn Generator>, _>(anyhow::anyhow!("GEMINI_KEY is not set"))
        }
    });

    let resources = AssistantResources::new(
        Arc::new(TextDocumentParser::new()),
        generator,
        LazyResource::ready(
            kinds::TRANSLATOR,
            Arc::new(MockTranslator::new(None)) as Arc<dyn Translator>,
        ),
        LazyResource::ready(
            kinds::LITERATURE,
            Arc::new(MockLiterature::default()) as Arc<dyn LiteratureSearch>,
        ),
    );
    let assistant = ReportAssistant::new(
        PerfContext::new(CacheConfig::default(), ReclaimConfig::default()),
        Arc::new(resources),
    );
    let doc = report();

    let err = assistant.summarize(&doc, "en").await.unwrap_err();
    match &err {
        AssistantError::ResourceInit(init) => {
            assert_eq!(init.kind, kinds::GENERATOR);
            assert_eq!(init.attempt, 1);
            assert!(init.reason.contains("GEMINI_KEY"));
        }
        other => panic!("expected init failure, got {other:?}"),
    }

    // the failure is not sticky: the next call tries again
    assistant.answer(&doc, "anything?").await.unwrap_err();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    // other resources are unaffected
    assert_eq!(assistant.search("statins", 1).await.unwrap().len(), 1);

    let stats = assistant.stats();
    assert_eq!(stats.resources[0].status, ResourceStatus::Failed);
    assert_eq!(stats.resources[2].status, ResourceStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_builds_generator_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let generator: LazyResource<dyn Generator> = LazyResource::new(kinds::GENERATOR, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            anyhow::Ok(Arc::new(MockGenerator::default()) as Arc<dyn Generator>)
        }
    });

    let resources = AssistantResources::new(
        Arc::new(TextDocumentParser::new()),
        generator,
        LazyResource::ready(
            kinds::TRANSLATOR,
            Arc::new(MockTranslator::new(None)) as Arc<dyn Translator>,
        ),
        LazyResource::ready(
            kinds::LITERATURE,
            Arc::new(MockLiterature::default()) as Arc<dyn LiteratureSearch>,
        ),
    );
    let assistant = ReportAssistant::new(
        PerfContext::new(CacheConfig::default(), ReclaimConfig::default()),
        Arc::new(resources),
    );

    let docs: Vec<Document> = (0..8)
        .map(|i| {
            Document::new(
                format!("report-{i}.txt"),
                DocumentFormat::Txt,
                format!("{REPORT} visit {i}").into_bytes(),
            )
        })
        .collect();

    let results = join_all(docs.iter().map(|doc| assistant.summarize(doc, "en"))).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let stats = assistant.stats();
    assert_eq!(stats.resources[0].status, ResourceStatus::Ready);
    assert_eq!(stats.resources[0].attempts, 1);
    assert_eq!(stats.cache.entries, docs.len() * 2);
}

#[tokio::test]
async fn test_unsupported_format_surfaces_verbatim() {
    let h = harness();
    let pdf = Document::new("scan.pdf", DocumentFormat::Pdf, b"%PDF-1.7".to_vec());

    let err = h.assistant.extract(&pdf).await.unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Delegate(ProviderError::UnsupportedFormat(_))
    ));
    assert!(h.assistant.context().cache().is_empty());
}

#[tokio::test]
async fn test_stats_serialize() {
    let h = harness();
    h.assistant.summarize(&report(), "en").await.unwrap();

    let json = serde_json::to_value(h.assistant.stats()).unwrap();
    assert_eq!(json["cache"]["entries"], 2);
    assert!(json["operations"].as_array().unwrap().len() >= 2);
    assert_eq!(json["resources"][0]["kind"], "generator");
    if cfg!(target_os = "linux") {
        assert!(json["memory"]["residentBytes"].as_u64().unwrap() > 0);
    }

    h.assistant.clear_cache();
    assert!(h.assistant.context().cache().is_empty());
}

trait MonitorSnapshot {
    fn monitor_snapshot(&self, operation: &str) -> medimind_foundation::MetricsAggregate;
}

impl MonitorSnapshot for ReportAssistant {
    fn monitor_snapshot(&self, operation: &str) -> medimind_foundation::MetricsAggregate {
        self.context()
            .monitor()
            .get(operation)
            .unwrap_or_else(|| panic!("no metrics for {operation}"))
    }
}
