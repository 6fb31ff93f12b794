//! End-to-end retrieval pipeline tests
//!
//! Run ingest, query, and catalog flows over real storage with the
//! deterministic hashed embedder, so the whole suite works offline.

use async_trait::async_trait;
use docrag::chunking::FileType;
use docrag::config::Config;
use docrag::embedding::{EmbeddingProvider, HashedEmbedder};
use docrag::error::{DocragError, Result};
use docrag::generation::GenerationProvider;
use docrag::retrieval::{RetrievalPipeline, FALLBACK_PREFIX, NO_RESULTS_ANSWER};
use docrag::storage::StorageManager;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 16;

fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.embedding.dimension = DIM;
    config
}

fn pipeline_with(
    config: &Config,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Option<Arc<dyn GenerationProvider>>,
) -> RetrievalPipeline {
    let storage = StorageManager::new(config.storage.data_dir.clone()).unwrap();
    RetrievalPipeline::new(config, storage, embedder, generator).unwrap()
}

fn hashed_pipeline(config: &Config) -> RetrievalPipeline {
    pipeline_with(config, Arc::new(HashedEmbedder::new(DIM)), None)
}

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn active(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Counts embedding calls so tests can prove validation happens first
struct CountingEmbedder {
    inner: HashedEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashedEmbedder::new(DIM),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for CountingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

/// Always fails, as a model whose weights never loaded would
struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(DocragError::EmbeddingUnavailable("stub failure".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(DocragError::EmbeddingUnavailable("stub failure".to_string()))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Stands in for an Ollama daemon that is not running
struct DownGenerator;

#[async_trait]
impl GenerationProvider for DownGenerator {
    async fn generate(&self, _question: &str, _context: &str) -> Result<String> {
        Err(DocragError::GenerationUnavailable(
            "connection refused".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// Echoes its inputs so tests can see exactly what generation received
struct EchoGenerator;

#[async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        Ok(format!("Q<{}> CTX<{}>", question, context))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[tokio::test]
async fn ingest_reports_expected_chunk_count() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    // 1200 tokens under 500/100 windows: [0,500), [400,900), [800,1200)
    let report = pipeline
        .ingest("doc.txt", FileType::Txt, &words("tok", 1200))
        .await
        .unwrap();

    assert_eq!(report.filename, "doc.txt");
    assert_eq!(report.chunks_created, 3);
    assert_eq!(report.file_type, FileType::Txt);
    assert_eq!(pipeline.entry_count().await, 3);

    let catalog = pipeline.list_files().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].filename, "doc.txt");
    assert_eq!(catalog[0].num_chunks, 3);
}

#[tokio::test]
async fn query_returns_top_k_sources_in_score_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    pipeline
        .ingest("a.txt", FileType::Txt, &words("alpha", 1200))
        .await
        .unwrap();
    pipeline
        .ingest("b.txt", FileType::Txt, &words("beta", 1200))
        .await
        .unwrap();

    let outcome = pipeline
        .query("alpha0 alpha1 alpha2", &active(&["a.txt"]), 2)
        .await
        .unwrap();

    assert_eq!(outcome.sources.len(), 2);
    for source in &outcome.sources {
        assert_eq!(source.filename, "a.txt");
        assert!(source.score > 0.0 && source.score <= 1.0);
    }
    assert!(outcome.sources[0].score >= outcome.sources[1].score);
}

#[tokio::test]
async fn inactive_files_never_contribute_sources() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    pipeline
        .ingest("a.txt", FileType::Txt, "shared words here")
        .await
        .unwrap();
    pipeline
        .ingest("b.txt", FileType::Txt, "shared words here")
        .await
        .unwrap();

    // b.txt holds an identical chunk but is not active
    let outcome = pipeline
        .query("shared words", &active(&["a.txt"]), 10)
        .await
        .unwrap();

    assert!(!outcome.sources.is_empty());
    for source in &outcome.sources {
        assert_eq!(source.filename, "a.txt");
    }
}

#[tokio::test]
async fn blank_question_is_rejected_before_embedding() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let embedder = Arc::new(CountingEmbedder::new());
    let pipeline = pipeline_with(&config, embedder.clone(), None);

    pipeline
        .ingest("a.txt", FileType::Txt, "some indexed text")
        .await
        .unwrap();
    assert_eq!(embedder.calls(), 1);

    let result = pipeline.query("   \n\t  ", &active(&["a.txt"]), 5).await;
    assert!(matches!(result, Err(DocragError::InvalidQuery { .. })));

    // The question never reached the embedder
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn empty_active_set_is_rejected_before_embedding() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let embedder = Arc::new(CountingEmbedder::new());
    let pipeline = pipeline_with(&config, embedder.clone(), None);

    let result = pipeline
        .query("a perfectly good question", &HashSet::new(), 5)
        .await;

    assert!(matches!(result, Err(DocragError::InvalidQuery { .. })));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    let result = pipeline
        .query("a question", &active(&["a.txt"]), 0)
        .await;

    assert!(matches!(result, Err(DocragError::InvalidQuery { .. })));
}

#[tokio::test]
async fn generation_failure_falls_back_to_retrieved_context() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = pipeline_with(
        &config,
        Arc::new(HashedEmbedder::new(DIM)),
        Some(Arc::new(DownGenerator)),
    );

    pipeline
        .ingest("notes.txt", FileType::Txt, "the deadline is friday")
        .await
        .unwrap();

    let outcome = pipeline
        .query("when is the deadline", &active(&["notes.txt"]), 5)
        .await
        .unwrap();

    assert!(outcome.answer.starts_with(FALLBACK_PREFIX));
    assert!(outcome.answer.contains("[Source 1: notes.txt, chunk 0]"));
    assert!(outcome.answer.contains("the deadline is friday"));
    assert_eq!(outcome.sources.len(), 1);
}

#[tokio::test]
async fn disabled_generation_uses_the_fallback_deterministically() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    pipeline
        .ingest("notes.txt", FileType::Txt, "the meeting room is 4b")
        .await
        .unwrap();

    let outcome = pipeline
        .query("where is the meeting", &active(&["notes.txt"]), 5)
        .await
        .unwrap();

    assert!(outcome.answer.starts_with(FALLBACK_PREFIX));
    assert!(outcome.answer.contains("the meeting room is 4b"));
}

#[tokio::test]
async fn generator_receives_question_and_assembled_context() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = pipeline_with(
        &config,
        Arc::new(HashedEmbedder::new(DIM)),
        Some(Arc::new(EchoGenerator)),
    );

    pipeline
        .ingest("facts.txt", FileType::Txt, "water boils at one hundred degrees")
        .await
        .unwrap();

    let outcome = pipeline
        .query("boiling point of water", &active(&["facts.txt"]), 3)
        .await
        .unwrap();

    assert!(outcome.answer.contains("Q<boiling point of water>"));
    assert!(outcome.answer.contains("[Source 1: facts.txt, chunk 0]"));
    assert!(outcome.answer.contains("water boils at one hundred degrees"));
}

#[tokio::test]
async fn no_matching_chunks_yield_the_fixed_answer() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    pipeline
        .ingest("a.txt", FileType::Txt, "indexed content")
        .await
        .unwrap();

    // Active set is valid but names a file with no entries
    let outcome = pipeline
        .query("anything at all", &active(&["ghost.txt"]), 5)
        .await
        .unwrap();

    assert_eq!(outcome.answer, NO_RESULTS_ANSWER);
    assert!(outcome.sources.is_empty());
}

#[tokio::test]
async fn empty_document_ingests_cleanly_with_zero_chunks() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    pipeline
        .ingest("real.txt", FileType::Txt, "actual content")
        .await
        .unwrap();

    let report = pipeline
        .ingest("empty.txt", FileType::Txt, "  \n \t  ")
        .await
        .unwrap();
    assert_eq!(report.chunks_created, 0);

    // Other files' catalog entries are untouched and the empty file
    // never appears
    let catalog = pipeline.list_files().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].filename, "real.txt");
    assert_eq!(catalog[0].num_chunks, 1);
    assert_eq!(pipeline.entry_count().await, 1);
}

#[tokio::test]
async fn reingest_appends_instead_of_replacing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    let text = words("tok", 1200);
    pipeline.ingest("doc.txt", FileType::Txt, &text).await.unwrap();
    pipeline.ingest("doc.txt", FileType::Txt, &text).await.unwrap();

    assert_eq!(pipeline.entry_count().await, 6);

    let catalog = pipeline.list_files().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].num_chunks, 6);
}

#[tokio::test]
async fn catalog_lists_files_in_first_seen_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = hashed_pipeline(&config);

    for name in ["c.txt", "a.txt", "b.txt"] {
        pipeline
            .ingest(name, FileType::Txt, "a few words")
            .await
            .unwrap();
    }

    let names: Vec<String> = pipeline
        .list_files()
        .await
        .into_iter()
        .map(|e| e.filename)
        .collect();

    assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
}

#[tokio::test]
async fn failed_embedding_leaves_the_index_untouched() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = pipeline_with(&config, Arc::new(FailingEmbedder), None);

    let result = pipeline
        .ingest("doc.txt", FileType::Txt, "text that never gets vectors")
        .await;

    assert!(matches!(
        result,
        Err(DocragError::EmbeddingUnavailable(_))
    ));
    assert_eq!(pipeline.entry_count().await, 0);
    assert!(pipeline.list_files().await.is_empty());
}

#[tokio::test]
async fn index_reloads_across_pipeline_restarts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    {
        let pipeline = hashed_pipeline(&config);
        pipeline
            .ingest("kept.txt", FileType::Txt, "durable indexed text")
            .await
            .unwrap();
    }

    let pipeline = hashed_pipeline(&config);
    assert_eq!(pipeline.entry_count().await, 1);

    let outcome = pipeline
        .query("durable text", &active(&["kept.txt"]), 5)
        .await
        .unwrap();

    assert_eq!(outcome.sources.len(), 1);
    assert!(outcome.answer.contains("durable indexed text"));
}

#[test]
fn embedder_must_match_the_configured_dimension() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.embedding.dimension = 384;

    let storage = StorageManager::new(config.storage.data_dir.clone()).unwrap();
    let result = RetrievalPipeline::new(
        &config,
        storage,
        Arc::new(HashedEmbedder::new(DIM)),
        None,
    );

    assert!(matches!(
        result,
        Err(DocragError::DimensionMismatch {
            expected: 384,
            actual: DIM
        })
    ));
}
