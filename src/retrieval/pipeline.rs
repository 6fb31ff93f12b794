use crate::chunking::{Chunk, Chunker, FileType};
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{DocragError, Result};
use crate::generation::GenerationProvider;
use crate::index::{FileCatalogEntry, VectorIndex};
use crate::retrieval::{assemble_context, IngestReport, QueryOutcome, SourceInfo};
use crate::storage::StorageManager;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Answer returned when the active file set holds no matching chunks
pub const NO_RESULTS_ANSWER: &str = "No relevant information found in the indexed documents.";

/// First line of the answer when generation is unavailable; keeps the
/// fallback clearly distinguishable from generated prose
pub const FALLBACK_PREFIX: &str =
    "Answer generation is unavailable. Showing the retrieved passages instead.";

/// Orchestrates the retrieval pipeline around the single process-wide
/// vector index.
///
/// Ingest runs chunk, embed, insert as one unit and is all-or-nothing
/// with respect to the index. Queries validate before any embedding
/// work, search under a shared read lock, and survive generation
/// failures by answering with the retrieved passages. Inserts take the
/// write lock, so a search sees a batch fully or not at all.
pub struct RetrievalPipeline {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<RwLock<VectorIndex>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    storage: StorageManager,
    context_budget: usize,
    archive_documents: bool,
    flush_after_insert: bool,
}

impl RetrievalPipeline {
    /// Wire up the pipeline from configuration, storage, and providers.
    ///
    /// The embedder is injected rather than constructed here so callers
    /// can substitute a deterministic double. Its dimension must agree
    /// with the configured one; a disagreement means the config and the
    /// loaded model describe different indexes and is refused outright.
    pub fn new(
        config: &Config,
        storage: StorageManager,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Option<Arc<dyn GenerationProvider>>,
    ) -> Result<Self> {
        if embedder.dimension() != config.embedding.dimension {
            return Err(DocragError::DimensionMismatch {
                expected: config.embedding.dimension,
                actual: embedder.dimension(),
            });
        }

        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let index = VectorIndex::load(storage.database.clone(), embedder.dimension())?;

        Ok(Self {
            chunker,
            embedder,
            index: Arc::new(RwLock::new(index)),
            generator,
            storage,
            context_budget: config.generation.context_budget,
            archive_documents: config.storage.archive_documents,
            flush_after_insert: config.index.flush_after_insert,
        })
    }

    /// Chunk, embed, and index one document's extracted text.
    ///
    /// Zero chunks (empty or whitespace-only text) is a success, not an
    /// error. Any failure along the way leaves the index exactly as it
    /// was; no chunk is ever indexed without its vector.
    pub async fn ingest(
        &self,
        filename: &str,
        file_type: FileType,
        raw_text: &str,
    ) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(raw_text, filename, file_type);

        if self.archive_documents {
            self.storage.archive_document(filename, file_type, raw_text)?;
        }

        if chunks.is_empty() {
            tracing::info!("Ingested {}: 0 chunks created", filename);
            return Ok(IngestReport {
                filename: filename.to_string(),
                chunks_created: 0,
                file_type,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;

        let batch: Vec<(Vec<f32>, Chunk)> = vectors.into_iter().zip(chunks).collect();
        let chunks_created = batch.len();

        {
            let mut index = self.index.write().await;
            index.insert(batch)?;
            if self.flush_after_insert {
                index.persist()?;
            }
        }

        tracing::info!("Ingested {}: {} chunks created", filename, chunks_created);

        Ok(IngestReport {
            filename: filename.to_string(),
            chunks_created,
            file_type,
        })
    }

    /// Answer a question from passages retrieved out of the active files.
    ///
    /// A blank question, an empty active set, or a zero `top_k` fail with
    /// `InvalidQuery` before any embedding or search work is spent. When
    /// the generation adapter is disabled or unreachable the answer falls
    /// back to the assembled passages; retrieval results are returned
    /// either way.
    pub async fn query(
        &self,
        question: &str,
        active_files: &HashSet<String>,
        top_k: usize,
    ) -> Result<QueryOutcome> {
        if question.trim().is_empty() {
            return Err(DocragError::invalid_query("question must not be blank"));
        }
        if active_files.is_empty() {
            return Err(DocragError::invalid_query(
                "active file set must not be empty",
            ));
        }
        if top_k == 0 {
            return Err(DocragError::invalid_query("top_k must be greater than zero"));
        }

        let query_vector = self.embedder.embed(question)?;

        let hits = {
            let index = self.index.read().await;
            index.search(&query_vector, top_k, Some(active_files))?
        };

        if hits.is_empty() {
            tracing::info!("Query matched nothing in {} active file(s)", active_files.len());
            return Ok(QueryOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let sources: Vec<SourceInfo> = hits
            .iter()
            .map(|hit| SourceInfo {
                filename: hit.entry.chunk.source_filename.clone(),
                chunk_text: hit.entry.chunk.text.clone(),
                score: hit.score(),
                chunk_index: hit.entry.chunk.chunk_index,
            })
            .collect();

        let context = assemble_context(&sources, self.context_budget);

        // Generation runs strictly after retrieval; it can fail without
        // taking the query down with it.
        let answer = match &self.generator {
            Some(generator) => match generator.generate(question, &context).await {
                Ok(answer) => answer,
                Err(DocragError::GenerationUnavailable(reason)) => {
                    tracing::warn!(
                        "Generation unavailable, answering with retrieved context: {}",
                        reason
                    );
                    fallback_answer(&context)
                }
                Err(e) => return Err(e),
            },
            None => fallback_answer(&context),
        };

        tracing::debug!(
            "Query retrieved {} source(s), top score {:.3}",
            sources.len(),
            sources[0].score
        );

        Ok(QueryOutcome { answer, sources })
    }

    /// One catalog entry per distinct indexed filename, in first-seen
    /// insertion order.
    pub async fn list_files(&self) -> Vec<FileCatalogEntry> {
        self.index.read().await.file_catalog()
    }

    /// Number of entries currently indexed
    pub async fn entry_count(&self) -> usize {
        self.index.read().await.len()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }
}

fn fallback_answer(context: &str) -> String {
    format!("{}\n\n{}", FALLBACK_PREFIX, context)
}
