use crate::chunking::Chunk;
use crate::error::{DocragError, Result};
use crate::index::{FileCatalogEntry, IndexEntry, SearchHit};
use crate::storage::Database;
use ahash::{HashMap, HashMapExt};
use rusqlite::params;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Append-only vector index with exact nearest-neighbor search.
///
/// Entries live in memory in id order for scanning and are written
/// through to the `entries` table in the same transaction that assigns
/// their ids, so a batch is either fully indexed or not at all. Search
/// is a brute-force scan over every candidate: exact results, O(n·D)
/// per query, which is fine at the tens-of-thousands-of-chunks scale
/// this serves.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    database: Database,
}

impl VectorIndex {
    /// Load the index from the database, starting empty when no entries
    /// have ever been inserted.
    ///
    /// Fails with `DimensionMismatch` if any stored entry disagrees with
    /// `dimension`; that means the database was built with a different
    /// embedding model and must not be silently coerced.
    pub fn load(database: Database, dimension: usize) -> Result<Self> {
        let mut entries = Vec::new();

        {
            let conn = database.get_conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, filename, file_type, chunk_index, text, vector, dim
                 FROM entries ORDER BY id",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?;

            for row in rows {
                let (id, filename, file_type, chunk_index, text, blob, dim) = row?;

                if dim as usize != dimension {
                    return Err(DocragError::DimensionMismatch {
                        expected: dimension,
                        actual: dim as usize,
                    });
                }

                entries.push(IndexEntry {
                    id,
                    vector: decode_vector(&blob, dimension)?,
                    chunk: Chunk {
                        text,
                        source_filename: filename,
                        chunk_index: chunk_index as usize,
                        file_type: file_type.parse()?,
                    },
                });
            }
        }

        tracing::info!(
            "Loaded vector index: {} entries ({}D)",
            entries.len(),
            dimension
        );

        Ok(Self {
            entries,
            dimension,
            database,
        })
    }

    /// Append a batch of (vector, chunk) pairs, returning the assigned ids.
    ///
    /// Ids are strictly increasing and never reused (SQLite AUTOINCREMENT
    /// continues from the historical maximum). A dimension mismatch
    /// anywhere in the batch rejects the whole batch before any row is
    /// written.
    pub fn insert(&mut self, batch: Vec<(Vec<f32>, Chunk)>) -> Result<Vec<i64>> {
        for (vector, _) in &batch {
            if vector.len() != self.dimension {
                return Err(DocragError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.database.get_conn()?;
        let tx = conn.transaction()?;
        let created_at = chrono::Utc::now().timestamp();
        let mut ids = Vec::with_capacity(batch.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (filename, file_type, chunk_index, text, vector, dim, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (vector, chunk) in &batch {
                stmt.execute(params![
                    chunk.source_filename,
                    chunk.file_type.as_str(),
                    chunk.chunk_index as i64,
                    chunk.text,
                    encode_vector(vector),
                    self.dimension as i64,
                    created_at,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;

        // The in-memory arena only grows once the transaction is durable.
        for ((vector, chunk), id) in batch.into_iter().zip(&ids) {
            self.entries.push(IndexEntry {
                id: *id,
                vector,
                chunk,
            });
        }

        tracing::debug!(
            "Indexed {} entries (ids {}..={})",
            ids.len(),
            ids[0],
            ids[ids.len() - 1]
        );

        Ok(ids)
    }

    /// Exact k-nearest-neighbor search by squared L2 distance.
    ///
    /// Candidates are restricted to entries whose source filename is in
    /// `filter`; a missing or empty filter scans everything. Results are
    /// ascending by distance, equal distances resolved by smaller id, at
    /// most `k` of them. Fewer than `k` matches is a normal outcome.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&HashSet<String>>,
    ) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(DocragError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let filter = filter.filter(|names| !names.is_empty());

        let mut scored: Vec<(f32, usize)> = Vec::new();
        for (pos, entry) in self.entries.iter().enumerate() {
            if let Some(names) = filter {
                if !names.contains(&entry.chunk.source_filename) {
                    continue;
                }
            }
            scored.push((squared_l2(query, &entry.vector), pos));
        }

        // Entries sit in insertion order, so position order is id order.
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, pos)| SearchHit {
                entry: self.entries[pos].clone(),
                distance,
            })
            .collect())
    }

    /// Checkpoint the WAL so committed batches survive an unclean stop.
    pub fn persist(&self) -> Result<()> {
        let conn = self.database.get_conn()?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        tracing::debug!("Checkpointed vector index ({} entries)", self.entries.len());
        Ok(())
    }

    /// One catalog entry per distinct filename, in first-seen insertion
    /// order. A read-time fold over the entries, never stored separately.
    pub fn file_catalog(&self) -> Vec<FileCatalogEntry> {
        let mut catalog: Vec<FileCatalogEntry> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for entry in &self.entries {
            match positions.get(entry.chunk.source_filename.as_str()) {
                Some(&pos) => catalog[pos].num_chunks += 1,
                None => {
                    positions.insert(&entry.chunk.source_filename, catalog.len());
                    catalog.push(FileCatalogEntry {
                        filename: entry.chunk.source_filename.clone(),
                        file_type: entry.chunk.file_type,
                        num_chunks: 1,
                    });
                }
            }
        }

        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vector(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if blob.len() != dimension * 4 {
        return Err(DocragError::Storage(format!(
            "Stored vector is {} bytes, expected {} for dimension {}",
            blob.len(),
            dimension * 4,
            dimension
        )));
    }

    let mut vector = Vec::with_capacity(dimension);
    for bytes in blob.chunks_exact(4) {
        let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if !value.is_finite() {
            return Err(DocragError::Storage(
                "Stored vector contains non-finite values".to_string(),
            ));
        }
        vector.push(value);
    }

    Ok(vector)
}
