//! Storage layer
//!
//! Coordinates the SQLite database (index entries, document catalog) and
//! the content-addressed archive of raw document text. Everything lives
//! under `<data_dir>/store`.

pub mod archive;
pub mod database;

use crate::chunking::FileType;
use crate::error::{DocragError, Result};
use rusqlite::params;
use std::path::{Path, PathBuf};

pub use archive::DocumentArchive;
pub use database::{Database, DbPool, DbStats};

/// Compress archived documents larger than this many bytes
const COMPRESSION_THRESHOLD: usize = 1024;

/// Storage manager coordinating the archive and the database
pub struct StorageManager {
    pub archive: DocumentArchive,
    pub database: Database,
    base_path: PathBuf,
}

impl StorageManager {
    /// Create a new storage manager rooted at `base_path`
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let store_dir = base_path.join("store");

        std::fs::create_dir_all(&store_dir).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to create store directory: {}", store_dir.display()),
        })?;

        let archive = DocumentArchive::new(store_dir.clone(), COMPRESSION_THRESHOLD)?;

        let db_path = store_dir.join("db.sqlite");
        let database = Database::new(&db_path)?;

        Ok(Self {
            archive,
            database,
            base_path,
        })
    }

    /// Path holding the database and archive
    pub fn store_dir(&self) -> PathBuf {
        self.base_path.join("store")
    }

    /// Archive a document's raw text and record its catalog row.
    ///
    /// Re-ingesting a filename replaces its catalog row; the previous
    /// blob stays in the archive keyed by its content hash.
    pub fn archive_document(
        &self,
        filename: &str,
        file_type: FileType,
        raw_text: &str,
    ) -> Result<String> {
        let (hash, compressed, is_new) = self.archive.write(raw_text.as_bytes())?;

        let conn = self.database.get_conn()?;
        conn.execute(
            "INSERT INTO documents (filename, file_type, content_hash, size, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(filename) DO UPDATE SET
                file_type = excluded.file_type,
                content_hash = excluded.content_hash,
                size = excluded.size,
                ingested_at = excluded.ingested_at",
            params![
                filename,
                file_type.as_str(),
                &hash,
                raw_text.len() as i64,
                chrono::Utc::now().timestamp()
            ],
        )?;

        tracing::debug!(
            "Archived {} ({} bytes, compressed: {}, new blob: {})",
            filename,
            raw_text.len(),
            compressed,
            is_new
        );

        Ok(hash)
    }

    /// Get combined storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let db_stats = self.database.stats()?;

        Ok(StorageStats {
            db: db_stats,
            disk_size: Self::dir_size(&self.store_dir())?,
        })
    }

    /// Calculate directory size recursively
    fn dir_size(path: &Path) -> Result<u64> {
        let mut size = 0u64;

        if path.is_dir() {
            for entry in std::fs::read_dir(path).map_err(|e| DocragError::Io {
                source: e,
                context: format!("Failed to read directory: {}", path.display()),
            })? {
                let entry = entry.map_err(|e| DocragError::Io {
                    source: e,
                    context: "Failed to read directory entry".to_string(),
                })?;
                let path = entry.path();

                if path.is_dir() {
                    size += Self::dir_size(&path)?;
                } else {
                    size += entry
                        .metadata()
                        .map_err(|e| DocragError::Io {
                            source: e,
                            context: format!("Failed to get file metadata: {}", path.display()),
                        })?
                        .len();
                }
            }
        }

        Ok(size)
    }
}

/// Combined storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub db: DbStats,
    pub disk_size: u64,
}

impl StorageStats {
    /// Format size as human-readable string
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_storage_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(storage.store_dir().exists());
        assert!(storage.store_dir().join("blobs").exists());
        assert!(storage.store_dir().join("db.sqlite").exists());
    }

    #[test]
    fn test_archive_document_records_catalog_row() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path().to_path_buf()).unwrap();

        let hash = storage
            .archive_document("notes.txt", FileType::Txt, "some document text")
            .unwrap();
        assert!(storage.archive.exists(&hash));

        let stats = storage.stats().unwrap();
        assert_eq!(stats.db.document_count, 1);
        assert_eq!(stats.db.corpus_bytes, "some document text".len() as u64);
    }

    #[test]
    fn test_reingest_replaces_catalog_row() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path().to_path_buf()).unwrap();

        storage
            .archive_document("notes.txt", FileType::Txt, "first version")
            .unwrap();
        let second = storage
            .archive_document("notes.txt", FileType::Txt, "second version, longer")
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.db.document_count, 1);
        assert_eq!(
            stats.db.corpus_bytes,
            "second version, longer".len() as u64
        );

        let conn = storage.database.get_conn().unwrap();
        let stored_hash: String = conn
            .query_row(
                "SELECT content_hash FROM documents WHERE filename = ?1",
                params!["notes.txt"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored_hash, second);
    }

    #[test]
    fn test_stats_reflect_disk_usage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::new(temp_dir.path().to_path_buf()).unwrap();

        storage
            .archive_document("big.txt", FileType::Txt, &"word ".repeat(5000))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert!(stats.disk_size > 0);
        assert_eq!(stats.db.document_count, 1);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(StorageStats::format_size(0), "0.00 B");
        assert_eq!(StorageStats::format_size(1023), "1023.00 B");
        assert_eq!(StorageStats::format_size(1024), "1.00 KB");
        assert_eq!(StorageStats::format_size(1024 * 1024), "1.00 MB");
        assert_eq!(StorageStats::format_size(1024 * 1024 * 1024), "1.00 GB");
    }
}
