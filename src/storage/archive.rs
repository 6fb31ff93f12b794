//! Content-addressed archive for raw document text
//!
//! Retains the original text of every ingested file so the corpus can be
//! re-chunked or audited later. Identical content is stored once.

use crate::error::{DocragError, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Content-addressed document archive
pub struct DocumentArchive {
    base_path: PathBuf,
    compression_threshold: usize,
}

impl DocumentArchive {
    /// Create an archive rooted at the given base path
    pub fn new(base_path: PathBuf, compression_threshold: usize) -> Result<Self> {
        let blobs_dir = base_path.join("blobs");
        fs::create_dir_all(&blobs_dir).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to create blobs directory: {}", blobs_dir.display()),
        })?;

        Ok(Self {
            base_path,
            compression_threshold,
        })
    }

    /// Write data to the archive, returning its hash.
    /// Returns (hash, was_compressed, was_new).
    pub fn write(&self, data: &[u8]) -> Result<(String, bool, bool)> {
        let hash = Self::hash_data(data);

        let blob_path = self.blob_path(&hash);
        if blob_path.exists() {
            return Ok((hash, false, false));
        }

        let should_compress = data.len() >= self.compression_threshold;

        // Write to a temp file first, then rename: readers never observe
        // a partially written blob.
        let temp_path = self.temp_path(&hash);
        let parent = temp_path
            .parent()
            .ok_or_else(|| DocragError::Storage("Invalid blob path".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to create blob directory: {}", parent.display()),
        })?;

        let mut file = fs::File::create(&temp_path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to create temp blob file: {}", temp_path.display()),
        })?;

        if should_compress {
            let compressed = zstd::encode_all(data, 3).map_err(|e| DocragError::Io {
                source: e,
                context: "Failed to compress blob data".to_string(),
            })?;
            file.write_all(&compressed).map_err(|e| DocragError::Io {
                source: e,
                context: format!("Failed to write compressed blob: {}", temp_path.display()),
            })?;
        } else {
            file.write_all(data).map_err(|e| DocragError::Io {
                source: e,
                context: format!("Failed to write blob data: {}", temp_path.display()),
            })?;
        }

        file.sync_all().map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to sync blob file: {}", temp_path.display()),
        })?;
        drop(file);

        fs::rename(&temp_path, &blob_path).map_err(|e| DocragError::Io {
            source: e,
            context: format!(
                "Failed to rename temp blob to final location: {} -> {}",
                temp_path.display(),
                blob_path.display()
            ),
        })?;

        Ok((hash, should_compress, true))
    }

    /// Read data back from the archive
    pub fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let blob_path = self.blob_path(hash);

        if !blob_path.exists() {
            return Err(DocragError::Storage(format!("Blob not found: {}", hash)));
        }

        let mut file = fs::File::open(&blob_path).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to open blob file: {}", blob_path.display()),
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| DocragError::Io {
            source: e,
            context: format!("Failed to read blob data: {}", blob_path.display()),
        })?;

        // Small blobs are stored uncompressed; fall back to the raw bytes
        match zstd::decode_all(&data[..]) {
            Ok(decompressed) => Ok(decompressed),
            Err(_) => Ok(data),
        }
    }

    /// Check whether a blob exists
    pub fn exists(&self, hash: &str) -> bool {
        self.blob_path(hash).exists()
    }

    /// Hash data using BLAKE3
    fn hash_data(data: &[u8]) -> String {
        let hash = blake3::hash(data);
        // 32 hex characters (16 bytes) is plenty for this corpus size
        format!("{:.32}", hash.to_hex())
    }

    /// Blob path with two-level sharding: blobs/ab/cd/abcdef...
    fn blob_path(&self, hash: &str) -> PathBuf {
        let shard1 = &hash[0..2];
        let shard2 = &hash[2..4];
        self.base_path
            .join("blobs")
            .join(shard1)
            .join(shard2)
            .join(hash)
    }

    /// Temporary path for atomic writes
    fn temp_path(&self, hash: &str) -> PathBuf {
        let shard1 = &hash[0..2];
        let shard2 = &hash[2..4];
        self.base_path
            .join("blobs")
            .join(shard1)
            .join(shard2)
            .join(format!("{}.tmp", hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        let data = b"Hello, World!";
        let (hash, compressed, is_new) = archive.write(data).unwrap();

        assert!(is_new);
        assert!(!compressed); // below the compression threshold

        let read_data = archive.read(&hash).unwrap();
        assert_eq!(data, &read_data[..]);
    }

    #[test]
    fn test_deduplication() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        let data = b"Identical document text";

        let (hash1, _, is_new1) = archive.write(data).unwrap();
        assert!(is_new1);

        let (hash2, _, is_new2) = archive.write(data).unwrap();
        assert!(!is_new2);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_compression_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 10).unwrap();

        let data = vec![b'A'; 2000];
        let (hash, compressed, _) = archive.write(&data).unwrap();

        assert!(compressed);

        let read_data = archive.read(&hash).unwrap();
        assert_eq!(data, read_data);
    }

    #[test]
    fn test_exists() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        let (hash, _, _) = archive.write(b"Exists test").unwrap();

        assert!(archive.exists(&hash));
        assert!(!archive.exists("nonexistent_hash"));
    }

    #[test]
    fn test_path_sharding() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        let path = archive.blob_path("abcdef1234567890");
        let path_str = path.to_str().unwrap();
        assert!(path_str.contains("/blobs/ab/cd/"));
    }

    #[test]
    fn test_read_missing_blob_fails() {
        let temp_dir = TempDir::new().unwrap();
        let archive = DocumentArchive::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        assert!(archive.read("feedfacefeedfacefeedfacefeedface").is_err());
    }
}
