// src/cache.rs

//! # Content-Addressed Table Cache
//!
//! Enforces at-most-once expensive extraction per unique document. Layout:
//!
//! - `<dir>/source_hash_id.log` — append-only audit log, one
//!   `<hash>_<evaluation id>` line per completed extraction.
//! - `<dir>/asset_tables/<hash>.json` — the serialized canonical
//!   [`AssetTable`] for that document.
//!
//! Membership is a log scan; the table file is only trusted after the log
//! says the job completed. On store, the table file is written *before* the
//! log line: a crash between the two leaves an invisible orphan file, never a
//! log entry pointing at nothing it can recover from. A log hit whose file is
//! missing or unreadable is handled as a miss (re-extract and re-store), not
//! a fatal error.
//!
//! A `moka` TTL-less in-memory layer fronts the files so repeated evaluations
//! of a hot document skip the disk entirely.

use moka::future::Cache as MokaCache;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::CacheSettings;
use crate::errors::CacheError;
use crate::types::AssetTable;

const LOG_FILE: &str = "source_hash_id.log";
const TABLES_SUBDIR: &str = "asset_tables";

pub struct TableCache {
    log_path: PathBuf,
    tables_dir: PathBuf,
    memory: MokaCache<String, AssetTable>,
}

impl TableCache {
    pub fn new(settings: &CacheSettings) -> Self {
        let dir = PathBuf::from(&settings.directory);
        Self {
            log_path: dir.join(LOG_FILE),
            tables_dir: dir.join(TABLES_SUBDIR),
            memory: MokaCache::new(settings.memory_capacity),
        }
    }

    /// Looks a document up by content hash. `Ok(None)` covers both a true
    /// miss and a log hit with a missing/corrupt table file.
    #[instrument(skip(self))]
    pub async fn lookup(&self, source_hash: &str) -> Result<Option<AssetTable>, CacheError> {
        if let Some(table) = self.memory.get(source_hash).await {
            debug!("memory hit");
            return Ok(Some(table));
        }
        if !self.log_contains(source_hash).await? {
            return Ok(None);
        }

        let path = self.tables_dir.join(format!("{source_hash}.json"));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "logged table file is missing; treating as miss");
                return Ok(None);
            }
            Err(e) => return Err(CacheError::Io { path: path.display().to_string(), source: e }),
        };
        match serde_json::from_str::<AssetTable>(&raw) {
            Ok(table) => {
                self.memory.insert(source_hash.to_string(), table.clone()).await;
                debug!("file hit");
                Ok(Some(table))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cached table; treating as miss");
                Ok(None)
            }
        }
    }

    /// Write-through store: table file first, then the audit log line. The
    /// write is idempotent per (hash, table); last writer wins on the file,
    /// which is safe because reconciliation is deterministic for a fixed
    /// candidate set.
    #[instrument(skip(self, table))]
    pub async fn store(
        &self,
        evaluation_id: &str,
        source_hash: &str,
        table: &AssetTable,
    ) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.tables_dir).await.map_err(|e| CacheError::Io {
            path: self.tables_dir.display().to_string(),
            source: e,
        })?;

        let path = self.tables_dir.join(format!("{source_hash}.json"));
        let serialized = serde_json::to_string(table).map_err(|e| CacheError::Corrupt {
            hash: source_hash.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, serialized).await.map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|e| CacheError::Io {
                path: self.log_path.display().to_string(),
                source: e,
            })?;
        log.write_all(format!("{source_hash}_{evaluation_id}\n").as_bytes())
            .await
            .map_err(|e| CacheError::Io {
                path: self.log_path.display().to_string(),
                source: e,
            })?;

        self.memory.insert(source_hash.to_string(), table.clone()).await;
        info!(%source_hash, %evaluation_id, "table cached");
        Ok(())
    }

    async fn log_contains(&self, source_hash: &str) -> Result<bool, CacheError> {
        let raw = match tokio::fs::read_to_string(&self.log_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.log_path.display().to_string(),
                    source: e,
                })
            }
        };
        Ok(raw
            .lines()
            .filter_map(|line| line.trim().split('_').next())
            .any(|hash| hash == source_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cache_in(dir: &tempfile::TempDir) -> TableCache {
        TableCache::new(&CacheSettings {
            directory: dir.path().display().to_string(),
            memory_capacity: 16,
        })
    }

    fn table(hash: &str) -> AssetTable {
        AssetTable::empty(true, hash.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_miss_then_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        assert!(cache.lookup("abc").await.unwrap().is_none());

        let stored = table("abc");
        cache.store("eval-1", "abc", &stored).await.unwrap();
        let loaded = cache.lookup("abc").await.unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_cold_process_sees_prior_store() {
        let dir = tempfile::tempdir().unwrap();
        cache_in(&dir).store("eval-1", "abc", &table("abc")).await.unwrap();
        // Fresh cache instance: no memory layer, must come from the files.
        let cold = cache_in(&dir);
        assert!(cold.lookup("abc").await.unwrap().is_some());
        assert!(cold.lookup("def").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logged_but_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store("eval-1", "abc", &table("abc")).await.unwrap();
        tokio::fs::remove_file(dir.path().join(TABLES_SUBDIR).join("abc.json"))
            .await
            .unwrap();
        let cold = cache_in(&dir);
        assert!(cold.lookup("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store("eval-1", "abc", &table("abc")).await.unwrap();
        tokio::fs::write(dir.path().join(TABLES_SUBDIR).join("abc.json"), b"{nope")
            .await
            .unwrap();
        let cold = cache_in(&dir);
        assert!(cold.lookup("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_accumulates_evaluation_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.store("abc", "h1", &table("h1")).await.unwrap();
        cache.store("def", "h1", &table("h1")).await.unwrap();
        let log = tokio::fs::read_to_string(dir.path().join(LOG_FILE)).await.unwrap();
        assert_eq!(log, "h1_abc\nh1_def\n");
    }
}
