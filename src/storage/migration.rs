//! Record migration between stores.
//!
//! Moves every record of a source store into a target store, tallying
//! per-record failures instead of aborting. Backup and restore wrap a
//! [`LocalVectorStore`] at a given path.

use crate::error::Result;
use crate::storage::local::{LocalStoreOptions, LocalVectorStore};
use crate::storage::VectorStore;
use std::path::Path;

/// Outcome counts of one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub total: usize,
    pub migrated: usize,
    pub failed: usize,
}

/// Copies every record from `source` into `target`. Per-record store failures
/// are logged and counted; the run continues.
pub fn migrate(source: &dyn VectorStore, target: &dyn VectorStore) -> Result<MigrationStats> {
    let records = source.list()?;
    let mut stats = MigrationStats {
        total: records.len(),
        ..Default::default()
    };
    tracing::info!(count = stats.total, "starting migration");

    for record in records {
        let id = record.id.clone();
        match target.store(record) {
            Ok(_) => {
                stats.migrated += 1;
                if stats.migrated % 100 == 0 {
                    tracing::info!(progress = stats.migrated, "migration progress");
                }
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to migrate record");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        migrated = stats.migrated,
        failed = stats.failed,
        total = stats.total,
        "migration completed"
    );
    Ok(stats)
}

/// Backs up a store into a local store at `path` under the `backup`
/// collection.
pub fn backup(source: &dyn VectorStore, path: impl AsRef<Path>) -> Result<MigrationStats> {
    let target = LocalVectorStore::open(path, "backup", LocalStoreOptions::default())?;
    let stats = migrate(source, &target)?;
    target.close()?;
    Ok(stats)
}

/// Restores a backup created by [`backup`] into `target`.
pub fn restore(path: impl AsRef<Path>, target: &dyn VectorStore) -> Result<MigrationStats> {
    let source = LocalVectorStore::open(path, "backup", LocalStoreOptions::default())?;
    migrate(&source, target)
}
