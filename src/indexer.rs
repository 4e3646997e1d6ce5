use anyhow::Context;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Store;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: u32,
    pub skipped: u32,
    pub failed: u32,
}

enum Outcome {
    Indexed,
    Skipped,
    Failed,
}

/// Scans the photo root's immediate entries and upserts one catalog row
/// per subdirectory, with the directory name as the part code.
///
/// Entries are processed concurrently up to the configured limit, and a
/// failure on one entry never aborts the others. Non-directories are
/// counted as skipped.
pub async fn run(store: &Store, config: &Config) -> anyhow::Result<IndexStats> {
    let start = std::time::Instant::now();

    let root = tokio::fs::canonicalize(&config.indexer.photo_root)
        .await
        .with_context(|| format!("Cannot resolve photo root {}", config.indexer.photo_root))?;
    let mut dir = tokio::fs::read_dir(&root)
        .await
        .with_context(|| format!("Cannot read photo root {}", root.display()))?;

    info!(
        event = "index_started",
        root = %root.display(),
        concurrency = config.indexer.concurrency,
        "Indexing photo root"
    );

    let mut stats = IndexStats::default();

    let mut entries = Vec::new();
    loop {
        match dir.next_entry().await {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read a directory entry");
                stats.failed += 1;
                break;
            }
        }
    }

    let outcomes = futures::stream::iter(entries)
        .map(|entry| index_entry(store, entry))
        .buffer_unordered(config.indexer.concurrency)
        .collect::<Vec<_>>()
        .await;

    for outcome in outcomes {
        match outcome {
            Outcome::Indexed => stats.indexed += 1,
            Outcome::Skipped => stats.skipped += 1,
            Outcome::Failed => stats.failed += 1,
        }
    }

    info!(
        event = "index_finished",
        indexed = stats.indexed,
        skipped = stats.skipped,
        failed = stats.failed,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Index run finished"
    );

    Ok(stats)
}

async fn index_entry(store: &Store, entry: tokio::fs::DirEntry) -> Outcome {
    let path = entry.path();
    match entry.file_type().await {
        Ok(file_type) if file_type.is_dir() => {}
        Ok(_) => return Outcome::Skipped,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to inspect entry");
            return Outcome::Skipped;
        }
    }

    let Ok(part_code) = entry.file_name().into_string() else {
        warn!(path = %path.display(), "Skipping directory with a non-UTF-8 name");
        return Outcome::Skipped;
    };

    let directory_path = path.to_string_lossy().into_owned();
    match store.upsert_catalog_entry(&part_code, &directory_path).await {
        Ok(()) => {
            debug!(part_code = %part_code, "Catalog entry refreshed");
            Outcome::Indexed
        }
        Err(e) => {
            warn!(part_code = %part_code, error = %e, "Failed to upsert catalog entry");
            Outcome::Failed
        }
    }
}
