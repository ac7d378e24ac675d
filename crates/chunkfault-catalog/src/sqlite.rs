//! SQLite-backed metadata catalog.
//!
//! The schema is a minimal relational shape of what the harness reads:
//! chunk placement per job and copy, the bad-chunk table populated by
//! verification, and per-job verification status rows. The same connection
//! is what a simulated verification engine writes through in tests.

use std::collections::BTreeSet;
use std::path::Path;

use chunkfault_error::{HarnessError, Result};
use chunkfault_types::{ChunkId, ChunkRow, CopyId, JobId, StoreId, VerificationStatusCode};
use rusqlite::{Connection, params};

use crate::{DroppedChunk, MetadataCatalog};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunk_map (
    job_id          INTEGER NOT NULL,
    copy_id         INTEGER NOT NULL,
    chunk_id        INTEGER NOT NULL,
    mount_folder    TEXT NOT NULL,
    mount_path_name TEXT NOT NULL,
    volume_name     TEXT NOT NULL,
    PRIMARY KEY (job_id, copy_id, chunk_id)
);
CREATE TABLE IF NOT EXISTS dropped_chunk (
    chunk_id INTEGER NOT NULL,
    store_id INTEGER NOT NULL,
    PRIMARY KEY (chunk_id, store_id)
);
CREATE TABLE IF NOT EXISTS job_verification (
    job_id      INTEGER NOT NULL,
    status_code INTEGER NOT NULL
);
";

fn catalog_err(err: rusqlite::Error) -> HarnessError {
    HarnessError::Catalog(err.to_string())
}

/// [`MetadataCatalog`] over a SQLite database.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(catalog_err)?;
        conn.execute_batch(SCHEMA).map_err(catalog_err)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(catalog_err)?;
        conn.execute_batch(SCHEMA).map_err(catalog_err)?;
        Ok(Self { conn })
    }

    /// Record where one chunk of a job lives.
    pub fn record_chunk(&self, job: JobId, copy: CopyId, row: &ChunkRow) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO chunk_map
                 (job_id, copy_id, chunk_id, mount_folder, mount_path_name, volume_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    job.as_u64(),
                    copy.as_u64(),
                    row.chunk_id.as_u64(),
                    row.mount_folder,
                    row.mount_path_name,
                    row.volume_name,
                ],
            )
            .map_err(catalog_err)?;
        Ok(())
    }

    /// Mark a chunk bad for a store. Idempotent, as verification re-marking
    /// an already-dropped chunk is a no-op.
    pub fn mark_chunk_dropped(&self, chunk: ChunkId, store: StoreId) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO dropped_chunk (chunk_id, store_id) VALUES (?1, ?2)",
                params![chunk.as_u64(), store.as_u64()],
            )
            .map_err(catalog_err)?;
        Ok(())
    }

    /// Append one verification status row for a job.
    pub fn record_status(&self, job: JobId, status: VerificationStatusCode) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO job_verification (job_id, status_code) VALUES (?1, ?2)",
                params![job.as_u64(), status.0],
            )
            .map_err(catalog_err)?;
        Ok(())
    }

    /// Drop all per-job status rows. A new verification pass replaces them
    /// while drop marks persist.
    pub fn clear_statuses(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM job_verification", [])
            .map_err(catalog_err)?;
        Ok(())
    }

    /// Clear all verification outcomes, as a fresh verification pass would
    /// before re-evaluating.
    pub fn reset_verification_state(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM dropped_chunk; DELETE FROM job_verification;")
            .map_err(catalog_err)?;
        Ok(())
    }
}

impl MetadataCatalog for SqliteCatalog {
    fn chunks_for_job(&self, job: JobId, copy: CopyId) -> Result<Vec<ChunkRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT mount_folder, mount_path_name, volume_name, chunk_id
                 FROM chunk_map WHERE job_id = ?1 AND copy_id = ?2
                 ORDER BY chunk_id",
            )
            .map_err(catalog_err)?;
        let rows = stmt
            .query_map(params![job.as_u64(), copy.as_u64()], |r| {
                Ok(ChunkRow {
                    mount_folder: r.get(0)?,
                    mount_path_name: r.get(1)?,
                    volume_name: r.get(2)?,
                    chunk_id: ChunkId(r.get::<_, u64>(3)?),
                })
            })
            .map_err(catalog_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(catalog_err)
    }

    fn dropped_chunks(&self, stores: &[StoreId]) -> Result<BTreeSet<DroppedChunk>> {
        let mut out = BTreeSet::new();
        let mut stmt = self
            .conn
            .prepare("SELECT chunk_id FROM dropped_chunk WHERE store_id = ?1")
            .map_err(catalog_err)?;
        for &store in stores {
            let chunks = stmt
                .query_map(params![store.as_u64()], |r| r.get::<_, u64>(0))
                .map_err(catalog_err)?;
            for chunk in chunks {
                out.insert((ChunkId(chunk.map_err(catalog_err)?), store));
            }
        }
        Ok(out)
    }

    fn verification_statuses(&self, job: JobId) -> Result<Vec<VerificationStatusCode>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status_code FROM job_verification WHERE job_id = ?1")
            .map_err(catalog_err)?;
        let codes = stmt
            .query_map(params![job.as_u64()], |r| {
                Ok(VerificationStatusCode(r.get(0)?))
            })
            .map_err(catalog_err)?;
        codes.collect::<rusqlite::Result<Vec<_>>>().map_err(catalog_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(volume: &str, chunk: u64) -> ChunkRow {
        ChunkRow {
            mount_folder: "/mnt/node".to_owned(),
            mount_path_name: "LIB_1".to_owned(),
            volume_name: volume.to_owned(),
            chunk_id: ChunkId(chunk),
        }
    }

    #[test]
    fn chunks_come_back_per_job_and_copy() {
        let catalog = SqliteCatalog::open_in_memory().expect("in-memory catalog");
        catalog
            .record_chunk(JobId(1), CopyId(7), &row("V_1", 10))
            .expect("record");
        catalog
            .record_chunk(JobId(1), CopyId(7), &row("V_1", 11))
            .expect("record");
        catalog
            .record_chunk(JobId(1), CopyId(8), &row("V_9", 99))
            .expect("record on other copy");

        let rows = catalog
            .chunks_for_job(JobId(1), CopyId(7))
            .expect("query should succeed");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.volume_name == "V_1"));
    }

    #[test]
    fn dropped_chunks_filter_by_store() {
        let catalog = SqliteCatalog::open_in_memory().expect("in-memory catalog");
        catalog
            .mark_chunk_dropped(ChunkId(10), StoreId(3))
            .expect("mark");
        catalog
            .mark_chunk_dropped(ChunkId(10), StoreId(3))
            .expect("re-mark is idempotent");
        catalog
            .mark_chunk_dropped(ChunkId(11), StoreId(4))
            .expect("mark other store");

        let dropped = catalog
            .dropped_chunks(&[StoreId(3)])
            .expect("query should succeed");
        assert_eq!(dropped, BTreeSet::from([(ChunkId(10), StoreId(3))]));
    }

    #[test]
    fn statuses_accumulate_per_job() {
        let catalog = SqliteCatalog::open_in_memory().expect("in-memory catalog");
        catalog
            .record_status(JobId(5), VerificationStatusCode::SUCCESS)
            .expect("record");
        catalog
            .record_status(JobId(5), VerificationStatusCode::FAILED)
            .expect("record");

        let codes = catalog
            .verification_statuses(JobId(5))
            .expect("query should succeed");
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&VerificationStatusCode::FAILED));
    }

    #[test]
    fn reset_clears_verification_outcomes_only() {
        let catalog = SqliteCatalog::open_in_memory().expect("in-memory catalog");
        catalog
            .record_chunk(JobId(1), CopyId(7), &row("V_1", 10))
            .expect("record");
        catalog
            .mark_chunk_dropped(ChunkId(10), StoreId(3))
            .expect("mark");
        catalog
            .record_status(JobId(1), VerificationStatusCode::FAILED)
            .expect("record");

        catalog.reset_verification_state().expect("reset");
        assert!(
            catalog
                .dropped_chunks(&[StoreId(3)])
                .expect("query")
                .is_empty()
        );
        assert!(
            catalog
                .verification_statuses(JobId(1))
                .expect("query")
                .is_empty()
        );
        assert_eq!(
            catalog.chunks_for_job(JobId(1), CopyId(7)).expect("query").len(),
            1
        );
    }
}
