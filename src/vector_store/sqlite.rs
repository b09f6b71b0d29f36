//! SQLite-based vector store implementation.
//!
//! Each partition is its own table in a shared database file. Cosine distance
//! is computed in Rust over the stored vectors.

use super::{
    cosine_distance, rank, Chunk, DocumentFilter, IndexedChunk, IndexedDocument, ScoredChunk,
    SourceType, VectorStore,
};
use crate::error::{Result, VidsageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, instrument};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based vector store for a single partition.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    source_type: SourceType,
}

impl SqliteVectorStore {
    /// Open (or create) the partition for `source_type` in the database at `path`.
    #[instrument(skip_all, fields(partition = source_type.partition()))]
    pub fn open(path: &Path, source_type: SourceType) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::create_schema(&conn, source_type)?;

        info!(
            "Initialized SQLite partition '{}' at {:?}",
            source_type.partition(),
            path
        );

        Ok(Self {
            conn: Mutex::new(conn),
            source_type,
        })
    }

    /// Create an in-memory partition (useful for testing).
    pub fn in_memory(source_type: SourceType) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn, source_type)?;

        Ok(Self {
            conn: Mutex::new(conn),
            source_type,
        })
    }

    fn create_schema(conn: &Connection, source_type: SourceType) -> Result<()> {
        let table = table_name(source_type);
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                document_title TEXT NOT NULL,
                content TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                indexed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_document_id ON {table}(document_id);

            CREATE TABLE IF NOT EXISTS index_meta (
                partition TEXT PRIMARY KEY,
                embedder_fingerprint TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#
        ))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidsageError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn table(&self) -> &'static str {
        table_name(self.source_type)
    }

    fn insert_rows(&self, tx: &Transaction<'_>, chunks: &[IndexedChunk]) -> Result<()> {
        let sql = format!(
            r#"
            INSERT OR REPLACE INTO {}
            (id, document_id, document_title, content, chunk_index, total_chunks,
             embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            self.table()
        );
        let mut stmt = tx.prepare(&sql)?;

        for indexed in chunks {
            let chunk = &indexed.chunk;
            if chunk.source_type != self.source_type {
                return Err(VidsageError::VectorStore(format!(
                    "Chunk {} belongs to the {} partition, not {}",
                    chunk.id,
                    chunk.source_type.partition(),
                    self.source_type.partition()
                )));
            }

            stmt.execute(params![
                chunk.id,
                chunk.document_id,
                chunk.document_title,
                chunk.text,
                chunk.chunk_index,
                chunk.total_chunks,
                embedding_to_bytes(&indexed.embedding),
                indexed.indexed_at.to_rfc3339(),
            ])?;
        }
        Ok(())
    }

    fn row_to_chunk(&self, row: &Row<'_>) -> rusqlite::Result<Chunk> {
        Ok(Chunk {
            id: row.get(0)?,
            document_id: row.get(1)?,
            document_title: row.get(2)?,
            text: row.get(3)?,
            chunk_index: row.get(4)?,
            total_chunks: row.get(5)?,
            source_type: self.source_type,
        })
    }
}

fn table_name(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::Report => "report_chunks",
        SourceType::Transcript => "transcript_chunks",
    }
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    #[instrument(skip(self, chunks), fields(partition = self.source_type.partition(), count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        self.insert_rows(&tx, chunks)?;
        tx.commit()?;

        debug!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, chunks), fields(partition = self.source_type.partition(), count = chunks.len()))]
    async fn replace_document(&self, document_id: &str, chunks: &[IndexedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let removed = tx.execute(
            &format!("DELETE FROM {} WHERE document_id = ?1", self.table()),
            params![document_id],
        )?;
        self.insert_rows(&tx, chunks)?;
        tx.commit()?;

        debug!(
            "Replaced {} chunks of {} with {}",
            removed,
            document_id,
            chunks.len()
        );
        Ok(removed)
    }

    #[instrument(skip(self), fields(partition = self.source_type.partition()))]
    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE document_id = ?1", self.table()),
            params![document_id],
        )?;

        debug!("Deleted {} chunks for document {}", deleted, document_id);
        Ok(deleted)
    }

    #[instrument(skip(self, query_embedding, document_ids), fields(partition = self.source_type.partition()))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || document_ids.is_some_and(|f| f.is_empty()) {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;

        let mut sql = format!(
            "SELECT id, document_id, document_title, content, chunk_index, total_chunks, embedding FROM {}",
            self.table()
        );
        let filter_values: Vec<&str> = document_ids
            .map(|f| f.iter().map(String::as_str).collect())
            .unwrap_or_default();
        if !filter_values.is_empty() {
            let placeholders = vec!["?"; filter_values.len()].join(", ");
            sql.push_str(&format!(" WHERE document_id IN ({})", placeholders));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(filter_values.iter()), |row| {
            let chunk = self.row_to_chunk(row)?;
            let embedding_bytes: Vec<u8> = row.get(6)?;
            Ok(ScoredChunk {
                distance: cosine_distance(query_embedding, &bytes_to_embedding(&embedding_bytes)),
                chunk,
            })
        })?;

        let mut results = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        rank(&mut results, limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self), fields(partition = self.source_type.partition()))]
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT id, document_id, document_title, content, chunk_index, total_chunks
            FROM {}
            WHERE document_id = ?1
            ORDER BY chunk_index
            "#,
            self.table()
        ))?;

        let chunks = stmt
            .query_map(params![document_id], |row| self.row_to_chunk(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Found {} chunks for document {}", chunks.len(), document_id);
        Ok(chunks)
    }

    #[instrument(skip(self), fields(partition = self.source_type.partition()))]
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT document_id, MAX(document_title), COUNT(*) as chunk_count,
                   MAX(indexed_at) as indexed_at
            FROM {}
            GROUP BY document_id
            ORDER BY indexed_at DESC, document_id
            "#,
            self.table()
        ))?;

        let documents = stmt
            .query_map([], |row| {
                let chunk_count: i64 = row.get(2)?;
                let indexed_at_str: String = row.get(3)?;
                Ok(IndexedDocument {
                    document_id: row.get(0)?,
                    document_title: row.get(1)?,
                    source_type: self.source_type,
                    chunk_count: chunk_count as u32,
                    indexed_at: parse_timestamp(&indexed_at_str),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(documents)
    }

    #[instrument(skip(self), fields(partition = self.source_type.partition()))]
    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let removed = tx.execute(&format!("DELETE FROM {}", self.table()), [])?;
        tx.execute(
            "DELETE FROM index_meta WHERE partition = ?1",
            params![self.source_type.partition()],
        )?;
        tx.commit()?;

        info!(
            "Cleared {} chunks from partition '{}'",
            removed,
            self.source_type.partition()
        );
        Ok(removed)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn embedder_fingerprint(&self) -> Result<Option<String>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT embedder_fingerprint FROM index_meta WHERE partition = ?1",
            params![self.source_type.partition()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(fingerprint) => Ok(Some(fingerprint)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_embedder_fingerprint(&self, fingerprint: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO index_meta (partition, embedder_fingerprint, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                self.source_type.partition(),
                fingerprint,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(doc: &str, index: u32, total: u32, source: SourceType, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk::new(
            Chunk::new(doc, "Test Video", format!("{} part {}", doc, index), index, total, source),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory(SourceType::Report).unwrap();

        store
            .upsert_batch(&[indexed("video1", 0, 1, SourceType::Report, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].document_id, "video1");
        assert_eq!(documents[0].source_type, SourceType::Report);

        let results = store.search(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].distance.abs() < 0.001);
        assert_eq!(results[0].chunk.text, "video1 part 0");

        let deleted = store.delete_by_document("video1").await.unwrap();
        assert_eq!(deleted, 1);

        let documents = store.list_documents().await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_search_with_filter() {
        let store = SqliteVectorStore::in_memory(SourceType::Transcript).unwrap();
        store
            .upsert_batch(&[
                indexed("a", 0, 1, SourceType::Transcript, vec![1.0, 0.0]),
                indexed("b", 0, 1, SourceType::Transcript, vec![0.0, 1.0]),
                indexed("c", 0, 1, SourceType::Transcript, vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let filter: DocumentFilter = ["b".to_string(), "c".to_string()].into_iter().collect();
        let results = store.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);

        let empty = DocumentFilter::new();
        assert!(store.search(&[1.0, 0.0], 10, Some(&empty)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_document_is_atomic_swap() {
        let store = SqliteVectorStore::in_memory(SourceType::Report).unwrap();
        store
            .upsert_batch(&[
                indexed("v", 0, 2, SourceType::Report, vec![1.0]),
                indexed("v", 1, 2, SourceType::Report, vec![1.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .replace_document("v", &[indexed("v", 0, 1, SourceType::Report, vec![1.0])])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let chunks = store.get_by_document("v").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "v_chunk_0_of_1");
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[tokio::test]
    async fn test_rejects_chunk_from_other_partition() {
        let store = SqliteVectorStore::in_memory(SourceType::Report).unwrap();
        let err = store
            .upsert_batch(&[indexed("v", 0, 1, SourceType::Transcript, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VidsageError::VectorStore(_)));
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partitions_share_file_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        let reports = SqliteVectorStore::open(&path, SourceType::Report).unwrap();
        let transcripts = SqliteVectorStore::open(&path, SourceType::Transcript).unwrap();

        reports
            .upsert_batch(&[indexed("v", 0, 1, SourceType::Report, vec![1.0])])
            .await
            .unwrap();
        reports.set_embedder_fingerprint("hashing:1").await.unwrap();

        assert_eq!(reports.chunk_count().await.unwrap(), 1);
        assert_eq!(transcripts.chunk_count().await.unwrap(), 0);
        assert!(transcripts.embedder_fingerprint().await.unwrap().is_none());

        drop(reports);
        let reopened = SqliteVectorStore::open(&path, SourceType::Report).unwrap();
        assert_eq!(reopened.chunk_count().await.unwrap(), 1);
        assert_eq!(
            reopened.embedder_fingerprint().await.unwrap().as_deref(),
            Some("hashing:1")
        );

        reopened.clear().await.unwrap();
        assert!(reopened.embedder_fingerprint().await.unwrap().is_none());
    }
}
