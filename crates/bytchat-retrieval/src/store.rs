// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the `document_chunks` table.

use bytchat_core::BytchatError;
use bytchat_storage::map_tr_err;
use rusqlite::params;
use tracing::warn;

use crate::vector::vec_to_blob;

/// A chunk row with its raw, not yet decoded, embedding.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<u8>,
}

/// Chunk index access over the shared connection.
#[derive(Clone)]
pub struct ChunkStore {
    conn: tokio_rusqlite::Connection,
}

impl ChunkStore {
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Every readable chunk of one tenant, in insertion order.
    ///
    /// The table is not STRICT, so ingestion may leave rows whose content is
    /// not UTF-8 or whose embedding is not a BLOB. Such rows are logged and
    /// skipped.
    pub async fn tenant_chunks(&self, tenant_id: i64) -> Result<Vec<StoredChunk>, BytchatError> {
        self.conn
            .call(move |conn| -> Result<Vec<StoredChunk>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, content, embedding FROM document_chunks
                     WHERE tenant_id = ?1 ORDER BY id",
                )?;
                let mut rows = stmt.query(params![tenant_id])?;
                let mut chunks = Vec::new();
                while let Some(row) = rows.next()? {
                    let id: i64 = row.get(0)?;
                    match (row.get::<_, String>(1), row.get::<_, Vec<u8>>(2)) {
                        (Ok(content), Ok(embedding)) => chunks.push(StoredChunk {
                            id,
                            content,
                            embedding,
                        }),
                        (Err(e), _) | (_, Err(e)) => {
                            warn!(tenant_id, chunk_id = id, error = %e, "skipping unreadable chunk row");
                        }
                    }
                }
                Ok(chunks)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Number of chunks indexed for a tenant.
    pub async fn count(&self, tenant_id: i64) -> Result<i64, BytchatError> {
        self.conn
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM document_chunks WHERE tenant_id = ?1",
                    params![tenant_id],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Insert a chunk. The ingestion pipeline owns this table in production;
    /// this exists for fixtures and operator tooling.
    pub async fn insert_chunk(
        &self,
        tenant_id: i64,
        document_id: i64,
        content: &str,
        embedding: &[f32],
    ) -> Result<i64, BytchatError> {
        let content = content.to_string();
        let blob = vec_to_blob(embedding);
        self.conn
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO document_chunks (tenant_id, document_id, content, embedding)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![tenant_id, document_id, content, blob],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
    }
}
