//! Persistent mapping from `(tenant, source_type, source_id)` to one
//! document and many chunk vectors (C7).

mod db;
pub mod types;

pub use db::SurrealDbClient;
pub use types::{Chunk, Document, NewChunk};

use async_trait::async_trait;
use chrono::Utc;
use common::{
    domain::{SourceType, TenantId},
    error::AppError,
};
use serde::Deserialize;
use uuid::Uuid;

/// Scoped by `tenant_id` throughout. `replace_chunks` is its own
/// transaction, and an ingestion's document upsert plus chunk replacement
/// together are a single transaction via
/// `upsert_document_and_replace_chunks`: observers never see a document's
/// new title paired with its old chunk set, or vice versa.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document_by_source(
        &self,
        tenant: TenantId,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Document, AppError>;

    /// Creates or updates in place, keyed by `(tenant, source_type,
    /// source_id)`. `doc.id` is reused from a prior `get_document_by_source`
    /// when updating, or freshly generated when creating.
    async fn upsert_document(&self, doc: Document) -> Result<Document, AppError>;

    async fn replace_chunks(
        &self,
        tenant: TenantId,
        document_id: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<(), AppError>;

    /// Upserts `doc` and replaces its chunk set in one transaction: a
    /// failure partway through (a duplicate `chunk_index`, a dropped
    /// connection) leaves neither write visible.
    async fn upsert_document_and_replace_chunks(
        &self,
        doc: Document,
        chunks: Vec<NewChunk>,
    ) -> Result<(), AppError>;

    async fn delete_document(&self, tenant: TenantId, document_id: &str) -> Result<(), AppError>;

    async fn similarity_search(
        &self,
        tenant: TenantId,
        query_vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, AppError>;
}

pub struct SurrealDocumentStore {
    db: SurrealDbClient,
}

impl SurrealDocumentStore {
    #[must_use]
    pub fn new(db: SurrealDbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for SurrealDocumentStore {
    async fn get_document_by_source(
        &self,
        tenant: TenantId,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Document, AppError> {
        let mut response = self
            .db
            .client
            .query(
                "SELECT * FROM embedding_documents \
                 WHERE tenant_id = $tenant AND source_type = $source_type AND source_id = $source_id \
                 LIMIT 1",
            )
            .bind(("tenant", tenant))
            .bind(("source_type", source_type))
            .bind(("source_id", source_id.to_string()))
            .await?;

        let docs: Vec<Document> = response.take(0)?;
        docs.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("document for {source_type}:{source_id}")))
    }

    async fn upsert_document(&self, doc: Document) -> Result<Document, AppError> {
        let id = doc.id.clone();
        let mut response = self
            .db
            .client
            .query("UPSERT type::thing('embedding_documents', $id) CONTENT $doc RETURN AFTER")
            .bind(("id", id))
            .bind(("doc", doc))
            .await?;

        let stored: Vec<Document> = response.take(0)?;
        stored
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("document upsert returned no row".to_string()))
    }

    async fn replace_chunks(
        &self,
        tenant: TenantId,
        document_id: &str,
        chunks: Vec<NewChunk>,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let mut query = self
            .db
            .client
            .query("BEGIN TRANSACTION;")
            .query("DELETE embedding_chunks WHERE document_id = $document_id;")
            .bind(("document_id", document_id.to_string()));

        for (index, new_chunk) in chunks.into_iter().enumerate() {
            let record = Chunk {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                tenant_id: tenant,
                chunk_index: new_chunk.chunk_index,
                text: new_chunk.text,
                embedding: new_chunk.embedding,
                created_at: now,
            };
            let id_key = format!("chunk_id_{index}");
            let val_key = format!("chunk_val_{index}");
            query = query
                .query(format!(
                    "CREATE type::thing('embedding_chunks', ${id_key}) CONTENT ${val_key};"
                ))
                .bind((id_key, record.id.clone()))
                .bind((val_key, record));
        }

        let response = query.query("COMMIT TRANSACTION;").await?;
        response.check()?;
        Ok(())
    }

    async fn upsert_document_and_replace_chunks(
        &self,
        doc: Document,
        chunks: Vec<NewChunk>,
    ) -> Result<(), AppError> {
        let id = doc.id.clone();
        let tenant = doc.tenant_id;
        let now = Utc::now();

        let mut query = self
            .db
            .client
            .query("BEGIN TRANSACTION;")
            .query("UPSERT type::thing('embedding_documents', $id) CONTENT $doc RETURN AFTER;")
            .bind(("id", id.clone()))
            .bind(("doc", doc))
            .query("DELETE embedding_chunks WHERE document_id = $document_id;")
            .bind(("document_id", id.clone()));

        for (index, new_chunk) in chunks.into_iter().enumerate() {
            let record = Chunk {
                id: Uuid::new_v4().to_string(),
                document_id: id.clone(),
                tenant_id: tenant,
                chunk_index: new_chunk.chunk_index,
                text: new_chunk.text,
                embedding: new_chunk.embedding,
                created_at: now,
            };
            let id_key = format!("chunk_id_{index}");
            let val_key = format!("chunk_val_{index}");
            query = query
                .query(format!(
                    "CREATE type::thing('embedding_chunks', ${id_key}) CONTENT ${val_key};"
                ))
                .bind((id_key, record.id.clone()))
                .bind((val_key, record));
        }

        let response = query.query("COMMIT TRANSACTION;").await?;
        response.check()?;
        Ok(())
    }

    async fn delete_document(&self, tenant: TenantId, document_id: &str) -> Result<(), AppError> {
        let response = self
            .db
            .client
            .query("BEGIN TRANSACTION;")
            .query("DELETE embedding_chunks WHERE document_id = $document_id;")
            .query("DELETE type::thing('embedding_documents', $document_id) WHERE tenant_id = $tenant;")
            .query("COMMIT TRANSACTION;")
            .bind(("document_id", document_id.to_string()))
            .bind(("tenant", tenant))
            .await?;
        response.check()?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        tenant: TenantId,
        query_vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<(Chunk, f32)>, AppError> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(flatten)]
            chunk: Chunk,
            score: f32,
        }

        let sql = format!(
            "SELECT *, vector::similarity::cosine(embedding, $embedding) AS score \
             FROM embedding_chunks \
             WHERE tenant_id = $tenant AND embedding <|{k},100|> $embedding \
             ORDER BY score DESC \
             LIMIT {k}"
        );

        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("tenant", tenant))
            .bind(("embedding", query_vector))
            .await?;

        let rows: Vec<Row> = response.take(0)?;
        Ok(rows.into_iter().map(|row| (row.chunk, row.score)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::SourceType;

    async fn store() -> SurrealDocumentStore {
        let db = SurrealDbClient::connect_in_memory().await.unwrap();
        db.ensure_indexes(4).await.unwrap();
        SurrealDocumentStore::new(db)
    }

    fn tenant() -> TenantId {
        TenantId(Uuid::new_v4())
    }

    #[tokio::test]
    async fn upsert_then_fetch_round_trips() {
        let store = store().await;
        let tenant = tenant();
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant,
            source_type: SourceType::World,
            source_id: "w1".to_string(),
            title: "Asha".to_string(),
            content: "A desert realm.".to_string(),
            created_at: now,
            updated_at: now,
        };

        store.upsert_document(doc.clone()).await.unwrap();
        let fetched = store
            .get_document_by_source(tenant, SourceType::World, "w1")
            .await
            .unwrap();
        assert_eq!(fetched.title, "Asha");
    }

    #[tokio::test]
    async fn get_document_by_source_not_found_for_unknown_source() {
        let store = store().await;
        let err = store
            .get_document_by_source(tenant(), SourceType::World, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_chunks_is_atomic_and_replaces_the_prior_set() {
        let store = store().await;
        let tenant = tenant();
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant,
            source_type: SourceType::Character,
            source_id: "c1".to_string(),
            title: "Aria".to_string(),
            content: "body".to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored = store.upsert_document(doc).await.unwrap();

        store
            .replace_chunks(
                tenant,
                &stored.id,
                vec![
                    NewChunk { chunk_index: 0, text: "a".to_string(), embedding: vec![0.0, 0.0, 0.0, 1.0] },
                    NewChunk { chunk_index: 1, text: "b".to_string(), embedding: vec![0.0, 0.0, 1.0, 0.0] },
                ],
            )
            .await
            .unwrap();

        store
            .replace_chunks(
                tenant,
                &stored.id,
                vec![NewChunk { chunk_index: 0, text: "only".to_string(), embedding: vec![1.0, 0.0, 0.0, 0.0] }],
            )
            .await
            .unwrap();

        let results = store
            .similarity_search(tenant, vec![1.0, 0.0, 0.0, 0.0], 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.text, "only");
    }

    #[tokio::test]
    async fn upsert_document_and_replace_chunks_rolls_back_both_writes_on_failure() {
        let store = store().await;
        let tenant = tenant();
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant,
            source_type: SourceType::Character,
            source_id: "c3".to_string(),
            title: "Original".to_string(),
            content: "body".to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored = store.upsert_document(doc).await.unwrap();
        store
            .replace_chunks(
                tenant,
                &stored.id,
                vec![NewChunk { chunk_index: 0, text: "a".to_string(), embedding: vec![0.0, 0.0, 0.0, 1.0] }],
            )
            .await
            .unwrap();

        // A duplicate chunk_index violates the unique (document_id,
        // chunk_index) index partway through the transaction, so the
        // whole thing -- including the document title update -- must
        // roll back.
        let mut updated = stored.clone();
        updated.title = "Updated".to_string();
        let err = store
            .upsert_document_and_replace_chunks(
                updated,
                vec![
                    NewChunk { chunk_index: 0, text: "x".to_string(), embedding: vec![1.0, 0.0, 0.0, 0.0] },
                    NewChunk { chunk_index: 0, text: "y".to_string(), embedding: vec![0.0, 1.0, 0.0, 0.0] },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_) | AppError::Internal(_)));

        let fetched = store
            .get_document_by_source(tenant, SourceType::Character, "c3")
            .await
            .unwrap();
        assert_eq!(fetched.title, "Original", "document upsert must not survive a rolled-back transaction");

        let results = store
            .similarity_search(tenant, vec![0.0, 0.0, 0.0, 1.0], 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "the prior chunk set must still be the only one visible");
        assert_eq!(results[0].0.text, "a");
    }

    #[tokio::test]
    async fn delete_document_cascades_its_chunks() {
        let store = store().await;
        let tenant = tenant();
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant,
            source_type: SourceType::Character,
            source_id: "c2".to_string(),
            title: "Brin".to_string(),
            content: "body".to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored = store.upsert_document(doc).await.unwrap();
        store
            .replace_chunks(
                tenant,
                &stored.id,
                vec![NewChunk { chunk_index: 0, text: "a".to_string(), embedding: vec![0.0; 4] }],
            )
            .await
            .unwrap();

        store.delete_document(tenant, &stored.id).await.unwrap();

        let err = store
            .get_document_by_source(tenant, SourceType::Character, "c2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let results = store
            .similarity_search(tenant, vec![0.0; 4], 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
