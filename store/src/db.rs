use common::error::AppError;
use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

/// Thin wrapper around a connected `Surreal<Any>` client. `address`
/// accepts any scheme the `any` engine supports (`ws://`, `http://`,
/// `mem://` for the in-process test backend).
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn connect(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, AppError> {
        let client = connect(address).await?;
        if !username.is_empty() {
            client
                .signin(Root { username, password })
                .await?;
        }
        client.use_ns(namespace).use_db(database).await?;
        Ok(Self { client })
    }

    /// In-memory backend for tests: no credentials, a fixed namespace/db.
    pub async fn connect_in_memory() -> Result<Self, AppError> {
        let client = connect("mem://").await?;
        client.use_ns("test").use_db("test").await?;
        Ok(Self { client })
    }

    pub async fn ensure_indexes(&self, embedding_dimension: usize) -> Result<(), AppError> {
        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_chunks ON embedding_chunks FIELDS embedding HNSW DIMENSION {embedding_dimension}"
            ))
            .await?;
        self.client
            .query(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_documents_source ON embedding_documents FIELDS tenant_id, source_type, source_id UNIQUE",
            )
            .await?;
        self.client
            .query(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_chunks_document ON embedding_chunks FIELDS document_id, chunk_index UNIQUE",
            )
            .await?;
        Ok(())
    }
}
