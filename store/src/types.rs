use chrono::{DateTime, Utc};
use common::domain::{SourceType, TenantId};
use serde::{Deserialize, Serialize};

/// Just enough to key a record by table + id; no session-store
/// scaffolding attached.
pub trait StoredObject: Serialize + for<'de> Deserialize<'de> {
    fn table_name() -> &'static str;
    fn get_id(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub tenant_id: TenantId,
    pub source_type: SourceType,
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredObject for Document {
    fn table_name() -> &'static str {
        "embedding_documents"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub tenant_id: TenantId,
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl StoredObject for Chunk {
    fn table_name() -> &'static str {
        "embedding_chunks"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}
