//! Drives the full `DebouncedWorker` poll loop against an in-memory queue
//! and an in-memory `store`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chunker::ChunkConfig;
use common::domain::{QueueMember, SourceType, TenantId};
use common::error::AppError;
use document_renderer::DocumentRenderer;
use embedder::Embedder;
use entity_fetcher::*;
use ingestion_pipeline::IngestionPipeline;
use queue::{InMemoryProcessingQueue, ProcessingQueue};
use store::{DocumentStore, SurrealDbClient, SurrealDocumentStore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use worker::{DebouncedWorker, WorkerTuning};

struct StubFetcher {
    worlds: Mutex<HashMap<String, World>>,
}

#[async_trait]
impl EntityFetcher for StubFetcher {
    async fn get_story(&self, _t: TenantId, _id: &str) -> Result<Story, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_chapter(&self, _t: TenantId, _id: &str) -> Result<Chapter, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_content_block(&self, _t: TenantId, _id: &str) -> Result<ContentBlock, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_world(&self, _t: TenantId, id: &str) -> Result<World, AppError> {
        self.worlds
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("world {id}")))
    }
    async fn get_character(&self, _t: TenantId, _id: &str) -> Result<Character, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_location(&self, _t: TenantId, _id: &str) -> Result<Location, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_event(&self, _t: TenantId, _id: &str) -> Result<Event, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_artifact(&self, _t: TenantId, _id: &str) -> Result<Artifact, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_faction(&self, _t: TenantId, _id: &str) -> Result<Faction, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_lore(&self, _t: TenantId, _id: &str) -> Result<Lore, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_relation(&self, _t: TenantId, _id: &str) -> Result<Relation, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn get_relation_citation(&self, _t: TenantId, _id: &str) -> Result<RelationCitation, AppError> {
        Err(AppError::NotFound("unused".to_string()))
    }
    async fn list_content_blocks(&self, _t: TenantId, _id: &str) -> Result<Vec<ContentBlock>, AppError> {
        Ok(Vec::new())
    }
    async fn list_content_references(&self, _t: TenantId, _id: &str) -> Result<Vec<ContentReference>, AppError> {
        Ok(Vec::new())
    }
    async fn list_character_traits(&self, _t: TenantId, _id: &str) -> Result<Vec<Trait>, AppError> {
        Ok(Vec::new())
    }
    async fn list_event_characters(&self, _t: TenantId, _id: &str) -> Result<Vec<EntityRef>, AppError> {
        Ok(Vec::new())
    }
    async fn list_event_locations(&self, _t: TenantId, _id: &str) -> Result<Vec<EntityRef>, AppError> {
        Ok(Vec::new())
    }
    async fn list_event_artifacts(&self, _t: TenantId, _id: &str) -> Result<Vec<EntityRef>, AppError> {
        Ok(Vec::new())
    }
    async fn list_faction_members(&self, _t: TenantId, _id: &str) -> Result<Vec<EntityRef>, AppError> {
        Ok(Vec::new())
    }
    async fn list_lore_references(&self, _t: TenantId, _id: &str) -> Result<Vec<EntityRef>, AppError> {
        Ok(Vec::new())
    }
}

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![text.chars().count() as f32, 0.0, 0.0, 0.0])
    }
}

/// Three pushes inside the debounce window collapse into exactly one
/// ingestion using the latest snapshot, driven through the worker's real
/// `run` loop rather than by calling `process_stable` directly.
#[tokio::test]
async fn debounced_worker_run_loop_collapses_rapid_pushes_into_one_ingestion() {
    let tenant = TenantId(Uuid::new_v4());
    let member = QueueMember::new(SourceType::World, "w1");

    let fetcher = Arc::new(StubFetcher {
        worlds: Mutex::new(HashMap::from([(
            "w1".to_string(),
            World {
                id: "w1".to_string(),
                name: "Asha".to_string(),
                description: "A desert realm.".to_string(),
            },
        )])),
    });
    let db = SurrealDbClient::connect_in_memory().await.unwrap();
    db.ensure_indexes(4).await.unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(SurrealDocumentStore::new(db));
    let pipeline = Arc::new(IngestionPipeline::new(
        fetcher,
        Arc::new(DocumentRenderer::new(None)),
        Arc::new(StubEmbedder),
        Arc::clone(&store),
        ChunkConfig::new(2000, 100),
    ));
    let queue: Arc<dyn ProcessingQueue> = Arc::new(InMemoryProcessingQueue::new());

    let tuning = WorkerTuning {
        debounce_interval: chrono::Duration::milliseconds(200),
        poll_interval: Duration::from_millis(50),
        batch_size: 50,
        processing_timeout: chrono::Duration::seconds(300),
    };
    let worker = DebouncedWorker::new(Arc::clone(&queue), pipeline, tuning);

    // Three rapid pushes, all within the debounce window.
    queue.push(tenant, member.clone(), Utc::now()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.push(tenant, member.clone(), Utc::now()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.push(tenant, member.clone(), Utc::now()).await.unwrap();

    let cancel = CancellationToken::new();
    let run_handle = {
        let worker_ref: Arc<DebouncedWorker> = Arc::new(worker);
        let worker_for_task = Arc::clone(&worker_ref);
        let cancel_for_task = cancel.clone();
        tokio::spawn(async move { worker_for_task.run(cancel_for_task).await })
    };

    // Long enough for the debounce window to stabilize and at least one
    // poll tick to pick the item up.
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();
    run_handle.await.unwrap();

    let doc = store
        .get_document_by_source(tenant, SourceType::World, "w1")
        .await
        .unwrap();
    assert_eq!(doc.title, "Asha");
    assert!(queue.list_tenants_with_pending().await.unwrap().is_empty());
    assert!(queue.list_tenants_with_inflight().await.unwrap().is_empty());
}

/// The authoring service reporting `NotFound` for a previously-ingested
/// entity tombstones the document and its chunks, and the worker still
/// acks the item (no dead-letter retention).
#[tokio::test]
async fn debounced_worker_tombstones_a_deleted_entity_through_the_full_loop() {
    let tenant = TenantId(Uuid::new_v4());
    let member = QueueMember::new(SourceType::World, "gone");

    let fetcher = Arc::new(StubFetcher {
        worlds: Mutex::new(HashMap::new()),
    });
    let db = SurrealDbClient::connect_in_memory().await.unwrap();
    db.ensure_indexes(4).await.unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(SurrealDocumentStore::new(db));
    let pipeline = Arc::new(IngestionPipeline::new(
        fetcher,
        Arc::new(DocumentRenderer::new(None)),
        Arc::new(StubEmbedder),
        Arc::clone(&store),
        ChunkConfig::new(2000, 100),
    ));
    let queue: Arc<dyn ProcessingQueue> = Arc::new(InMemoryProcessingQueue::new());
    let tuning = WorkerTuning {
        debounce_interval: chrono::Duration::milliseconds(0),
        poll_interval: Duration::from_millis(300),
        batch_size: 50,
        processing_timeout: chrono::Duration::seconds(300),
    };
    let worker = DebouncedWorker::new(Arc::clone(&queue), pipeline, tuning);

    queue.push(tenant, member, Utc::now()).await.unwrap();
    worker.process_stable().await.unwrap();

    assert!(queue.list_tenants_with_pending().await.unwrap().is_empty());
    assert!(queue.list_tenants_with_inflight().await.unwrap().is_empty());
    let err = store
        .get_document_by_source(tenant, SourceType::World, "gone")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
