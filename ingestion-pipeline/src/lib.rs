//! One ingestion use case, parameterized over every source type (C8).
//!
//! The algorithm is shared across all twelve entity kinds: fetch the
//! canonical entity, render it to a titled document, chunk and embed the
//! content, and persist document + chunks as one set. A `NotFound` from
//! the fetcher is not a failure: it means the authoring service no
//! longer has the entity, and the matching document (if any) is
//! tombstoned instead.

mod context;
mod stages;
mod state;

use std::sync::Arc;

use chunker::ChunkConfig;
use common::{
    domain::{QueueMember, SourceType, TenantId},
    error::AppError,
};
use context::PipelineContext;
use document_renderer::{DocumentRenderer, RenderInput};
use embedder::Embedder;
use entity_fetcher::EntityFetcher;
use store::DocumentStore;
use tracing::info;

/// Result of one `execute` call, returned to the worker for logging and
/// ack/release decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    Persisted { document_id: String, chunk_count: usize },
    /// The authoring service no longer has the entity and a previously
    /// indexed document for it was deleted.
    Tombstoned,
    /// The authoring service no longer has the entity and none was ever
    /// indexed; nothing to do.
    NoOp,
}

pub struct IngestionPipeline {
    fetcher: Arc<dyn EntityFetcher>,
    renderer: Arc<DocumentRenderer>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn DocumentStore>,
    chunk_config: ChunkConfig,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn EntityFetcher>,
        renderer: Arc<DocumentRenderer>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
        chunk_config: ChunkConfig,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            embedder,
            store,
            chunk_config,
        }
    }

    pub async fn execute(
        &self,
        tenant: TenantId,
        member: &QueueMember,
    ) -> Result<IngestionOutcome, AppError> {
        let render_input = match fetch_render_input(self.fetcher.as_ref(), tenant, member).await {
            Ok(input) => input,
            Err(AppError::NotFound(_)) => return self.tombstone(tenant, member).await,
            Err(err) => return Err(err),
        };

        let mut ctx = PipelineContext::new(tenant, member, render_input);
        let machine = state::ready();

        let machine = stages::fetch(machine, &mut ctx).map_err(|err| ctx.abort(err))?;
        let machine = stages::render(machine, &mut ctx, self.renderer.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?;
        let machine = stages::chunk(machine, &mut ctx, &self.chunk_config).map_err(|err| ctx.abort(err))?;
        let machine = stages::embed(machine, &mut ctx, self.embedder.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?;
        let _machine = stages::persist(machine, &mut ctx, self.store.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?;

        let document_id = ctx
            .document_id
            .clone()
            .ok_or_else(|| AppError::Internal("document id missing after persist".to_string()))?;
        let chunk_count = ctx.chunks.as_ref().map_or(0, Vec::len);

        info!(member = %member, document_id = %document_id, chunk_count, "ingestion completed");
        Ok(IngestionOutcome::Persisted { document_id, chunk_count })
    }

    async fn tombstone(&self, tenant: TenantId, member: &QueueMember) -> Result<IngestionOutcome, AppError> {
        match self
            .store
            .get_document_by_source(tenant, member.source_type, &member.source_id)
            .await
        {
            Ok(doc) => {
                self.store.delete_document(tenant, &doc.id).await?;
                info!(member = %member, document_id = %doc.id, "tombstoned deleted entity");
                Ok(IngestionOutcome::Tombstoned)
            }
            Err(AppError::NotFound(_)) => Ok(IngestionOutcome::NoOp),
            Err(err) => Err(err),
        }
    }
}

/// Dispatches on `member.source_type` to fetch the canonical entity plus
/// whatever ancillary children its renderer needs. Exhaustive over
/// `SourceType`, so a new variant fails to compile until this match (and
/// the renderer's) is updated for it.
async fn fetch_render_input(
    fetcher: &dyn EntityFetcher,
    tenant: TenantId,
    member: &QueueMember,
) -> Result<RenderInput, AppError> {
    let id = member.source_id.as_str();
    match member.source_type {
        SourceType::Story => Ok(RenderInput::Story(fetcher.get_story(tenant, id).await?)),
        SourceType::Chapter => {
            let chapter = fetcher.get_chapter(tenant, id).await?;
            let content_blocks = fetcher.list_content_blocks(tenant, id).await?;
            Ok(RenderInput::Chapter { chapter, content_blocks })
        }
        SourceType::ContentBlock => {
            let block = fetcher.get_content_block(tenant, id).await?;
            let references = fetcher.list_content_references(tenant, id).await?;
            Ok(RenderInput::ContentBlock { block, references })
        }
        SourceType::World => Ok(RenderInput::World(fetcher.get_world(tenant, id).await?)),
        SourceType::Character => {
            let character = fetcher.get_character(tenant, id).await?;
            let traits = fetcher.list_character_traits(tenant, id).await?;
            Ok(RenderInput::Character { character, traits })
        }
        SourceType::Location => Ok(RenderInput::Location(fetcher.get_location(tenant, id).await?)),
        SourceType::Event => {
            let event = fetcher.get_event(tenant, id).await?;
            let characters = fetcher.list_event_characters(tenant, id).await?;
            let locations = fetcher.list_event_locations(tenant, id).await?;
            let artifacts = fetcher.list_event_artifacts(tenant, id).await?;
            Ok(RenderInput::Event { event, characters, locations, artifacts })
        }
        SourceType::Artifact => Ok(RenderInput::Artifact(fetcher.get_artifact(tenant, id).await?)),
        SourceType::Faction => {
            let faction = fetcher.get_faction(tenant, id).await?;
            let members = fetcher.list_faction_members(tenant, id).await?;
            Ok(RenderInput::Faction { faction, members })
        }
        SourceType::Lore => {
            let lore = fetcher.get_lore(tenant, id).await?;
            let references = fetcher.list_lore_references(tenant, id).await?;
            Ok(RenderInput::Lore { lore, references })
        }
        SourceType::Relation => Ok(RenderInput::Relation(fetcher.get_relation(tenant, id).await?)),
        SourceType::RelationCitation => Ok(RenderInput::RelationCitation(
            fetcher.get_relation_citation(tenant, id).await?,
        )),
    }
}
