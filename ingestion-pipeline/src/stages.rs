use chunker::ChunkConfig;
use common::error::AppError;
use document_renderer::DocumentRenderer;
use embedder::Embedder;
use state_machines::core::GuardError;
use store::{DocumentStore, Document, NewChunk};
use tracing::{debug, instrument};

use crate::context::PipelineContext;
use crate::state::{Chunked, Embedded, Fetched, IngestionMachine, Persisted, Ready, Rendered};

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::Internal(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}

/// The canonical entity was already fetched (and checked for
/// `NotFound`, which short-circuits before the state machine is ever
/// entered); this stage only records the transition.
#[instrument(level = "trace", skip_all, fields(member = %ctx.member))]
pub fn fetch(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Fetched>, AppError> {
    machine.fetch().map_err(|(_, guard)| map_guard_error("fetch", &guard))
}

#[instrument(level = "trace", skip_all, fields(member = %ctx.member))]
pub async fn render(
    machine: IngestionMachine<(), Fetched>,
    ctx: &mut PipelineContext<'_>,
    renderer: &DocumentRenderer,
) -> Result<IngestionMachine<(), Rendered>, AppError> {
    let input = ctx.take_render_input()?;
    let (title, content) = renderer.render(&input).await;
    debug!(member = %ctx.member, title = %title, content_chars = content.chars().count(), "rendered document");
    ctx.title = Some(title);
    ctx.content = Some(content);

    machine.render().map_err(|(_, guard)| map_guard_error("render", &guard))
}

#[instrument(level = "trace", skip_all, fields(member = %ctx.member))]
pub fn chunk(
    machine: IngestionMachine<(), Rendered>,
    ctx: &mut PipelineContext<'_>,
    chunk_config: &ChunkConfig,
) -> Result<IngestionMachine<(), Chunked>, AppError> {
    let content = ctx.take_content()?;
    let chunks = chunker::chunk(&content, chunk_config);
    ctx.content = Some(content);
    debug!(member = %ctx.member, chunk_count = chunks.len(), "chunked rendered content");
    ctx.chunks = Some(chunks);

    machine.chunk().map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(level = "trace", skip_all, fields(member = %ctx.member))]
pub async fn embed(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
    embedder: &dyn Embedder,
) -> Result<IngestionMachine<(), Embedded>, AppError> {
    let texts: Vec<String> = ctx.chunks()?.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(AppError::Internal(format!(
            "embedder returned {} vectors for {} chunks",
            embeddings.len(),
            texts.len()
        )));
    }
    ctx.embeddings = Some(embeddings);

    machine.embed().map_err(|(_, guard)| map_guard_error("embed", &guard))
}

#[instrument(level = "trace", skip_all, fields(member = %ctx.member))]
pub async fn persist(
    machine: IngestionMachine<(), Embedded>,
    ctx: &mut PipelineContext<'_>,
    store: &dyn DocumentStore,
) -> Result<IngestionMachine<(), Persisted>, AppError> {
    let now = chrono::Utc::now();
    let existing = store
        .get_document_by_source(ctx.tenant, ctx.member.source_type, &ctx.member.source_id)
        .await;
    let (id, created_at) = match existing {
        Ok(doc) => (doc.id, doc.created_at),
        Err(AppError::NotFound(_)) => (uuid::Uuid::new_v4().to_string(), now),
        Err(err) => return Err(err),
    };

    let title = ctx.title.clone().unwrap_or_default();
    let content = ctx.take_content()?;
    let document = Document {
        id: id.clone(),
        tenant_id: ctx.tenant,
        source_type: ctx.member.source_type,
        source_id: ctx.member.source_id.clone(),
        title,
        content,
        created_at,
        updated_at: now,
    };

    let chunks = ctx.take_chunks()?;
    let embeddings = ctx.take_embeddings()?;
    let new_chunks: Vec<NewChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| NewChunk {
            chunk_index: chunk.chunk_index,
            text: chunk.text,
            embedding,
        })
        .collect();
    let chunk_count = new_chunks.len();
    store
        .upsert_document_and_replace_chunks(document, new_chunks)
        .await?;

    debug!(member = %ctx.member, document_id = %id, chunk_count, "persisted document and chunks");
    ctx.document_id = Some(id);

    machine.persist().map_err(|(_, guard)| map_guard_error("persist", &guard))
}
