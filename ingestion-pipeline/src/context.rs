use chunker::Chunk;
use common::{domain::TenantId, domain::QueueMember, error::AppError};
use document_renderer::RenderInput;
use tracing::error;

/// Carries one ingestion attempt's intermediate artifacts between stage
/// functions. Each field is populated by exactly one stage and consumed
/// by the next; a stage reaching in for a field no earlier stage set is
/// an internal bug, not a caller error.
pub struct PipelineContext<'a> {
    pub tenant: TenantId,
    pub member: &'a QueueMember,
    pub render_input: Option<RenderInput>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub chunks: Option<Vec<Chunk>>,
    pub embeddings: Option<Vec<Vec<f32>>>,
    pub document_id: Option<String>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(tenant: TenantId, member: &'a QueueMember, render_input: RenderInput) -> Self {
        Self {
            tenant,
            member,
            render_input: Some(render_input),
            title: None,
            content: None,
            chunks: None,
            embeddings: None,
            document_id: None,
        }
    }

    pub fn take_render_input(&mut self) -> Result<RenderInput, AppError> {
        self.render_input
            .take()
            .ok_or_else(|| AppError::Internal("render input expected to be available".to_string()))
    }

    pub fn take_content(&mut self) -> Result<String, AppError> {
        self.content
            .take()
            .ok_or_else(|| AppError::Internal("rendered content expected to be available".to_string()))
    }

    pub fn chunks(&self) -> Result<&[Chunk], AppError> {
        self.chunks
            .as_deref()
            .ok_or_else(|| AppError::Internal("chunks expected to be available".to_string()))
    }

    pub fn take_chunks(&mut self) -> Result<Vec<Chunk>, AppError> {
        self.chunks
            .take()
            .ok_or_else(|| AppError::Internal("chunks expected to be available".to_string()))
    }

    pub fn take_embeddings(&mut self) -> Result<Vec<Vec<f32>>, AppError> {
        self.embeddings
            .take()
            .ok_or_else(|| AppError::Internal("embeddings expected to be available".to_string()))
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            tenant = %self.tenant,
            member = %self.member,
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }
}
