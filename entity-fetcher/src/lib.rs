//! Read-only accessor to the authoring service for every entity kind and
//! its child collections (C3).

mod http;
pub mod types;

pub use http::HttpEntityFetcher;
pub use types::{
    Artifact, Chapter, Character, ContentBlock, ContentReference, Event, EntityRef, Faction,
    Location, Lore, Relation, RelationCitation, Story, Trait, World,
};

use async_trait::async_trait;
use common::{domain::TenantId, error::AppError};

/// One `get_*` per entity kind plus listings for every child collection a
/// renderer needs. Inputs are opaque identifiers; outputs are plain data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    async fn get_story(&self, tenant: TenantId, id: &str) -> Result<Story, AppError>;
    async fn get_chapter(&self, tenant: TenantId, id: &str) -> Result<Chapter, AppError>;
    async fn get_content_block(&self, tenant: TenantId, id: &str) -> Result<ContentBlock, AppError>;
    async fn get_world(&self, tenant: TenantId, id: &str) -> Result<World, AppError>;
    async fn get_character(&self, tenant: TenantId, id: &str) -> Result<Character, AppError>;
    async fn get_location(&self, tenant: TenantId, id: &str) -> Result<Location, AppError>;
    async fn get_event(&self, tenant: TenantId, id: &str) -> Result<Event, AppError>;
    async fn get_artifact(&self, tenant: TenantId, id: &str) -> Result<Artifact, AppError>;
    async fn get_faction(&self, tenant: TenantId, id: &str) -> Result<Faction, AppError>;
    async fn get_lore(&self, tenant: TenantId, id: &str) -> Result<Lore, AppError>;
    async fn get_relation(&self, tenant: TenantId, id: &str) -> Result<Relation, AppError>;
    async fn get_relation_citation(
        &self,
        tenant: TenantId,
        id: &str,
    ) -> Result<RelationCitation, AppError>;

    async fn list_content_blocks(
        &self,
        tenant: TenantId,
        chapter_id: &str,
    ) -> Result<Vec<ContentBlock>, AppError>;
    async fn list_content_references(
        &self,
        tenant: TenantId,
        content_block_id: &str,
    ) -> Result<Vec<ContentReference>, AppError>;
    async fn list_character_traits(
        &self,
        tenant: TenantId,
        character_id: &str,
    ) -> Result<Vec<Trait>, AppError>;
    async fn list_event_characters(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError>;
    async fn list_event_locations(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError>;
    async fn list_event_artifacts(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError>;
    async fn list_faction_members(
        &self,
        tenant: TenantId,
        faction_id: &str,
    ) -> Result<Vec<EntityRef>, AppError>;
    async fn list_lore_references(
        &self,
        tenant: TenantId,
        lore_id: &str,
    ) -> Result<Vec<EntityRef>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn mock_entity_fetcher_reports_not_found_for_a_deleted_entity() {
        let mut mock = MockEntityFetcher::new();
        mock.expect_get_world()
            .times(1)
            .returning(|_, id| Err(AppError::NotFound(format!("world {id}"))));

        let tenant = TenantId::from_str("11111111-1111-1111-1111-111111111111").unwrap();
        let err = mock.get_world(tenant, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
