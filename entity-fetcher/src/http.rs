use async_trait::async_trait;
use common::{domain::TenantId, error::AppError};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    Artifact, Chapter, Character, ContentBlock, ContentReference, EntityRef, Event, Faction,
    Location, Lore, Relation, RelationCitation, Story, Trait, World,
};
use crate::EntityFetcher;

/// Stands in for "the concrete RPC wire protocol is out of scope": issues
/// plain `GET` requests against `base_url` and maps HTTP 404 to
/// `AppError::NotFound`, any other non-2xx/transport failure to
/// `AppError::TransientTransport`.
pub struct HttpEntityFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEntityFetcher {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, tenant: TenantId, path: &str) -> Result<T, AppError> {
        let url = format!("{}/tenants/{}{}", self.base_url, tenant, path);
        debug!(%url, "fetching entity from authoring service");
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(AppError::TransientTransport(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response.json::<T>().await.map_err(AppError::from)
    }
}

#[async_trait]
impl EntityFetcher for HttpEntityFetcher {
    async fn get_story(&self, tenant: TenantId, id: &str) -> Result<Story, AppError> {
        self.get(tenant, &format!("/stories/{id}")).await
    }

    async fn get_chapter(&self, tenant: TenantId, id: &str) -> Result<Chapter, AppError> {
        self.get(tenant, &format!("/chapters/{id}")).await
    }

    async fn get_content_block(&self, tenant: TenantId, id: &str) -> Result<ContentBlock, AppError> {
        self.get(tenant, &format!("/content-blocks/{id}")).await
    }

    async fn get_world(&self, tenant: TenantId, id: &str) -> Result<World, AppError> {
        self.get(tenant, &format!("/worlds/{id}")).await
    }

    async fn get_character(&self, tenant: TenantId, id: &str) -> Result<Character, AppError> {
        self.get(tenant, &format!("/characters/{id}")).await
    }

    async fn get_location(&self, tenant: TenantId, id: &str) -> Result<Location, AppError> {
        self.get(tenant, &format!("/locations/{id}")).await
    }

    async fn get_event(&self, tenant: TenantId, id: &str) -> Result<Event, AppError> {
        self.get(tenant, &format!("/events/{id}")).await
    }

    async fn get_artifact(&self, tenant: TenantId, id: &str) -> Result<Artifact, AppError> {
        self.get(tenant, &format!("/artifacts/{id}")).await
    }

    async fn get_faction(&self, tenant: TenantId, id: &str) -> Result<Faction, AppError> {
        self.get(tenant, &format!("/factions/{id}")).await
    }

    async fn get_lore(&self, tenant: TenantId, id: &str) -> Result<Lore, AppError> {
        self.get(tenant, &format!("/lore/{id}")).await
    }

    async fn get_relation(&self, tenant: TenantId, id: &str) -> Result<Relation, AppError> {
        self.get(tenant, &format!("/relations/{id}")).await
    }

    async fn get_relation_citation(
        &self,
        tenant: TenantId,
        id: &str,
    ) -> Result<RelationCitation, AppError> {
        self.get(tenant, &format!("/relation-citations/{id}")).await
    }

    async fn list_content_blocks(
        &self,
        tenant: TenantId,
        chapter_id: &str,
    ) -> Result<Vec<ContentBlock>, AppError> {
        self.get(tenant, &format!("/chapters/{chapter_id}/content-blocks"))
            .await
    }

    async fn list_content_references(
        &self,
        tenant: TenantId,
        content_block_id: &str,
    ) -> Result<Vec<ContentReference>, AppError> {
        self.get(
            tenant,
            &format!("/content-blocks/{content_block_id}/references"),
        )
        .await
    }

    async fn list_character_traits(
        &self,
        tenant: TenantId,
        character_id: &str,
    ) -> Result<Vec<Trait>, AppError> {
        self.get(tenant, &format!("/characters/{character_id}/traits"))
            .await
    }

    async fn list_event_characters(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        self.get(tenant, &format!("/events/{event_id}/characters"))
            .await
    }

    async fn list_event_locations(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        self.get(tenant, &format!("/events/{event_id}/locations"))
            .await
    }

    async fn list_event_artifacts(
        &self,
        tenant: TenantId,
        event_id: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        self.get(tenant, &format!("/events/{event_id}/artifacts"))
            .await
    }

    async fn list_faction_members(
        &self,
        tenant: TenantId,
        faction_id: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        self.get(tenant, &format!("/factions/{faction_id}/members"))
            .await
    }

    async fn list_lore_references(
        &self,
        tenant: TenantId,
        lore_id: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        self.get(tenant, &format!("/lore/{lore_id}/references"))
            .await
    }
}
