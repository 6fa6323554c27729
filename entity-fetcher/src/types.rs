use common::domain::SourceType;
use serde::Deserialize;

/// Minimal shared shape for a related entity when the renderer only needs
/// its identity and display name (event participants, faction members,
/// lore references).
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub premise: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub story_id: String,
    pub title: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    pub chapter_id: String,
    pub order_index: i64,
    pub text: String,
}

/// A content block's reference to another entity. Collapses the source's
/// `ContentAnchor`/`ContentBlockReference` pair into one shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentReference {
    pub target_type: SourceType,
    pub target_id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct World {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trait {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub occurred_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Faction {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lore {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relation {
    pub id: String,
    pub relation_type: String,
    pub source_id: String,
    pub target_id: String,
}

/// A story's reference into a world's lore, routed like a relation but
/// kept as its own variant per the worker's source-type taxonomy.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationCitation {
    pub id: String,
    pub story_id: String,
    pub world_id: String,
    pub citation_text: String,
}
