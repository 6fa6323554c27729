use entity_fetcher::{
    Artifact, Chapter, Character, ContentBlock, ContentReference, Event, EntityRef, Faction,
    Location, Lore, Relation, RelationCitation, Story, Trait, World,
};

/// The entity a renderer projects, paired with whatever child
/// collections its source-type's rendering needs. Assembled by the
/// pipeline after fetching via `EntityFetcher`.
pub enum RenderInput {
    Story(Story),
    Chapter {
        chapter: Chapter,
        content_blocks: Vec<ContentBlock>,
    },
    ContentBlock {
        block: ContentBlock,
        references: Vec<ContentReference>,
    },
    World(World),
    Character {
        character: Character,
        traits: Vec<Trait>,
    },
    Location(Location),
    Event {
        event: Event,
        characters: Vec<EntityRef>,
        locations: Vec<EntityRef>,
        artifacts: Vec<EntityRef>,
    },
    Artifact(Artifact),
    Faction {
        faction: Faction,
        members: Vec<EntityRef>,
    },
    Lore {
        lore: Lore,
        references: Vec<EntityRef>,
    },
    Relation(Relation),
    RelationCitation(RelationCitation),
}
