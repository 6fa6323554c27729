//! Deterministic projection of an entity (+ its pertinent children) into
//! a titled text document (C4).

mod input;
mod section;

pub use input::RenderInput;

use std::sync::Arc;

use async_trait::async_trait;
use common::error::AppError;
use section::SectionBuilder;
use tracing::warn;

/// Narrow capability the renderer uses to prepend a one-sentence summary.
/// Satisfied by the executor handle produced by `llm-executor`; the
/// adapter wiring a concrete provider into this trait lives with whoever
/// constructs the renderer, not here.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String, AppError>;
}

/// Renders `RenderInput`s into `(title, content)` pairs. Summary
/// generation is supplied at construction time, never via a late setter:
/// a renderer either has a summary generator for its whole lifetime or
/// never does.
pub struct DocumentRenderer {
    summary_generator: Option<Arc<dyn SummaryGenerator>>,
}

impl DocumentRenderer {
    #[must_use]
    pub fn new(summary_generator: Option<Arc<dyn SummaryGenerator>>) -> Self {
        Self { summary_generator }
    }

    /// Projects `input` into `(title, content)`. Deterministic given
    /// `input` alone; when a summary generator is configured, a one
    /// sentence summary is prepended to `content` unless generation
    /// fails, in which case the un-summarized form is returned.
    pub async fn render(&self, input: &RenderInput) -> (String, String) {
        let (title, content) = render_deterministic(input);
        let content = self.maybe_prepend_summary(content).await;
        (title, content)
    }

    async fn maybe_prepend_summary(&self, content: String) -> String {
        let Some(generator) = &self.summary_generator else {
            return content;
        };
        if content.trim().is_empty() {
            return content;
        }
        match generator.summarize(&content).await {
            Ok(summary) if !summary.trim().is_empty() => {
                format!("{}\n\n{}", summary.trim(), content)
            }
            Ok(_) => content,
            Err(err) => {
                warn!(error = %err, "summary generation failed, falling back to un-summarized content");
                content
            }
        }
    }
}

fn render_deterministic(input: &RenderInput) -> (String, String) {
    match input {
        RenderInput::Story(story) => (
            story.title.clone(),
            SectionBuilder::new().push("Premise", &story.premise).build(),
        ),
        RenderInput::Chapter {
            chapter,
            content_blocks,
        } => {
            let mut blocks = content_blocks.clone();
            blocks.sort_by_key(|b| b.order_index);
            let body = blocks
                .into_iter()
                .map(|b| b.text)
                .collect::<Vec<_>>()
                .join("\n\n");
            (chapter.title.clone(), SectionBuilder::new().push("Content", &body).build())
        }
        RenderInput::ContentBlock { block, references } => {
            let reference_lines: Vec<String> = references
                .iter()
                .map(|r| match &r.label {
                    Some(label) => format!("{} ({}: {})", label, r.target_type, r.target_id),
                    None => format!("{}: {}", r.target_type, r.target_id),
                })
                .collect();
            let title = format!("Scene {}", block.order_index);
            let content = SectionBuilder::new()
                .push("Text", &block.text)
                .push_list("References", &reference_lines)
                .build();
            (title, content)
        }
        RenderInput::World(world) => (
            world.name.clone(),
            SectionBuilder::new().push("Description", &world.description).build(),
        ),
        RenderInput::Character { character, traits } => {
            let trait_lines: Vec<String> = traits.iter().map(|t| format!("{}: {}", t.name, t.value)).collect();
            let content = SectionBuilder::new()
                .push("Description", &character.description)
                .push_list("Traits", &trait_lines)
                .build();
            (character.name.clone(), content)
        }
        RenderInput::Location(location) => (
            location.name.clone(),
            SectionBuilder::new().push("Description", &location.description).build(),
        ),
        RenderInput::Event {
            event,
            characters,
            locations,
            artifacts,
        } => {
            let character_lines: Vec<String> = characters.iter().map(|e| e.name.clone()).collect();
            let location_lines: Vec<String> = locations.iter().map(|e| e.name.clone()).collect();
            let artifact_lines: Vec<String> = artifacts.iter().map(|e| e.name.clone()).collect();
            let mut builder = SectionBuilder::new();
            builder.push("Description", &event.description);
            if let Some(occurred_at) = &event.occurred_at {
                builder.push("Occurred At", occurred_at);
            }
            builder
                .push_list("Characters", &character_lines)
                .push_list("Locations", &location_lines)
                .push_list("Artifacts", &artifact_lines);
            (event.name.clone(), builder.build())
        }
        RenderInput::Artifact(artifact) => (
            artifact.name.clone(),
            SectionBuilder::new().push("Description", &artifact.description).build(),
        ),
        RenderInput::Faction { faction, members } => {
            let member_lines: Vec<String> = members.iter().map(|e| e.name.clone()).collect();
            let content = SectionBuilder::new()
                .push("Description", &faction.description)
                .push_list("Members", &member_lines)
                .build();
            (faction.name.clone(), content)
        }
        RenderInput::Lore { lore, references } => {
            let reference_lines: Vec<String> = references.iter().map(|e| e.name.clone()).collect();
            let content = SectionBuilder::new()
                .push("Description", &lore.description)
                .push_list("References", &reference_lines)
                .build();
            (lore.name.clone(), content)
        }
        RenderInput::Relation(relation) => (
            relation.relation_type.clone(),
            SectionBuilder::new()
                .push(
                    "Link",
                    &format!("{} -> {}", relation.source_id, relation.target_id),
                )
                .build(),
        ),
        RenderInput::RelationCitation(citation) => (
            format!("Citation: story {} in world {}", citation.story_id, citation.world_id),
            SectionBuilder::new().push("Citation", &citation.citation_text).build(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_fetcher::{Character, Trait};

    #[tokio::test]
    async fn render_is_deterministic_without_a_summary_generator() {
        let renderer = DocumentRenderer::new(None);
        let input = RenderInput::Character {
            character: Character {
                id: "c1".to_string(),
                name: "Aria".to_string(),
                description: "A wandering mage.".to_string(),
            },
            traits: vec![Trait {
                name: "Brave".to_string(),
                value: "high".to_string(),
            }],
        };

        let (title_a, content_a) = renderer.render(&input).await;
        let (title_b, content_b) = renderer.render(&input).await;

        assert_eq!(title_a, "Aria");
        assert_eq!(title_a, title_b);
        assert_eq!(content_a, content_b);
        assert!(content_a.contains("Brave: high"));
    }

    struct FailingSummaryGenerator;

    #[async_trait]
    impl SummaryGenerator for FailingSummaryGenerator {
        async fn summarize(&self, _content: &str) -> Result<String, AppError> {
            Err(AppError::TransientTransport("down".to_string()))
        }
    }

    #[tokio::test]
    async fn summary_failure_falls_back_to_unsummarized_content() {
        let renderer = DocumentRenderer::new(Some(Arc::new(FailingSummaryGenerator)));
        let input = RenderInput::World(entity_fetcher::World {
            id: "w1".to_string(),
            name: "Asha".to_string(),
            description: "A desert realm.".to_string(),
        });

        let (_, content) = renderer.render(&input).await;
        assert_eq!(content, "Description:\nA desert realm.");
    }

    struct EchoSummaryGenerator;

    #[async_trait]
    impl SummaryGenerator for EchoSummaryGenerator {
        async fn summarize(&self, _content: &str) -> Result<String, AppError> {
            Ok("A short summary.".to_string())
        }
    }

    #[tokio::test]
    async fn summary_is_prepended_when_generation_succeeds() {
        let renderer = DocumentRenderer::new(Some(Arc::new(EchoSummaryGenerator)));
        let input = RenderInput::World(entity_fetcher::World {
            id: "w1".to_string(),
            name: "Asha".to_string(),
            description: "A desert realm.".to_string(),
        });

        let (_, content) = renderer.render(&input).await;
        assert_eq!(content, "A short summary.\n\nDescription:\nA desert realm.");
    }

    #[tokio::test]
    async fn empty_content_is_not_summarized() {
        let renderer = DocumentRenderer::new(Some(Arc::new(EchoSummaryGenerator)));
        let input = RenderInput::World(entity_fetcher::World {
            id: "w1".to_string(),
            name: "Empty".to_string(),
            description: String::new(),
        });

        let (_, content) = renderer.render(&input).await;
        assert_eq!(content, "");
    }
}
