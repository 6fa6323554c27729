//! Tenant-scoped identifiers and the source-type tag shared across every
//! component: the queue encodes members from it, the fetcher dispatches on
//! it, the renderer matches on it, the pipeline registry is keyed by it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Opaque tenant identifier. All queue partitions, documents, and chunks
/// are scoped by tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub uuid::Uuid);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TenantId(uuid::Uuid::parse_str(s)?))
    }
}

/// The enumerated tag carried by every queue member and source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Story,
    Chapter,
    ContentBlock,
    World,
    Character,
    Location,
    Event,
    Artifact,
    Faction,
    Lore,
    Relation,
    RelationCitation,
}

impl SourceType {
    /// The member-prefix form used by `pop_stable_by_prefix`, e.g. `"story:"`.
    #[must_use]
    pub fn member_prefix(self) -> String {
        format!("{self}:")
    }

    /// All variants, for registries that iterate every source type.
    #[must_use]
    pub fn all() -> [SourceType; 12] {
        [
            SourceType::Story,
            SourceType::Chapter,
            SourceType::ContentBlock,
            SourceType::World,
            SourceType::Character,
            SourceType::Location,
            SourceType::Event,
            SourceType::Artifact,
            SourceType::Faction,
            SourceType::Lore,
            SourceType::Relation,
            SourceType::RelationCitation,
        ]
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SourceType::Story => "story",
            SourceType::Chapter => "chapter",
            SourceType::ContentBlock => "content_block",
            SourceType::World => "world",
            SourceType::Character => "character",
            SourceType::Location => "location",
            SourceType::Event => "event",
            SourceType::Artifact => "artifact",
            SourceType::Faction => "faction",
            SourceType::Lore => "lore",
            SourceType::Relation => "relation",
            SourceType::RelationCitation => "relation_citation",
        };
        f.write_str(tag)
    }
}

impl FromStr for SourceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "story" => SourceType::Story,
            "chapter" => SourceType::Chapter,
            "content_block" => SourceType::ContentBlock,
            "world" => SourceType::World,
            "character" => SourceType::Character,
            "location" => SourceType::Location,
            "event" => SourceType::Event,
            "artifact" => SourceType::Artifact,
            "faction" => SourceType::Faction,
            "lore" => SourceType::Lore,
            "relation" => SourceType::Relation,
            "relation_citation" => SourceType::RelationCitation,
            other => return Err(AppError::Invalid(format!("unknown source_type {other:?}"))),
        })
    }
}

/// A single queue member: `(source_type, source_id)`, encoded on the wire
/// as `"{source_type}:{source_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueMember {
    pub source_type: SourceType,
    pub source_id: String,
}

impl QueueMember {
    #[must_use]
    pub fn new(source_type: SourceType, source_id: impl Into<String>) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
        }
    }
}

impl fmt::Display for QueueMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_type, self.source_id)
    }
}

impl FromStr for QueueMember {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| AppError::Invalid(format!("malformed queue member {s:?}")))?;
        if id.is_empty() {
            return Err(AppError::Invalid(format!("malformed queue member {s:?}")));
        }
        Ok(QueueMember {
            source_type: prefix.parse()?,
            source_id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_member_round_trips_through_its_string_encoding() {
        let member = QueueMember::new(SourceType::Chapter, "abc-123");
        let encoded = member.to_string();
        assert_eq!(encoded, "chapter:abc-123");
        let decoded: QueueMember = encoded.parse().unwrap();
        assert_eq!(decoded, member);
    }

    #[test]
    fn member_prefix_matches_the_display_form_prefix() {
        let member = QueueMember::new(SourceType::Story, "s1");
        assert!(member.to_string().starts_with(&SourceType::Story.member_prefix()));
    }

    #[test]
    fn rejects_missing_source_id() {
        let err = "story:".parse::<QueueMember>();
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_prefix() {
        let err = "unknown:1".parse::<QueueMember>();
        assert!(err.is_err());
    }
}
