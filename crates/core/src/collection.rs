use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::EntityId;
use crate::payload::Payload;
use crate::shapes::VideoKind;

/// The ordered collections the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Top-level portfolio cases.
    Case,
    /// Images of one case.
    Image,
    /// Videos of one case.
    Video,
    /// Team members.
    Team,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [Self::Case, Self::Image, Self::Video, Self::Team];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Image => "image",
            Self::Video => "video",
            Self::Team => "team",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::InvalidData(format!("unknown collection kind: {s}")))
    }

    /// Item-key prefix for this collection.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Image => "img",
            Self::Video => "vid",
            Self::Team => "team",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == prefix)
    }

    /// Collection whose entities own rows of this kind, if any.
    pub fn parent_kind(&self) -> Option<CollectionKind> {
        match self {
            Self::Image | Self::Video => Some(Self::Case),
            Self::Case | Self::Team => None,
        }
    }

    /// Minimal shape check applied on `add`. Anything beyond the required
    /// fields is left to the editor.
    pub fn validate_payload(&self, payload: &Payload) -> Result<(), CoreError> {
        match self {
            Self::Case => {
                payload.require_str("title")?;
            }
            Self::Image => {
                payload.require_str("url")?;
            }
            Self::Video => {
                payload.require_str("url")?;
                VideoKind::parse(payload.require_str("kind")?)?;
            }
            Self::Team => {
                payload.require_str("name")?;
            }
        }
        Ok(())
    }
}

/// Owner of a collection's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    /// The implicit root ("all cases", "the team").
    Root,
    Entity(EntityId),
}

impl Parent {
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            Self::Root => None,
            Self::Entity(id) => Some(*id),
        }
    }
}

/// One ordered sibling set: a collection kind under a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub kind: CollectionKind,
    pub parent: Parent,
}

impl CollectionRef {
    pub fn cases() -> Self {
        Self {
            kind: CollectionKind::Case,
            parent: Parent::Root,
        }
    }

    pub fn team() -> Self {
        Self {
            kind: CollectionKind::Team,
            parent: Parent::Root,
        }
    }

    pub fn images(case_id: EntityId) -> Self {
        Self {
            kind: CollectionKind::Image,
            parent: Parent::Entity(case_id),
        }
    }

    pub fn videos(case_id: EntityId) -> Self {
        Self {
            kind: CollectionKind::Video,
            parent: Parent::Entity(case_id),
        }
    }

    /// Check that the parent matches what the kind expects.
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.kind.parent_kind(), self.parent) {
            (None, Parent::Root) | (Some(_), Parent::Entity(_)) => Ok(()),
            (None, Parent::Entity(_)) => Err(CoreError::InvalidData(format!(
                "{} collection has no parent entity",
                self.kind.as_str()
            ))),
            (Some(parent_kind), Parent::Root) => Err(CoreError::InvalidData(format!(
                "{} collection requires a {} parent",
                self.kind.as_str(),
                parent_kind.as_str()
            ))),
        }
    }
}
