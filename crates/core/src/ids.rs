use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::collection::CollectionKind;
use crate::error::CoreError;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn parse_str(s: &str) -> Result<Self, CoreError> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    CoreError::InvalidData(format!("{} {s:?}: {e}", stringify!($name)))
                })
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(ScopeId);
uuid_id!(SectionId);
uuid_id!(EntityId);

/// An entity id qualified by the collection it lives in.
///
/// Rendered as `<prefix>-<uuid>`, e.g. `img-0192c3f0-...`. The prefix is what
/// lets one drag surface host several collections without merging them: two
/// keys with different prefixes never belong to the same ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    kind: CollectionKind,
    id: EntityId,
}

impl ItemKey {
    pub fn new(kind: CollectionKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.id)
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ItemKey({}-{})",
            self.kind.prefix(),
            &self.id.as_uuid().to_string()[..8]
        )
    }
}

impl FromStr for ItemKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) = s
            .split_once('-')
            .ok_or_else(|| CoreError::InvalidItemKey(format!("missing prefix in {s:?}")))?;
        let kind = CollectionKind::from_prefix(prefix)
            .ok_or_else(|| CoreError::InvalidItemKey(format!("unknown prefix {prefix:?} in {s:?}")))?;
        let uuid = Uuid::parse_str(rest)
            .map_err(|e| CoreError::InvalidItemKey(format!("{s:?}: {e}")))?;
        Ok(Self::new(kind, EntityId::from_uuid(uuid)))
    }
}

impl Serialize for ItemKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
