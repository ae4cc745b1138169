use sitecms_core::{
    collection::{CollectionKind, CollectionRef, Parent},
    ids::*,
    payload::Payload,
    stamp::Stamp,
};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeRecord {
    pub scope_id: ScopeId,
    pub slug: String,
    pub title: String,
    pub created_at: Stamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub section_id: SectionId,
    pub scope_id: ScopeId,
    pub section_key: String,
    pub payload: Payload,
    pub order_index: i64,
    pub created_at: Stamp,
    pub updated_at: Stamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub entity_id: EntityId,
    pub kind: CollectionKind,
    pub parent: Parent,
    pub payload: Payload,
    pub position: i64,
    pub created_at: Stamp,
    pub updated_at: Stamp,
}

impl EntityRecord {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.kind, self.entity_id)
    }

    pub fn collection(&self) -> CollectionRef {
        CollectionRef {
            kind: self.kind,
            parent: self.parent,
        }
    }
}

/// Keyed section content, one row per `(scope, section_key)`.
pub trait ContentStore {
    fn get_scope(&self, slug: &str) -> Result<Option<ScopeRecord>, StorageError>;

    /// Get-or-create by slug in one statement. `title` only applies when the
    /// scope is created; an existing scope keeps its title. The flag reports
    /// whether this call created the row.
    fn upsert_scope(&mut self, slug: &str, title: &str)
    -> Result<(ScopeRecord, bool), StorageError>;

    fn get_section(
        &self,
        scope_id: ScopeId,
        section_key: &str,
    ) -> Result<Option<SectionRecord>, StorageError>;

    /// All sections of a scope by `(order_index, created_at)`.
    fn list_sections(&self, scope_id: ScopeId) -> Result<Vec<SectionRecord>, StorageError>;

    /// Insert-or-update on `(scope_id, section_key)`. A `None` order index
    /// appends on insert and keeps the current index on update.
    fn put_section(
        &mut self,
        scope_id: ScopeId,
        section_key: &str,
        payload: &Payload,
        order_index: Option<i64>,
    ) -> Result<SectionRecord, StorageError>;

    /// Returns whether a row was removed.
    fn delete_section(&mut self, scope_id: ScopeId, section_key: &str)
    -> Result<bool, StorageError>;

    /// Rewrite `order_index` of every section of the scope. The keys must be
    /// exactly the scope's current key set.
    fn set_section_order(
        &mut self,
        scope_id: ScopeId,
        section_keys: &[String],
    ) -> Result<(), StorageError>;
}

/// Ordered child collections.
pub trait CollectionStore {
    /// Siblings by `(position, created_at)`. Always read from the database.
    fn list_items(&self, collection: CollectionRef) -> Result<Vec<EntityRecord>, StorageError>;

    fn get_item(&self, entity_id: EntityId) -> Result<Option<EntityRecord>, StorageError>;

    /// Append at `position = sibling count`.
    fn add_item(
        &mut self,
        collection: CollectionRef,
        payload: &Payload,
    ) -> Result<EntityRecord, StorageError>;

    /// Returns whether a row was removed. Siblings keep their positions.
    fn remove_item(&mut self, entity_id: EntityId) -> Result<bool, StorageError>;

    /// Atomically set each listed entity's position to its index. Rejects the
    /// whole call unless `ids` is exactly the collection's current id set.
    fn set_order(&mut self, collection: CollectionRef, ids: &[EntityId])
    -> Result<(), StorageError>;

    /// Merge-patch the payload. `position` is untouched.
    fn update_fields(
        &mut self,
        entity_id: EntityId,
        patch: &Payload,
    ) -> Result<EntityRecord, StorageError>;
}
