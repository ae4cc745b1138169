pub mod config;
pub mod error;
pub mod reorder;

pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, ErrorClass};
pub use reorder::{
    DragOutcome, DragSurface, Gesture, OrderBackend, OrderTarget, PageSections, PendingReorder,
    ReorderPhase, ReorderSession,
};

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use sitecms_core::{
    collection::CollectionRef,
    ids::*,
    payload::Payload,
    scopes,
    shapes::{CasePayload, ImagePayload, TeamMemberPayload, VideoPayload},
};
use sitecms_storage::{
    CollectionStore, ContentStore, EntityRecord, ScopeRecord, SectionRecord, SqliteStorage,
};

/// Result of a section read: one record when a key was asked for, otherwise
/// the whole page in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionRead {
    Single(Option<SectionRecord>),
    All(Vec<SectionRecord>),
}

/// Read/write façade over the content and collection stores.
pub struct Engine {
    storage: SqliteStorage,
    scope_titles: BTreeMap<String, String>,
}

impl Engine {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage,
            scope_titles: BTreeMap::new(),
        }
    }

    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let storage = if config.is_in_memory() {
            SqliteStorage::open_in_memory()?
        } else {
            SqliteStorage::open_with_timeout(&config.database_path, config.busy_timeout())?
        };
        debug!(path = %config.database_path, "engine opened");
        Ok(Self {
            storage,
            scope_titles: config.scope_titles.clone(),
        })
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    fn title_for(&self, slug: &str) -> String {
        self.scope_titles
            .get(slug)
            .cloned()
            .unwrap_or_else(|| scopes::default_title(slug))
    }

    /// Existing scope id for a slug, without creating anything.
    fn lookup_scope(&self, slug: &str) -> Result<Option<ScopeId>, EngineError> {
        scopes::validate_slug(slug)?;
        Ok(self.storage.get_scope(slug)?.map(|s| s.scope_id))
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Scope id for `slug`, creating the scope if it does not exist yet.
    pub fn resolve_scope(&mut self, slug: &str) -> Result<ScopeId, EngineError> {
        scopes::validate_slug(slug)?;
        let title = self.title_for(slug);
        let (scope, created) = self.storage.upsert_scope(slug, &title)?;
        if created {
            info!(slug, title = %scope.title, "scope created");
        }
        Ok(scope.scope_id)
    }

    pub fn scope(&self, slug: &str) -> Result<Option<ScopeRecord>, EngineError> {
        scopes::validate_slug(slug)?;
        Ok(self.storage.get_scope(slug)?)
    }

    // ========================================================================
    // Sections
    // ========================================================================

    /// Payload stored under `(slug, key)`. Unknown pages read as absent.
    pub fn get_section(&self, slug: &str, key: &str) -> Result<Option<Payload>, EngineError> {
        Ok(self.section_record(slug, key)?.map(|r| r.payload))
    }

    pub fn section_record(
        &self,
        slug: &str,
        key: &str,
    ) -> Result<Option<SectionRecord>, EngineError> {
        scopes::validate_section_key(key)?;
        let Some(scope_id) = self.lookup_scope(slug)? else {
            debug!(slug, key, "section read on unknown scope");
            return Ok(None);
        };
        let record = self.storage.get_section(scope_id, key)?;
        debug!(slug, key, found = record.is_some(), "section read");
        Ok(record)
    }

    /// All sections of a page by `order_index`.
    pub fn sections(&self, slug: &str) -> Result<Vec<SectionRecord>, EngineError> {
        match self.lookup_scope(slug)? {
            Some(scope_id) => Ok(self.storage.list_sections(scope_id)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn read_sections(&self, slug: &str, key: Option<&str>) -> Result<SectionRead, EngineError> {
        match key {
            Some(key) => Ok(SectionRead::Single(self.section_record(slug, key)?)),
            None => Ok(SectionRead::All(self.sections(slug)?)),
        }
    }

    /// Upsert a section's payload, creating the page on first write.
    pub fn put_section(
        &mut self,
        slug: &str,
        key: &str,
        payload: Value,
    ) -> Result<Payload, EngineError> {
        self.write_section(slug, key, payload, None)
    }

    /// Like [`Engine::put_section`] but also sets the section's order index.
    pub fn put_section_at(
        &mut self,
        slug: &str,
        key: &str,
        payload: Value,
        order_index: i64,
    ) -> Result<Payload, EngineError> {
        if order_index < 0 {
            return Err(EngineError::Validation(format!(
                "order index must be >= 0, got {order_index}"
            )));
        }
        self.write_section(slug, key, payload, Some(order_index))
    }

    fn write_section(
        &mut self,
        slug: &str,
        key: &str,
        payload: Value,
        order_index: Option<i64>,
    ) -> Result<Payload, EngineError> {
        scopes::validate_section_key(key)?;
        let payload = Payload::from_value(payload)?;
        let scope_id = self.resolve_scope(slug)?;
        let record = self
            .storage
            .put_section(scope_id, key, &payload, order_index)?;
        Ok(record.payload)
    }

    /// Remove a section. Absent pages and keys are not an error.
    pub fn delete_section(&mut self, slug: &str, key: &str) -> Result<(), EngineError> {
        scopes::validate_section_key(key)?;
        if let Some(scope_id) = self.lookup_scope(slug)? {
            self.storage.delete_section(scope_id, key)?;
        }
        Ok(())
    }

    pub fn reorder_sections(&mut self, slug: &str, keys: &[String]) -> Result<(), EngineError> {
        let scope_id = self.lookup_scope(slug)?.ok_or_else(|| {
            EngineError::Storage(sitecms_storage::StorageError::NotFound(format!("scope {slug}")))
        })?;
        self.storage.set_section_order(scope_id, keys)?;
        Ok(())
    }

    // ========================================================================
    // Collections
    // ========================================================================

    pub fn list_items(&self, collection: CollectionRef) -> Result<Vec<EntityRecord>, EngineError> {
        Ok(self.storage.list_items(collection)?)
    }

    pub fn item_keys(&self, collection: CollectionRef) -> Result<Vec<ItemKey>, EngineError> {
        Ok(self
            .list_items(collection)?
            .iter()
            .map(EntityRecord::key)
            .collect())
    }

    /// The entity behind `key`. A key whose prefix does not match the stored
    /// collection reads as absent.
    pub fn get_item(&self, key: &ItemKey) -> Result<Option<EntityRecord>, EngineError> {
        Ok(self
            .storage
            .get_item(key.id())?
            .filter(|record| record.kind == key.kind()))
    }

    /// Append an item to a collection after checking its required fields.
    pub fn add_item(
        &mut self,
        collection: CollectionRef,
        payload: Value,
    ) -> Result<EntityRecord, EngineError> {
        let payload = Payload::from_value(payload)?;
        collection.kind.validate_payload(&payload)?;
        let record = self.storage.add_item(collection, &payload)?;
        debug!(key = %record.key(), position = record.position, "item added");
        Ok(record)
    }

    pub fn add_case(&mut self, case: &CasePayload) -> Result<EntityRecord, EngineError> {
        self.add_item(CollectionRef::cases(), case.to_payload()?.into_value())
    }

    pub fn add_image(
        &mut self,
        case_id: EntityId,
        image: &ImagePayload,
    ) -> Result<EntityRecord, EngineError> {
        self.add_item(CollectionRef::images(case_id), image.to_payload()?.into_value())
    }

    pub fn add_video(
        &mut self,
        case_id: EntityId,
        video: &VideoPayload,
    ) -> Result<EntityRecord, EngineError> {
        self.add_item(CollectionRef::videos(case_id), video.to_payload()?.into_value())
    }

    pub fn add_team_member(
        &mut self,
        member: &TeamMemberPayload,
    ) -> Result<EntityRecord, EngineError> {
        self.add_item(CollectionRef::team(), member.to_payload()?.into_value())
    }

    /// Delete an item. Siblings keep their positions until the next reorder.
    pub fn remove_item(&mut self, key: &ItemKey) -> Result<(), EngineError> {
        if let Some(record) = self.storage.get_item(key.id())? {
            if record.kind != key.kind() {
                return Err(EngineError::Validation(format!(
                    "{key} refers to a {} item",
                    record.kind.as_str()
                )));
            }
        }
        self.storage.remove_item(key.id())?;
        Ok(())
    }

    /// Persist a full ordering of one collection in a single write.
    pub fn set_order(
        &mut self,
        collection: CollectionRef,
        order: &[ItemKey],
    ) -> Result<(), EngineError> {
        if let Some(foreign) = order.iter().find(|k| k.kind() != collection.kind) {
            return Err(EngineError::Validation(format!(
                "{foreign} does not belong to the {} collection",
                collection.kind.as_str()
            )));
        }
        let ids: Vec<EntityId> = order.iter().map(ItemKey::id).collect();
        self.storage.set_order(collection, &ids)?;
        Ok(())
    }

    /// Merge `patch` into an item's payload. A `null` value removes the field.
    pub fn update_fields(
        &mut self,
        key: &ItemKey,
        patch: Value,
    ) -> Result<EntityRecord, EngineError> {
        let patch = Payload::from_value(patch)?;
        if self.get_item(key)?.is_none() {
            return Err(EngineError::ItemNotFound(key.to_string()));
        }
        Ok(self.storage.update_fields(key.id(), &patch)?)
    }

}

// ============================================================================
// Reorder backend
// ============================================================================

impl OrderBackend<CollectionRef> for Engine {
    type Error = EngineError;

    fn fetch_order(&mut self, target: &CollectionRef) -> Result<Vec<ItemKey>, EngineError> {
        self.item_keys(*target)
    }

    fn persist_order(
        &mut self,
        target: &CollectionRef,
        order: &[ItemKey],
    ) -> Result<(), EngineError> {
        self.set_order(*target, order)
    }
}

impl OrderBackend<PageSections> for Engine {
    type Error = EngineError;

    fn fetch_order(&mut self, target: &PageSections) -> Result<Vec<String>, EngineError> {
        Ok(self
            .sections(&target.0)?
            .into_iter()
            .map(|s| s.section_key)
            .collect())
    }

    fn persist_order(&mut self, target: &PageSections, order: &[String]) -> Result<(), EngineError> {
        self.reorder_sections(&target.0, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitecms_core::CollectionKind;
    use sitecms_storage::StorageError;

    fn engine() -> Engine {
        Engine::new(SqliteStorage::open_in_memory().unwrap())
    }

    #[test]
    fn put_and_get_section() {
        let mut e = engine();
        e.put_section("home", "hero", json!({"title": "X"})).unwrap();
        let payload = e.get_section("home", "hero").unwrap().unwrap();
        assert_eq!(payload.get_str("title"), Some("X"));
    }

    #[test]
    fn reads_do_not_create_scopes() {
        let e = engine();
        assert_eq!(e.get_section("nowhere", "hero").unwrap(), None);
        assert!(e.sections("nowhere").unwrap().is_empty());
        assert!(e.scope("nowhere").unwrap().is_none());
    }

    #[test]
    fn resolve_scope_uses_known_and_configured_titles() {
        let mut e = engine();
        e.resolve_scope("ueber-uns").unwrap();
        assert_eq!(e.scope("ueber-uns").unwrap().unwrap().title, "Über uns");

        e.resolve_scope("landing-b").unwrap();
        assert_eq!(e.scope("landing-b").unwrap().unwrap().title, "landing-b");

        let mut config = EngineConfig::in_memory();
        config
            .scope_titles
            .insert("mittelstand".into(), "Digitalisierung im Mittelstand".into());
        let mut e = Engine::open(&config).unwrap();
        e.resolve_scope("mittelstand").unwrap();
        assert_eq!(
            e.scope("mittelstand").unwrap().unwrap().title,
            "Digitalisierung im Mittelstand"
        );
    }

    #[test]
    fn rejects_blank_key_and_non_object_payload() {
        let mut e = engine();
        let err = e.put_section("home", "", json!({})).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);

        let err = e.put_section("home", "hero", json!(["a"])).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);

        let err = e.put_section("home", "hero", json!("text")).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);

        // Nothing was written, not even the scope.
        assert!(e.scope("home").unwrap().is_none());
    }

    #[test]
    fn delete_missing_section_is_ok() {
        let mut e = engine();
        e.delete_section("home", "hero").unwrap();
        e.put_section("home", "hero", json!({"title": "X"})).unwrap();
        e.delete_section("home", "hero").unwrap();
        e.delete_section("home", "hero").unwrap();
        assert_eq!(e.get_section("home", "hero").unwrap(), None);
    }

    #[test]
    fn read_sections_single_or_all() {
        let mut e = engine();
        e.put_section("home", "hero", json!({"title": "X"})).unwrap();
        e.put_section("home", "faq", json!({"items": []})).unwrap();

        match e.read_sections("home", Some("faq")).unwrap() {
            SectionRead::Single(Some(record)) => assert_eq!(record.section_key, "faq"),
            other => panic!("unexpected read: {other:?}"),
        }
        match e.read_sections("home", None).unwrap() {
            SectionRead::All(records) => {
                let keys: Vec<_> = records.iter().map(|r| r.section_key.as_str()).collect();
                assert_eq!(keys, vec!["hero", "faq"]);
            }
            other => panic!("unexpected read: {other:?}"),
        }
    }

    #[test]
    fn put_section_at_sets_index() {
        let mut e = engine();
        e.put_section("home", "hero", json!({})).unwrap();
        e.put_section("home", "faq", json!({})).unwrap();
        e.put_section_at("home", "faq", json!({}), 0).unwrap();
        e.put_section_at("home", "hero", json!({}), 1).unwrap();
        let keys: Vec<_> = e
            .sections("home")
            .unwrap()
            .into_iter()
            .map(|s| s.section_key)
            .collect();
        assert_eq!(keys, vec!["faq", "hero"]);
        assert!(e.put_section_at("home", "faq", json!({}), -1).is_err());
    }

    #[test]
    fn add_item_validates_required_fields() {
        let mut e = engine();
        let err = e.add_item(CollectionRef::cases(), json!({"summary": "no title"})).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        assert!(e.list_items(CollectionRef::cases()).unwrap().is_empty());
    }

    #[test]
    fn set_order_rejects_keys_of_other_collections() {
        let mut e = engine();
        let case = e
            .add_case(&CasePayload {
                title: "A".into(),
                slug: None,
                summary: None,
                cover_url: None,
            })
            .unwrap();
        let wrong = ItemKey::new(CollectionKind::Image, case.entity_id);
        let err = e.set_order(CollectionRef::cases(), &[wrong]).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn get_item_with_wrong_prefix_reads_absent() {
        let mut e = engine();
        let member = e
            .add_team_member(&TeamMemberPayload {
                name: "Jana".into(),
                role: None,
                photo_url: None,
                bio: None,
            })
            .unwrap();
        assert!(e.get_item(&member.key()).unwrap().is_some());
        let wrong = ItemKey::new(CollectionKind::Case, member.entity_id);
        assert!(e.get_item(&wrong).unwrap().is_none());
        assert!(e.remove_item(&wrong).is_err());
    }

    #[test]
    fn update_fields_on_missing_item_is_conflict() {
        let mut e = engine();
        let key = ItemKey::new(CollectionKind::Video, EntityId::new());
        let err = e.update_fields(&key, json!({"title": "x"})).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Conflict);
    }

    #[test]
    fn reorder_sections_of_unknown_page_is_not_found() {
        let mut e = engine();
        let err = e.reorder_sections("nowhere", &[]).unwrap_err();
        assert!(matches!(err, EngineError::Storage(StorageError::NotFound(_))));
    }
}
