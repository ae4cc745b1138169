use std::collections::HashSet;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use sitecms_core::{
    collection::{CollectionKind, CollectionRef, Parent},
    ids::*,
    payload::Payload,
    stamp::{Stamp, StampClock},
};

use crate::error::StorageError;
use crate::schema::DEFAULT_BUSY_TIMEOUT;
use crate::traits::{CollectionStore, ContentStore, EntityRecord, ScopeRecord, SectionRecord};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

const SCOPE_COLUMNS: &str = "scope_id, slug, title, created_at";
const SECTION_COLUMNS: &str =
    "section_id, scope_id, section_key, payload, order_index, created_at, updated_at";
const ENTITY_COLUMNS: &str =
    "entity_id, collection, parent_id, payload, position, created_at, updated_at";

pub struct SqliteStorage {
    conn: Connection,
    clock: StampClock,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &str, busy_timeout: Duration) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn, busy_timeout)?;
        Ok(Self {
            conn,
            clock: StampClock::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn, DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            clock: StampClock::new(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

struct RawScope {
    scope_id: Vec<u8>,
    slug: String,
    title: String,
    created_at: Vec<u8>,
}

fn raw_scope(row: &rusqlite::Row) -> rusqlite::Result<RawScope> {
    Ok(RawScope {
        scope_id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl RawScope {
    fn into_record(self) -> Result<ScopeRecord, StorageError> {
        Ok(ScopeRecord {
            scope_id: ScopeId::from_bytes(to_array::<16>(self.scope_id, "scope_id")?),
            slug: self.slug,
            title: self.title,
            created_at: Stamp::from_bytes(&to_array::<12>(self.created_at, "created_at")?),
        })
    }
}

struct RawSection {
    section_id: Vec<u8>,
    scope_id: Vec<u8>,
    section_key: String,
    payload: String,
    order_index: i64,
    created_at: Vec<u8>,
    updated_at: Vec<u8>,
}

fn raw_section(row: &rusqlite::Row) -> rusqlite::Result<RawSection> {
    Ok(RawSection {
        section_id: row.get(0)?,
        scope_id: row.get(1)?,
        section_key: row.get(2)?,
        payload: row.get(3)?,
        order_index: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl RawSection {
    fn into_record(self) -> Result<SectionRecord, StorageError> {
        Ok(SectionRecord {
            section_id: SectionId::from_bytes(to_array::<16>(self.section_id, "section_id")?),
            scope_id: ScopeId::from_bytes(to_array::<16>(self.scope_id, "scope_id")?),
            section_key: self.section_key,
            payload: Payload::from_json_str(&self.payload)?,
            order_index: self.order_index,
            created_at: Stamp::from_bytes(&to_array::<12>(self.created_at, "created_at")?),
            updated_at: Stamp::from_bytes(&to_array::<12>(self.updated_at, "updated_at")?),
        })
    }
}

struct RawEntity {
    entity_id: Vec<u8>,
    collection: String,
    parent_id: Option<Vec<u8>>,
    payload: String,
    position: i64,
    created_at: Vec<u8>,
    updated_at: Vec<u8>,
}

fn raw_entity(row: &rusqlite::Row) -> rusqlite::Result<RawEntity> {
    Ok(RawEntity {
        entity_id: row.get(0)?,
        collection: row.get(1)?,
        parent_id: row.get(2)?,
        payload: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl RawEntity {
    fn into_record(self) -> Result<EntityRecord, StorageError> {
        let parent = match self.parent_id {
            Some(bytes) => Parent::Entity(EntityId::from_bytes(to_array::<16>(bytes, "parent_id")?)),
            None => Parent::Root,
        };
        Ok(EntityRecord {
            entity_id: EntityId::from_bytes(to_array::<16>(self.entity_id, "entity_id")?),
            kind: CollectionKind::parse(&self.collection)?,
            parent,
            payload: Payload::from_json_str(&self.payload)?,
            position: self.position,
            created_at: Stamp::from_bytes(&to_array::<12>(self.created_at, "created_at")?),
            updated_at: Stamp::from_bytes(&to_array::<12>(self.updated_at, "updated_at")?),
        })
    }
}

fn parent_bytes(parent: &Parent) -> Option<&[u8]> {
    match parent {
        Parent::Root => None,
        Parent::Entity(id) => Some(id.as_bytes().as_slice()),
    }
}

/// Compare a requested ordering against the current member set. Duplicates,
/// missing members and foreign members are all rejected.
fn check_same_members<T>(current: &HashSet<T>, requested: &[T], what: &str) -> Result<(), StorageError>
where
    T: std::hash::Hash + Eq + std::fmt::Debug,
{
    let requested_set: HashSet<&T> = requested.iter().collect();
    if requested_set.len() != requested.len() {
        return Err(StorageError::Validation(format!(
            "{what} order contains duplicate ids"
        )));
    }
    let missing = current.iter().filter(|id| !requested_set.contains(id)).count();
    let foreign = requested.iter().filter(|id| !current.contains(*id)).count();
    if missing > 0 || foreign > 0 {
        return Err(StorageError::Validation(format!(
            "{what} order does not match current members: {missing} missing, {foreign} foreign"
        )));
    }
    Ok(())
}

impl ContentStore for SqliteStorage {
    fn get_scope(&self, slug: &str) -> Result<Option<ScopeRecord>, StorageError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {SCOPE_COLUMNS} FROM scopes WHERE slug = ?1"),
                params![slug],
                raw_scope,
            )
            .optional()?;
        raw.map(RawScope::into_record).transpose()
    }

    fn upsert_scope(
        &mut self,
        slug: &str,
        title: &str,
    ) -> Result<(ScopeRecord, bool), StorageError> {
        let candidate = ScopeId::new();
        let stamp = self.clock.tick()?;
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let raw = self.conn.query_row(
            &format!(
                "INSERT INTO scopes (scope_id, slug, title, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(slug) DO UPDATE SET slug = excluded.slug
                 RETURNING {SCOPE_COLUMNS}"
            ),
            params![
                candidate.as_bytes().as_slice(),
                slug,
                title,
                &stamp.to_bytes()[..],
            ],
            raw_scope,
        )?;
        let record = raw.into_record()?;
        let created = record.scope_id == candidate;
        debug!(slug, created, "upsert scope");
        Ok((record, created))
    }

    fn get_section(
        &self,
        scope_id: ScopeId,
        section_key: &str,
    ) -> Result<Option<SectionRecord>, StorageError> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SECTION_COLUMNS} FROM sections WHERE scope_id = ?1 AND section_key = ?2"
                ),
                params![scope_id.as_bytes().as_slice(), section_key],
                raw_section,
            )
            .optional()?;
        raw.map(RawSection::into_record).transpose()
    }

    fn list_sections(&self, scope_id: ScopeId) -> Result<Vec<SectionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE scope_id = ?1
             ORDER BY order_index, created_at, section_id"
        ))?;
        let rows = stmt.query_map(params![scope_id.as_bytes().as_slice()], raw_section)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }

    fn put_section(
        &mut self,
        scope_id: ScopeId,
        section_key: &str,
        payload: &Payload,
        order_index: Option<i64>,
    ) -> Result<SectionRecord, StorageError> {
        let payload_json = payload.to_json_string()?;
        let stamp = self.clock.tick()?;
        let raw = self.conn.query_row(
            &format!(
                "INSERT INTO sections (section_id, scope_id, section_key, payload, order_index, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, COALESCE(?5, (SELECT COUNT(*) FROM sections WHERE scope_id = ?2)), ?6, ?6)
                 ON CONFLICT(scope_id, section_key) DO UPDATE SET
                     payload = excluded.payload,
                     order_index = COALESCE(?5, sections.order_index),
                     updated_at = excluded.updated_at
                 RETURNING {SECTION_COLUMNS}"
            ),
            params![
                SectionId::new().as_bytes().as_slice(),
                scope_id.as_bytes().as_slice(),
                section_key,
                payload_json,
                order_index,
                &stamp.to_bytes()[..],
            ],
            raw_section,
        )?;
        debug!(%scope_id, section_key, "put section");
        raw.into_record()
    }

    fn delete_section(
        &mut self,
        scope_id: ScopeId,
        section_key: &str,
    ) -> Result<bool, StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM sections WHERE scope_id = ?1 AND section_key = ?2",
            params![scope_id.as_bytes().as_slice(), section_key],
        )?;
        debug!(%scope_id, section_key, removed, "delete section");
        Ok(removed > 0)
    }

    fn set_section_order(
        &mut self,
        scope_id: ScopeId,
        section_keys: &[String],
    ) -> Result<(), StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT section_key FROM sections WHERE scope_id = ?1")?;
            let rows = stmt.query_map(params![scope_id.as_bytes().as_slice()], |row| {
                row.get::<_, String>(0)
            })?;
            rows.collect::<Result<_, _>>()?
        };
        check_same_members(&current, section_keys, "section")?;

        for (index, key) in section_keys.iter().enumerate() {
            tx.execute(
                "UPDATE sections SET order_index = ?1 WHERE scope_id = ?2 AND section_key = ?3",
                params![index as i64, scope_id.as_bytes().as_slice(), key],
            )?;
        }

        tx.commit()?;
        debug!(%scope_id, count = section_keys.len(), "set section order");
        Ok(())
    }
}

impl CollectionStore for SqliteStorage {
    fn list_items(&self, collection: CollectionRef) -> Result<Vec<EntityRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE collection = ?1 AND parent_id IS ?2
             ORDER BY position, created_at, entity_id"
        ))?;
        let rows = stmt.query_map(
            params![collection.kind.as_str(), parent_bytes(&collection.parent)],
            raw_entity,
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }

    fn get_item(&self, entity_id: EntityId) -> Result<Option<EntityRecord>, StorageError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE entity_id = ?1"),
                params![entity_id.as_bytes().as_slice()],
                raw_entity,
            )
            .optional()?;
        raw.map(RawEntity::into_record).transpose()
    }

    fn add_item(
        &mut self,
        collection: CollectionRef,
        payload: &Payload,
    ) -> Result<EntityRecord, StorageError> {
        collection.validate()?;
        let payload_json = payload.to_json_string()?;
        let stamp = self.clock.tick()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Parent::Entity(parent_id) = collection.parent {
            let parent_kind: Option<String> = tx
                .query_row(
                    "SELECT collection FROM entities WHERE entity_id = ?1",
                    params![parent_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            let parent_kind = match parent_kind {
                Some(kind) => CollectionKind::parse(&kind)?,
                None => return Err(StorageError::NotFound(format!("parent {parent_id}"))),
            };
            if Some(parent_kind) != collection.kind.parent_kind() {
                return Err(StorageError::Validation(format!(
                    "{} cannot own {} items",
                    parent_kind.as_str(),
                    collection.kind.as_str()
                )));
            }
        }

        let entity_id = EntityId::new();
        let raw = tx.query_row(
            &format!(
                "INSERT INTO entities (entity_id, collection, parent_id, payload, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4,
                     (SELECT COUNT(*) FROM entities WHERE collection = ?2 AND parent_id IS ?3),
                     ?5, ?5)
                 RETURNING {ENTITY_COLUMNS}"
            ),
            params![
                entity_id.as_bytes().as_slice(),
                collection.kind.as_str(),
                parent_bytes(&collection.parent),
                payload_json,
                &stamp.to_bytes()[..],
            ],
            raw_entity,
        )?;
        let record = raw.into_record()?;
        tx.commit()?;

        debug!(
            kind = collection.kind.as_str(),
            position = record.position,
            "add item"
        );
        Ok(record)
    }

    fn remove_item(&mut self, entity_id: EntityId) -> Result<bool, StorageError> {
        // Children (a case's images and videos) go with it via ON DELETE CASCADE.
        let removed = self.conn.execute(
            "DELETE FROM entities WHERE entity_id = ?1",
            params![entity_id.as_bytes().as_slice()],
        )?;
        debug!(%entity_id, removed, "remove item");
        Ok(removed > 0)
    }

    fn set_order(
        &mut self,
        collection: CollectionRef,
        ids: &[EntityId],
    ) -> Result<(), StorageError> {
        collection.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: HashSet<EntityId> = {
            let mut stmt = tx.prepare(
                "SELECT entity_id FROM entities WHERE collection = ?1 AND parent_id IS ?2",
            )?;
            let rows = stmt.query_map(
                params![collection.kind.as_str(), parent_bytes(&collection.parent)],
                |row| row.get::<_, Vec<u8>>(0),
            )?;
            let mut set = HashSet::new();
            for row in rows {
                set.insert(EntityId::from_bytes(to_array::<16>(row?, "entity_id")?));
            }
            set
        };
        check_same_members(&current, ids, collection.kind.as_str())?;

        for (index, id) in ids.iter().enumerate() {
            tx.execute(
                "UPDATE entities SET position = ?1 WHERE entity_id = ?2",
                params![index as i64, id.as_bytes().as_slice()],
            )?;
        }

        tx.commit()?;
        debug!(kind = collection.kind.as_str(), count = ids.len(), "set order");
        Ok(())
    }

    fn update_fields(
        &mut self,
        entity_id: EntityId,
        patch: &Payload,
    ) -> Result<EntityRecord, StorageError> {
        let patch_json = patch.to_json_string()?;
        let stamp = self.clock.tick()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = tx
            .query_row(
                &format!(
                    "UPDATE entities SET payload = json_patch(payload, ?1), updated_at = ?2
                     WHERE entity_id = ?3
                     RETURNING {ENTITY_COLUMNS}"
                ),
                params![
                    patch_json,
                    &stamp.to_bytes()[..],
                    entity_id.as_bytes().as_slice(),
                ],
                raw_entity,
            )
            .optional()?;
        let record = match raw {
            Some(raw) => raw.into_record()?,
            None => return Err(StorageError::NotFound(format!("entity {entity_id}"))),
        };
        // Dropping the transaction rolls the patch back.
        record.kind.validate_payload(&record.payload)?;
        tx.commit()?;

        debug!(%entity_id, fields = patch.len(), "update fields");
        Ok(record)
    }
}
