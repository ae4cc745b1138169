use sitecms_core::{
    collection::CollectionRef,
    ids::*,
    shapes::{CasePayload, ImagePayload, TeamMemberPayload, VideoPayload},
};
use sitecms_engine::{Engine, EngineConfig};
use sitecms_storage::{SqliteStorage, StorageError};
use tempfile::TempDir;

pub struct TestSite {
    pub engine: Engine,
    db_path: Option<String>,
    // Held so the database file outlives the engine.
    _dir: Option<TempDir>,
}

impl TestSite {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            engine: Engine::new(SqliteStorage::open_in_memory()?),
            db_path: None,
            _dir: None,
        })
    }

    /// A site backed by a database file in a fresh temp directory.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("content.db").to_string_lossy().into_owned();
        let config = EngineConfig {
            database_path: db_path.clone(),
            ..EngineConfig::in_memory()
        };
        Ok(Self {
            engine: Engine::open(&config)?,
            db_path: Some(db_path),
            _dir: Some(dir),
        })
    }

    /// A second, independent connection to the same database file.
    pub fn open_peer(&self) -> Result<SqliteStorage, Box<dyn std::error::Error>> {
        let path = self
            .db_path
            .as_deref()
            .ok_or("in-memory sites cannot be shared")?;
        Ok(SqliteStorage::open(path)?)
    }

    pub fn add_case(&mut self, title: &str) -> Result<ItemKey, Box<dyn std::error::Error>> {
        let record = self.engine.add_case(&CasePayload {
            title: title.to_string(),
            slug: None,
            summary: None,
            cover_url: None,
        })?;
        Ok(record.key())
    }

    pub fn add_image(
        &mut self,
        case: &ItemKey,
        url: &str,
    ) -> Result<ItemKey, Box<dyn std::error::Error>> {
        let record = self.engine.add_image(
            case.id(),
            &ImagePayload {
                url: url.to_string(),
                alt: None,
            },
        )?;
        Ok(record.key())
    }

    pub fn add_video(
        &mut self,
        case: &ItemKey,
        url: &str,
    ) -> Result<ItemKey, Box<dyn std::error::Error>> {
        let record = self
            .engine
            .add_video(case.id(), &VideoPayload::from_url(url, None))?;
        Ok(record.key())
    }

    pub fn add_member(&mut self, name: &str) -> Result<ItemKey, Box<dyn std::error::Error>> {
        let record = self.engine.add_team_member(&TeamMemberPayload {
            name: name.to_string(),
            role: None,
            photo_url: None,
            bio: None,
        })?;
        Ok(record.key())
    }

    /// Current order of a collection as stored.
    pub fn order(&self, collection: CollectionRef) -> Result<Vec<ItemKey>, Box<dyn std::error::Error>> {
        Ok(self.engine.item_keys(collection)?)
    }

    pub fn positions(&self, collection: CollectionRef) -> Result<Vec<i64>, Box<dyn std::error::Error>> {
        Ok(self
            .engine
            .list_items(collection)?
            .iter()
            .map(|r| r.position)
            .collect())
    }

    pub fn section_keys(&self, slug: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        Ok(self
            .engine
            .sections(slug)?
            .into_iter()
            .map(|s| s.section_key)
            .collect())
    }
}
