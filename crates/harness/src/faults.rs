use sitecms_engine::{Engine, EngineError, OrderBackend, OrderTarget};
use sitecms_storage::StorageError;

/// A store error the engine classifies as transient.
pub fn busy_error() -> EngineError {
    EngineError::Storage(StorageError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        None,
    )))
}

/// Wraps an engine and fails the next `fail_persists` writes or
/// `fail_fetches` reads with a busy error.
pub struct FlakyBackend<'a> {
    pub engine: &'a mut Engine,
    pub fail_persists: usize,
    pub fail_fetches: usize,
    pub persist_calls: usize,
    pub fetch_calls: usize,
}

impl<'a> FlakyBackend<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self {
            engine,
            fail_persists: 0,
            fail_fetches: 0,
            persist_calls: 0,
            fetch_calls: 0,
        }
    }

    pub fn failing_persists(mut self, n: usize) -> Self {
        self.fail_persists = n;
        self
    }

    pub fn failing_fetches(mut self, n: usize) -> Self {
        self.fail_fetches = n;
        self
    }
}

impl<T> OrderBackend<T> for FlakyBackend<'_>
where
    T: OrderTarget,
    Engine: OrderBackend<T, Error = EngineError>,
{
    type Error = EngineError;

    fn fetch_order(&mut self, target: &T) -> Result<Vec<T::Key>, EngineError> {
        self.fetch_calls += 1;
        if self.fail_fetches > 0 {
            self.fail_fetches -= 1;
            return Err(busy_error());
        }
        OrderBackend::<T>::fetch_order(&mut *self.engine, target)
    }

    fn persist_order(&mut self, target: &T, order: &[T::Key]) -> Result<(), EngineError> {
        self.persist_calls += 1;
        if self.fail_persists > 0 {
            self.fail_persists -= 1;
            return Err(busy_error());
        }
        OrderBackend::<T>::persist_order(&mut *self.engine, target, order)
    }
}
