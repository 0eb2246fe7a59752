use super::{Database, RecordStore, StoreLocation};
use crate::errors::{AppError, AppResult};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Lazily opened record store. The first successful `open` is cached for the
/// life of the handle; failed opens are retried on the next call.
pub struct StoreHandle {
    location: Option<StoreLocation>,
    store: OnceCell<Arc<dyn RecordStore>>,
}

impl StoreHandle {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location: Some(location),
            store: OnceCell::new(),
        }
    }

    /// Wraps an already open store.
    pub fn from_store(store: Arc<dyn RecordStore>) -> Self {
        Self {
            location: None,
            store: OnceCell::with_value(store),
        }
    }

    pub fn open(&self) -> AppResult<Arc<dyn RecordStore>> {
        self.store
            .get_or_try_init(|| {
                let location = self
                    .location
                    .as_ref()
                    .ok_or_else(|| AppError::StoreUnavailable("no store location configured".to_string()))?;
                let database = Database::open(location)?;
                Ok::<_, AppError>(Arc::new(database) as Arc<dyn RecordStore>)
            })
            .cloned()
    }

    pub fn is_open(&self) -> bool {
        self.store.get().is_some()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("location", &self.location)
            .field("open", &self.is_open())
            .finish()
    }
}
