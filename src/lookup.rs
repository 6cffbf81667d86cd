//! "Already exists in storage" lookups.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::{ImportError, LookupError};
use crate::model::{RecordKey, TrackerDto, TrackerType, Uid};

/// Prior storage state, as seen by validators and the persistables filter.
/// Answers must stay consistent for one import attempt.
pub trait StorageLookup {
    fn exists(&self, tracker_type: TrackerType, uid: &Uid) -> Result<bool, LookupError>;

    fn exists_dto(&self, dto: &dyn TrackerDto) -> Result<bool, LookupError> {
        self.exists(dto.tracker_type(), dto.uid())
    }
}

/// Lookup into a fixed set of existing records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    existing: HashSet<RecordKey>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tracker_type: TrackerType, uid: impl Into<Uid>) {
        self.existing.insert(RecordKey::new(tracker_type, uid));
    }

    pub fn with(mut self, tracker_type: TrackerType, uid: impl Into<Uid>) -> Self {
        self.insert(tracker_type, uid);
        self
    }
}

impl StorageLookup for InMemoryStorage {
    fn exists(&self, tracker_type: TrackerType, uid: &Uid) -> Result<bool, LookupError> {
        Ok(self.existing.contains(&RecordKey::new(tracker_type, uid.clone())))
    }
}

/// Memoizes another lookup for the duration of one batch. Each key reaches
/// the inner lookup at most once; failures are not cached.
pub struct CachedLookup<'a> {
    inner: &'a dyn StorageLookup,
    cache: RefCell<HashMap<RecordKey, bool>>,
}

impl<'a> CachedLookup<'a> {
    pub fn new(inner: &'a dyn StorageLookup) -> Self {
        CachedLookup {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Like [`StorageLookup::exists`] but maps failures into [`ImportError`].
    pub fn check(&self, key: &RecordKey) -> Result<bool, ImportError> {
        self.exists(key.tracker_type, &key.uid)
            .map_err(|e| ImportError::lookup(key.tracker_type, &key.uid, e))
    }
}

impl StorageLookup for CachedLookup<'_> {
    fn exists(&self, tracker_type: TrackerType, uid: &Uid) -> Result<bool, LookupError> {
        let key = RecordKey::new(tracker_type, uid.clone());
        if let Some(&hit) = self.cache.borrow().get(&key) {
            return Ok(hit);
        }
        let exists = self.inner.exists(tracker_type, uid)?;
        self.cache.borrow_mut().insert(key, exists);
        Ok(exists)
    }
}
