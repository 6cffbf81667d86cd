use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracker_import::error::{ImportError, LookupError};
use tracker_import::lookup::{CachedLookup, InMemoryStorage, StorageLookup};
use tracker_import::model::*;
use tracker_import::params::IdSchemes;
use tracker_import::persistables::{self, Persistables};
use tracker_import::validate::*;

// =============================================================================
// Batch builder
// =============================================================================

/// A batch plus the validity and storage state the filter sees.
pub struct Setup {
    pub bundle: TrackerBundle,
    pub invalid: InvalidRecords,
    pub storage: InMemoryStorage,
}

/// Builds a [`Setup`] record by record. Every record starts valid, in the
/// payload and not in storage; `is_not_valid`, `is_in_db` and
/// `is_not_in_payload` change the record added last.
///
/// Enrollments attach to the tracked entity added last, events to the
/// enrollment added last.
#[derive(Default)]
pub struct SetupBuilder {
    bundle: TrackerBundle,
    invalid: InvalidRecords,
    storage: InMemoryStorage,
    not_in_payload: HashSet<RecordKey>,
    current: Option<RecordKey>,
    current_tracked_entity: Option<Uid>,
    current_enrollment: Option<Uid>,
}

impl SetupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_entity(mut self, uid: &str) -> Self {
        self.bundle.tracked_entities.push(TrackedEntity::new(uid));
        self.current = Some(RecordKey::new(TrackerType::TrackedEntity, uid));
        self.current_tracked_entity = Some(Uid::new(uid));
        self
    }

    pub fn enrollment(mut self, uid: &str) -> Self {
        let parent = self
            .current_tracked_entity
            .clone()
            .expect("enrollment needs a tracked entity first");
        self.bundle.enrollments.push(Enrollment::new(uid, parent));
        self.current = Some(RecordKey::new(TrackerType::Enrollment, uid));
        self.current_enrollment = Some(Uid::new(uid));
        self
    }

    pub fn event(mut self, uid: &str) -> Self {
        let parent = self
            .current_enrollment
            .clone()
            .expect("event needs an enrollment first");
        self.bundle.events.push(Event::new(uid, parent));
        self.current = Some(RecordKey::new(TrackerType::Event, uid));
        self
    }

    pub fn event_without_registration(mut self, uid: &str) -> Self {
        self.bundle.events.push(Event::without_registration(uid));
        self.current = Some(RecordKey::new(TrackerType::Event, uid));
        self
    }

    pub fn relationship(mut self, uid: &str, from: RelationshipItem, to: RelationshipItem) -> Self {
        self.bundle.relationships.push(Relationship::new(uid, from, to));
        self.current = Some(RecordKey::new(TrackerType::Relationship, uid));
        self
    }

    pub fn is_not_valid(mut self) -> Self {
        let key = self.current_key();
        self.invalid.insert(key.tracker_type, key.uid);
        self
    }

    pub fn is_in_db(mut self) -> Self {
        let key = self.current_key();
        self.storage.insert(key.tracker_type, key.uid);
        self
    }

    pub fn is_not_in_payload(mut self) -> Self {
        let key = self.current_key();
        self.not_in_payload.insert(key);
        self
    }

    pub fn build(self, strategy: ImportStrategy) -> Setup {
        let not_in_payload = self.not_in_payload;
        let mut bundle = self.bundle.filtered(|dto| !not_in_payload.contains(&dto.key()));
        bundle.import_strategy = strategy;
        Setup {
            bundle,
            invalid: self.invalid,
            storage: self.storage,
        }
    }

    fn current_key(&self) -> RecordKey {
        self.current.clone().expect("add a record first")
    }
}

pub fn te(uid: &str) -> RelationshipItem {
    RelationshipItem::tracked_entity(uid)
}

pub fn enr(uid: &str) -> RelationshipItem {
    RelationshipItem::enrollment(uid)
}

pub fn ev(uid: &str) -> RelationshipItem {
    RelationshipItem::event(uid)
}

/// Build the graph of `setup` and run the persistables filter on it.
pub fn filter(setup: &Setup) -> Persistables {
    let lookup = CachedLookup::new(&setup.storage);
    let graph = RecordGraph::build(&setup.bundle, &lookup).expect("batch should be well formed");
    persistables::filter(
        &graph,
        &setup.invalid,
        setup.bundle.import_strategy,
        &lookup,
        &IdSchemes::default(),
    )
    .expect("filter should not fail")
}

// =============================================================================
// Assertions
// =============================================================================

/// Persistable uids of one kind, exactly and in payload order.
pub fn assert_persistable(persistables: &Persistables, tracker_type: TrackerType, expected: &[&str]) {
    let actual: Vec<&str> = persistables.get(tracker_type).iter().map(Uid::as_str).collect();
    assert_eq!(
        actual, expected,
        "persistable {} mismatch, errors: {:?}",
        tracker_type, persistables.errors
    );
}

pub fn assert_has_error(
    findings: &[Finding],
    tracker_type: TrackerType,
    uid: &str,
    code: ValidationCode,
    message_contains: &str,
) {
    assert!(
        findings.iter().any(|f| f.tracker_type == tracker_type
            && f.uid.as_str() == uid
            && f.code == code
            && f.message.contains(message_contains)),
        "expected {} on {} `{}` containing {:?}, got: {:?}",
        code,
        tracker_type,
        uid,
        message_contains,
        findings
    );
}

pub fn codes(findings: &[Finding]) -> Vec<ValidationCode> {
    findings.iter().map(|f| f.code).collect()
}

// =============================================================================
// Validators
// =============================================================================

/// Shared log of `validator:uid` calls.
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Reports `code` as an error for the listed uids and logs every call.
pub struct Reject {
    pub name: &'static str,
    pub code: ValidationCode,
    pub uids: Vec<&'static str>,
    pub skip_on_error: bool,
    pub runs_on_delete: bool,
    pub log: CallLog,
}

impl Reject {
    pub fn new(name: &'static str, uids: &[&'static str], log: &CallLog) -> Self {
        Reject {
            name,
            code: ValidationCode::E1121,
            uids: uids.to_vec(),
            skip_on_error: false,
            runs_on_delete: false,
            log: Rc::clone(log),
        }
    }

    pub fn skipping_on_error(mut self) -> Self {
        self.skip_on_error = true;
        self
    }

    pub fn running_on_delete(mut self) -> Self {
        self.runs_on_delete = true;
        self
    }
}

impl<T: TrackerDto> Validator<T> for Reject {
    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(
        &self,
        reporter: &mut Reporter,
        _ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, record.uid()));
        reporter.add_error_if(
            || self.uids.iter().any(|uid| *uid == record.uid().as_str()),
            record,
            self.code,
            &[record.tracker_type().name().into(), self.name.into()],
        );
        Ok(())
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        self.runs_on_delete || !strategy.is_delete()
    }

    fn skip_on_error(&self) -> bool {
        self.skip_on_error
    }
}

/// Reports a warning for every record.
pub struct WarnAll;

impl<T: TrackerDto> Validator<T> for WarnAll {
    fn name(&self) -> &'static str {
        "warn_all"
    }

    fn validate(
        &self,
        reporter: &mut Reporter,
        _ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError> {
        reporter.add_warning(record, ValidationCode::E1121, &["record".into(), "note".into()]);
        Ok(())
    }
}

/// Fails unexpectedly on every record.
pub struct Faulty;

impl<T: TrackerDto> Validator<T> for Faulty {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn validate(
        &self,
        _reporter: &mut Reporter,
        _ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError> {
        Err(ImportError::validator("faulty", record.key(), "metadata cache unavailable"))
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Counts calls into an inner storage.
pub struct CountingStorage {
    pub inner: InMemoryStorage,
    pub calls: RefCell<usize>,
}

impl CountingStorage {
    pub fn new(inner: InMemoryStorage) -> Self {
        CountingStorage {
            inner,
            calls: RefCell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl StorageLookup for CountingStorage {
    fn exists(&self, tracker_type: TrackerType, uid: &Uid) -> Result<bool, LookupError> {
        *self.calls.borrow_mut() += 1;
        self.inner.exists(tracker_type, uid)
    }
}

/// Always fails.
pub struct BrokenStorage;

impl StorageLookup for BrokenStorage {
    fn exists(&self, _tracker_type: TrackerType, _uid: &Uid) -> Result<bool, LookupError> {
        Err("connection refused".into())
    }
}

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
