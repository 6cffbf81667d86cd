//! Validator contract and the per-kind registry.

use super::reporter::Reporter;
use crate::error::ImportError;
use crate::lookup::CachedLookup;
use crate::model::*;
use crate::params::IdSchemes;

/// Read-only state a validator may consult.
pub struct ValidationContext<'a> {
    pub bundle: &'a TrackerBundle,
    pub lookup: &'a CachedLookup<'a>,
    pub id_schemes: &'a IdSchemes,
}

impl ValidationContext<'_> {
    pub fn exists(&self, dto: &dyn TrackerDto) -> Result<bool, ImportError> {
        self.lookup.check(&dto.key())
    }

    pub fn strategy(&self, dto: &dyn TrackerDto) -> ImportStrategy {
        self.bundle.strategy(dto)
    }
}

/// A single check against one record kind.
///
/// Validators report through the [`Reporter`] only. An `Err` is reserved for
/// unexpected failures and aborts the import attempt.
pub trait Validator<T: TrackerDto> {
    /// Name used in logs and fault messages.
    fn name(&self) -> &'static str;

    fn validate(
        &self,
        reporter: &mut Reporter,
        ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError>;

    /// Records assigned the delete strategy are exempt unless a validator
    /// opts in.
    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        !strategy.is_delete()
    }

    /// When an error is reported for a record, skip the remaining
    /// validators for that record.
    fn skip_on_error(&self) -> bool {
        false
    }
}

pub type BoxedValidator<T> = Box<dyn Validator<T>>;

/// Ordered validators per record kind. Order is part of the contract: later
/// validators may rely on earlier ones having rejected malformed records.
#[derive(Default)]
pub struct Validators {
    pub tracked_entity: Vec<BoxedValidator<TrackedEntity>>,
    pub enrollment: Vec<BoxedValidator<Enrollment>>,
    pub event: Vec<BoxedValidator<Event>>,
    pub relationship: Vec<BoxedValidator<Relationship>>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_entity(mut self, validator: impl Validator<TrackedEntity> + 'static) -> Self {
        self.tracked_entity.push(Box::new(validator));
        self
    }

    pub fn enrollment(mut self, validator: impl Validator<Enrollment> + 'static) -> Self {
        self.enrollment.push(Box::new(validator));
        self
    }

    pub fn event(mut self, validator: impl Validator<Event> + 'static) -> Self {
        self.event.push(Box::new(validator));
        self
    }

    pub fn relationship(mut self, validator: impl Validator<Relationship> + 'static) -> Self {
        self.relationship.push(Box::new(validator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tracked_entity.is_empty()
            && self.enrollment.is_empty()
            && self.event.is_empty()
            && self.relationship.is_empty()
    }
}
