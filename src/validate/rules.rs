//! Built-in structural validators.
//!
//! Domain checks (dates, attributes, access) are supplied by the caller; these
//! only guard identifiers and storage state, and are safe to put first.

use super::codes::ValidationCode;
use super::reporter::{MessageArg, Reporter};
use super::validator::{ValidationContext, Validator, Validators};
use crate::error::ImportError;
use crate::model::*;

/// E1048: uid must be 11 alphanumerics starting with a letter.
pub struct UidFormatValidator;

impl<T: TrackerDto> Validator<T> for UidFormatValidator {
    fn name(&self) -> &'static str {
        "uid_format"
    }

    fn validate(
        &self,
        reporter: &mut Reporter,
        _ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError> {
        reporter.add_error_if(
            || !record.uid().is_valid_format(),
            record,
            ValidationCode::E1048,
            &[record.tracker_type().name().into(), record.uid().into()],
        );
        Ok(())
    }

    fn needs_to_run(&self, _strategy: ImportStrategy) -> bool {
        true
    }

    fn skip_on_error(&self) -> bool {
        true
    }
}

/// Creating an existing record or updating/deleting a missing one.
/// CREATE_AND_UPDATE accepts both states.
pub struct ExistenceValidator;

impl ExistenceValidator {
    fn codes(tracker_type: TrackerType) -> (ValidationCode, ValidationCode) {
        match tracker_type {
            TrackerType::TrackedEntity => (ValidationCode::E1002, ValidationCode::E1063),
            TrackerType::Enrollment => (ValidationCode::E1080, ValidationCode::E1081),
            TrackerType::Event => (ValidationCode::E1030, ValidationCode::E1032),
            TrackerType::Relationship => (ValidationCode::E4015, ValidationCode::E4016),
        }
    }
}

impl<T: TrackerDto> Validator<T> for ExistenceValidator {
    fn name(&self) -> &'static str {
        "existence"
    }

    fn validate(
        &self,
        reporter: &mut Reporter,
        ctx: &ValidationContext<'_>,
        record: &T,
    ) -> Result<(), ImportError> {
        let strategy = ctx.strategy(record);
        if strategy == ImportStrategy::CreateAndUpdate {
            return Ok(());
        }

        let exists = ctx.exists(record)?;
        let (already_exists, not_found) = Self::codes(record.tracker_type());
        let args: [MessageArg; 1] = [record.uid().into()];
        if strategy.is_create() && exists {
            reporter.add_error(record, already_exists, &args);
        } else if !strategy.is_create() && !exists {
            reporter.add_error(record, not_found, &args);
        }
        Ok(())
    }

    fn needs_to_run(&self, _strategy: ImportStrategy) -> bool {
        true
    }

    fn skip_on_error(&self) -> bool {
        true
    }
}

/// E4000: both ends of a relationship name the same record.
pub struct RelationshipLinksValidator;

impl Validator<Relationship> for RelationshipLinksValidator {
    fn name(&self) -> &'static str {
        "relationship_links"
    }

    fn validate(
        &self,
        reporter: &mut Reporter,
        _ctx: &ValidationContext<'_>,
        relationship: &Relationship,
    ) -> Result<(), ImportError> {
        let from = relationship.from.key();
        reporter.add_error_if(
            || from.is_some() && from == relationship.to.key(),
            relationship,
            ValidationCode::E4000,
            &[relationship.uid().into()],
        );
        Ok(())
    }
}

impl Validators {
    /// Uid format, then storage state, for every kind; relationships also
    /// reject self links.
    pub fn structural() -> Self {
        Validators::new()
            .tracked_entity(UidFormatValidator)
            .tracked_entity(ExistenceValidator)
            .enrollment(UidFormatValidator)
            .enrollment(ExistenceValidator)
            .event(UidFormatValidator)
            .event(ExistenceValidator)
            .relationship(UidFormatValidator)
            .relationship(ExistenceValidator)
            .relationship(RelationshipLinksValidator)
    }
}
