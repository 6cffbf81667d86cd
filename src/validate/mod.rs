//! Validation phase: runs the ordered validators over the batch.
//!
//! Records are visited kind by kind in hierarchy order, each record through
//! its kind's validators in registry order. A record's parent having errors
//! never short-circuits the record itself; persistability is decided later by
//! the persistables filter.

pub mod codes;
pub mod reporter;
pub mod rules;
pub mod validator;

use std::ops::ControlFlow;

use tracing::{debug, info, trace, warn};

pub use codes::ValidationCode;
pub use reporter::{Finding, InvalidRecords, MessageArg, MetadataRef, Reporter, ValidationResult};
pub use rules::{ExistenceValidator, RelationshipLinksValidator, UidFormatValidator};
pub use validator::{BoxedValidator, ValidationContext, Validator, Validators};

use crate::error::ImportError;
use crate::model::{TrackerBundle, TrackerDto};
use crate::params::ValidationMode;

/// Output of a validation run.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub result: ValidationResult,
    /// Records with at least one error, as reported. Handed to the
    /// persistables filter unchanged.
    pub invalid: InvalidRecords,
    /// The batch without the invalid records.
    pub bundle: TrackerBundle,
}

/// Validate the batch in `ctx` with the given mode.
///
/// The input batch is left untouched; the pruned copy is returned in the
/// outcome. In fail-fast mode only records found invalid before the abort
/// are pruned.
pub fn validate(
    ctx: &ValidationContext<'_>,
    validators: &Validators,
    mode: ValidationMode,
) -> Result<ValidationOutcome, ImportError> {
    if mode == ValidationMode::Skip {
        debug!(records = ctx.bundle.len(), "validation skipped");
        return Ok(ValidationOutcome {
            result: ValidationResult::default(),
            invalid: InvalidRecords::new(),
            bundle: ctx.bundle.clone(),
        });
    }

    let mut reporter = Reporter::new(ctx.id_schemes.clone());
    let fail_fast = mode == ValidationMode::FailFast;

    if run_all(&mut reporter, ctx, validators, fail_fast)?.is_break() {
        warn!(
            errors = reporter.errors().len(),
            "fail-fast validation aborted at first error"
        );
    }

    let invalid = reporter.invalid_records();
    let bundle = ctx.bundle.without(&invalid);
    let result = reporter.into_result();

    info!(
        records = ctx.bundle.len(),
        invalid = invalid.len(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "validation finished"
    );

    Ok(ValidationOutcome {
        result,
        invalid,
        bundle,
    })
}

fn run_all(
    reporter: &mut Reporter,
    ctx: &ValidationContext<'_>,
    validators: &Validators,
    fail_fast: bool,
) -> Result<ControlFlow<()>, ImportError> {
    let bundle = ctx.bundle;

    if run_kind(reporter, ctx, &bundle.tracked_entities, &validators.tracked_entity, fail_fast)?.is_break() {
        return Ok(ControlFlow::Break(()));
    }
    if run_kind(reporter, ctx, &bundle.enrollments, &validators.enrollment, fail_fast)?.is_break() {
        return Ok(ControlFlow::Break(()));
    }
    if run_kind(reporter, ctx, &bundle.events, &validators.event, fail_fast)?.is_break() {
        return Ok(ControlFlow::Break(()));
    }
    run_kind(reporter, ctx, &bundle.relationships, &validators.relationship, fail_fast)
}

fn run_kind<T: TrackerDto>(
    reporter: &mut Reporter,
    ctx: &ValidationContext<'_>,
    records: &[T],
    validators: &[BoxedValidator<T>],
    fail_fast: bool,
) -> Result<ControlFlow<()>, ImportError> {
    for record in records {
        if validate_record(reporter, ctx, record, validators, fail_fast)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

/// Run one record through its validators. `Break` means fail-fast observed
/// an error and the whole run must stop.
fn validate_record<T: TrackerDto>(
    reporter: &mut Reporter,
    ctx: &ValidationContext<'_>,
    record: &T,
    validators: &[BoxedValidator<T>],
    fail_fast: bool,
) -> Result<ControlFlow<()>, ImportError> {
    let strategy = ctx.strategy(record);

    for validator in validators {
        if !validator.needs_to_run(strategy) {
            trace!(
                validator = validator.name(),
                tracker_type = %record.tracker_type(),
                uid = %record.uid(),
                ?strategy,
                "validator does not apply"
            );
            continue;
        }

        let errors_before = reporter.errors().len();
        let record_errors_before = reporter.error_count(record);

        validator.validate(reporter, ctx, record)?;

        if fail_fast && reporter.errors().len() > errors_before {
            return Ok(ControlFlow::Break(()));
        }
        if validator.skip_on_error() && reporter.error_count(record) > record_errors_before {
            debug!(
                validator = validator.name(),
                tracker_type = %record.tracker_type(),
                uid = %record.uid(),
                "skipping remaining validators for record"
            );
            break;
        }
    }

    Ok(ControlFlow::Continue(()))
}
