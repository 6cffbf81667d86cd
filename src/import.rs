//! Full pipeline: structure check → validation → relationship agreement →
//! persistables filter.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::error::ImportError;
use crate::lookup::{CachedLookup, StorageLookup};
use crate::model::*;
use crate::params::{AtomicMode, TrackerImportParams};
use crate::persistables::{self, Persistables};
use crate::validate::{self, ValidationContext, ValidationResult, Validators};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStats {
    pub persistable: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Validation findings followed by persistables filter errors.
    pub validation: ValidationResult,
    pub persistables: Persistables,
    /// The records to hand to persistence, kinds in hierarchy order.
    pub objects: TrackerBundle,
    pub stats: BTreeMap<TrackerType, TypeStats>,
}

/// Decide validity and persistability for one batch.
///
/// Storage lookups are cached for the duration of the call. Nothing is
/// persisted here.
pub fn run(
    params: &TrackerImportParams,
    bundle: &TrackerBundle,
    validators: &Validators,
    lookup: &dyn StorageLookup,
) -> Result<ImportReport, ImportError> {
    let lookup = CachedLookup::new(lookup);

    // 1. Structure
    let graph = RecordGraph::build(bundle, &lookup)?;

    // 2. Validation
    let ctx = ValidationContext {
        bundle,
        lookup: &lookup,
        id_schemes: &params.id_schemes,
    };
    let outcome = validate::validate(&ctx, validators, params.validation_mode)?;
    persistables::reject_conflicting_relationships(&graph, &outcome.invalid)?;

    // 3. Persistables
    let persistables = if params.atomic_mode == AtomicMode::All && outcome.result.has_errors() {
        info!(
            errors = outcome.result.errors.len(),
            "atomic import has validation errors, nothing is persisted"
        );
        Persistables::default()
    } else {
        persistables::filter(
            &graph,
            &outcome.invalid,
            bundle.import_strategy,
            &lookup,
            &params.id_schemes,
        )?
    };

    let objects = outcome
        .bundle
        .filtered(|dto| persistables.contains(dto.tracker_type(), dto.uid()));
    let stats = TrackerType::ALL
        .into_iter()
        .map(|tracker_type| {
            let total = bundle.uids(tracker_type).len();
            let persistable = persistables.get(tracker_type).len();
            (
                tracker_type,
                TypeStats {
                    persistable,
                    ignored: total - persistable,
                },
            )
        })
        .collect();

    let mut validation = outcome.result;
    validation.errors.extend(persistables.errors.iter().cloned());

    Ok(ImportReport {
        validation,
        persistables,
        objects,
        stats,
    })
}
