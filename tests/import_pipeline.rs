//! End-to-end: batch JSON → structure check → validation → persistables.

#[allow(dead_code)]
mod helpers;

use helpers::*;
use tracker_import::error::ImportError;
use tracker_import::import::{self, ImportReport, TypeStats};
use tracker_import::lookup::InMemoryStorage;
use tracker_import::model::*;
use tracker_import::params::{AtomicMode, TrackerImportParams, ValidationMode};
use tracker_import::validate::{ValidationCode, Validators};

fn family_batch() -> TrackerBundle {
    let json = include_str!("fixtures/family_batch.json");
    serde_json::from_str(json).expect("fixture should parse")
}

fn run(params: &TrackerImportParams, bundle: &TrackerBundle) -> Result<ImportReport, ImportError> {
    init_tracing();
    import::run(params, bundle, &Validators::structural(), &InMemoryStorage::new())
}

fn object_mode() -> TrackerImportParams {
    TrackerImportParams {
        atomic_mode: AtomicMode::Object,
        ..Default::default()
    }
}

#[test]
fn fixture_parses_into_a_batch() {
    let bundle = family_batch();

    assert_eq!(bundle.import_strategy, ImportStrategy::CreateAndUpdate);
    assert_eq!(bundle.len(), 5);
    assert_eq!(bundle.events[0].program_stage.as_deref(), Some("A03MvHHogjR"));
    assert_eq!(
        bundle.relationships[0].to.key(),
        Some(RecordKey::new(TrackerType::Event, "Qck4PQ7TMun"))
    );
}

#[test]
fn object_mode_persists_every_valid_record() {
    let bundle = family_batch();

    let report = run(&object_mode(), &bundle).unwrap();

    assert_eq!(codes(&report.validation.errors), vec![ValidationCode::E1048]);
    assert_persistable(&report.persistables, TrackerType::TrackedEntity, &["xK7H53f4Hc2"]);
    assert_persistable(&report.persistables, TrackerType::Enrollment, &["t1zaUjKgT3p"]);
    assert_persistable(&report.persistables, TrackerType::Event, &["Qck4PQ7TMun"]);
    assert_persistable(&report.persistables, TrackerType::Relationship, &["Te3IC6TpnBB"]);
    assert_eq!(report.objects.len(), 4);
    assert_eq!(report.objects.events[0].event, Uid::new("Qck4PQ7TMun"));
    assert_eq!(
        report.stats[&TrackerType::Event],
        TypeStats {
            persistable: 1,
            ignored: 1,
        }
    );

    let stats = serde_json::to_value(&report.stats).unwrap();
    insta::with_settings!({ sort_maps => true }, {
        insta::assert_json_snapshot!(stats, @r###"
        {
          "ENROLLMENT": {
            "ignored": 0,
            "persistable": 1
          },
          "EVENT": {
            "ignored": 1,
            "persistable": 1
          },
          "RELATIONSHIP": {
            "ignored": 0,
            "persistable": 1
          },
          "TRACKED_ENTITY": {
            "ignored": 0,
            "persistable": 1
          }
        }
        "###);
    });
}

#[test]
fn atomic_mode_persists_nothing_when_anything_is_invalid() {
    let bundle = family_batch();

    let report = run(&TrackerImportParams::default(), &bundle).unwrap();

    assert!(report.validation.has_errors());
    assert!(report.persistables.is_empty());
    assert!(report.persistables.errors.is_empty());
    assert!(report.objects.is_empty());
    assert!(report.stats.values().all(|s| s.persistable == 0));
    assert_eq!(report.stats.values().map(|s| s.ignored).sum::<usize>(), 5);
}

#[test]
fn atomic_mode_persists_everything_when_valid() {
    let mut bundle = family_batch();
    bundle.events.retain(|e| e.event.is_valid_format());

    let report = run(&TrackerImportParams::default(), &bundle).unwrap();

    assert!(report.validation.is_empty());
    assert_eq!(report.persistables.len(), 4);
    assert_eq!(report.objects, bundle);
}

#[test]
fn resolver_errors_follow_validation_errors() {
    let mut bundle = family_batch();
    bundle.tracked_entities[0].tracked_entity = Uid::new("bad-te-uid");
    bundle.enrollments[0].tracked_entity = Uid::new("bad-te-uid");
    bundle.relationships[0].from = RelationshipItem::tracked_entity("bad-te-uid");

    let report = run(&object_mode(), &bundle).unwrap();

    assert_eq!(
        codes(&report.validation.errors),
        vec![
            ValidationCode::E1048,
            ValidationCode::E1048,
            ValidationCode::E5000,
            ValidationCode::E5000,
            ValidationCode::E5000,
        ]
    );
    assert!(report.persistables.is_empty());
}

#[test]
fn skip_mode_persists_even_malformed_uids() {
    let params = TrackerImportParams {
        validation_mode: ValidationMode::Skip,
        ..Default::default()
    };

    let report = run(&params, &family_batch()).unwrap();

    assert!(report.validation.is_empty());
    assert_eq!(report.persistables.len(), 5);
}

#[test]
fn delete_of_missing_child_keeps_its_ancestors() {
    let mut bundle = family_batch();
    bundle.import_strategy = ImportStrategy::Delete;
    bundle.events.truncate(1);
    bundle.relationships.clear();
    let storage = InMemoryStorage::new()
        .with(TrackerType::TrackedEntity, "xK7H53f4Hc2")
        .with(TrackerType::Enrollment, "t1zaUjKgT3p");

    let report = import::run(&object_mode(), &bundle, &Validators::structural(), &storage).unwrap();

    assert_has_error(
        &report.validation.errors,
        TrackerType::Event,
        "Qck4PQ7TMun",
        ValidationCode::E1032,
        "not found",
    );
    assert_has_error(
        &report.validation.errors,
        TrackerType::Enrollment,
        "t1zaUjKgT3p",
        ValidationCode::E5001,
        "\"event\" `Qck4PQ7TMun`",
    );
    assert_persistable(&report.persistables, TrackerType::Enrollment, &[]);
    assert_persistable(&report.persistables, TrackerType::TrackedEntity, &[]);
}

#[test]
fn malformed_batch_is_rejected_before_validation() {
    let mut bundle = family_batch();
    bundle.enrollments.clear();
    let log = call_log();
    let validators = Validators::new().event(Reject::new("reject", &[], &log));

    let err = import::run(&object_mode(), &bundle, &validators, &InMemoryStorage::new()).unwrap_err();

    assert_eq!(err.malformed_code(), Some("M003"));
    assert!(log.borrow().is_empty());
}

#[test]
fn conflicting_relationships_are_rejected_in_every_atomic_mode() {
    let setup = SetupBuilder::new()
        .tracked_entity("xK7H53f4Hc2")
        .tracked_entity("QxGbKYwChDM")
        .relationship("Te3IC6TpnBB", te("xK7H53f4Hc2"), te("QxGbKYwChDM"))
        .relationship("Ab3IC6TpnBB", te("xK7H53f4Hc2"), te("QxGbKYwChDM"))
        .build(ImportStrategy::CreateAndUpdate);
    let log = call_log();
    let validators = Validators::new().relationship(Reject::new("reject", &["Te3IC6TpnBB"], &log));

    for params in [TrackerImportParams::default(), object_mode()] {
        let err = import::run(&params, &setup.bundle, &validators, &setup.storage).unwrap_err();

        assert_eq!(err.malformed_code(), Some("M006"), "atomic mode {:?}", params.atomic_mode);
    }
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn agreeing_duplicate_relationships_are_accepted() {
    let setup = SetupBuilder::new()
        .tracked_entity("xK7H53f4Hc2")
        .tracked_entity("QxGbKYwChDM")
        .relationship("Te3IC6TpnBB", te("xK7H53f4Hc2"), te("QxGbKYwChDM"))
        .relationship("Ab3IC6TpnBB", te("xK7H53f4Hc2"), te("QxGbKYwChDM"))
        .build(ImportStrategy::CreateAndUpdate);

    let report = import::run(
        &TrackerImportParams::default(),
        &setup.bundle,
        &Validators::structural(),
        &setup.storage,
    )
    .unwrap();

    assert!(report.validation.is_empty());
    assert_persistable(
        &report.persistables,
        TrackerType::Relationship,
        &["Te3IC6TpnBB", "Ab3IC6TpnBB"],
    );
}

#[test]
fn storage_is_asked_once_per_record() {
    let mut bundle = family_batch();
    bundle.import_strategy = ImportStrategy::Update;
    let storage = CountingStorage::new(
        InMemoryStorage::new()
            .with(TrackerType::TrackedEntity, "xK7H53f4Hc2")
            .with(TrackerType::Enrollment, "t1zaUjKgT3p")
            .with(TrackerType::Event, "Qck4PQ7TMun")
            .with(TrackerType::Relationship, "Te3IC6TpnBB"),
    );

    let report = import::run(&object_mode(), &bundle, &Validators::structural(), &storage).unwrap();

    assert_eq!(codes(&report.validation.errors), vec![ValidationCode::E1048]);
    assert_eq!(storage.calls(), 4);
}

#[test]
fn report_serializes_findings_and_objects() {
    let mut bundle = family_batch();
    bundle.events.retain(|e| e.event.is_valid_format());

    let report = run(&object_mode(), &bundle).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["validation"]["errors"], serde_json::json!([]));
    assert_eq!(json["objects"]["importStrategy"], "CREATE_AND_UPDATE");
    assert_eq!(json["objects"]["trackedEntities"][0]["trackedEntity"], "xK7H53f4Hc2");
    assert_eq!(json["objects"]["relationships"][0]["to"], serde_json::json!({ "event": "Qck4PQ7TMun" }));
    assert_eq!(json["stats"]["EVENT"]["persistable"], 1);
}
