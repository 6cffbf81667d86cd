//! The batch of records of one import attempt.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::*;
use crate::validate::InvalidRecords;

/// Records of one import attempt, grouped per kind in payload order.
///
/// Every record runs under the batch strategy unless the caller assigned it
/// its own via [`TrackerBundle::assign_strategy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerBundle {
    #[serde(default)]
    pub import_strategy: ImportStrategy,
    #[serde(default)]
    pub tracked_entities: Vec<TrackedEntity>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(skip)]
    assigned_strategies: HashMap<RecordKey, ImportStrategy>,
}

impl TrackerBundle {
    pub fn new(import_strategy: ImportStrategy) -> Self {
        TrackerBundle {
            import_strategy,
            ..Default::default()
        }
    }

    /// Override the strategy of a single record.
    pub fn assign_strategy(&mut self, key: RecordKey, strategy: ImportStrategy) {
        self.assigned_strategies.insert(key, strategy);
    }

    /// Effective strategy of a record: its own assignment or the batch default.
    pub fn strategy(&self, dto: &dyn TrackerDto) -> ImportStrategy {
        self.strategy_of(&dto.key())
    }

    pub fn strategy_of(&self, key: &RecordKey) -> ImportStrategy {
        self.assigned_strategies
            .get(key)
            .copied()
            .unwrap_or(self.import_strategy)
    }

    pub fn is_empty(&self) -> bool {
        self.tracked_entities.is_empty()
            && self.enrollments.is_empty()
            && self.events.is_empty()
            && self.relationships.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracked_entities.len()
            + self.enrollments.len()
            + self.events.len()
            + self.relationships.len()
    }

    /// Uids of one kind, in payload order.
    pub fn uids(&self, tracker_type: TrackerType) -> Vec<&Uid> {
        match tracker_type {
            TrackerType::TrackedEntity => self.tracked_entities.iter().map(TrackerDto::uid).collect(),
            TrackerType::Enrollment => self.enrollments.iter().map(TrackerDto::uid).collect(),
            TrackerType::Event => self.events.iter().map(TrackerDto::uid).collect(),
            TrackerType::Relationship => self.relationships.iter().map(TrackerDto::uid).collect(),
        }
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.uids(key.tracker_type).into_iter().any(|uid| *uid == key.uid)
    }

    /// A copy of this batch without the given records. Strategy assignments
    /// of the remaining records are kept.
    pub fn without(&self, invalid: &InvalidRecords) -> TrackerBundle {
        self.filtered(|dto| !invalid.contains(dto.tracker_type(), dto.uid()))
    }

    /// A copy of this batch holding only the records `keep` accepts, in
    /// payload order.
    pub fn filtered(&self, keep: impl Fn(&dyn TrackerDto) -> bool) -> TrackerBundle {
        TrackerBundle {
            import_strategy: self.import_strategy,
            tracked_entities: retain(&self.tracked_entities, &keep),
            enrollments: retain(&self.enrollments, &keep),
            events: retain(&self.events, &keep),
            relationships: retain(&self.relationships, &keep),
            assigned_strategies: self
                .assigned_strategies
                .iter()
                .filter(|(key, _)| keep(*key as &dyn TrackerDto))
                .map(|(key, strategy)| (key.clone(), *strategy))
                .collect(),
        }
    }
}

fn retain<T>(records: &[T], keep: &impl Fn(&dyn TrackerDto) -> bool) -> Vec<T>
where
    T: TrackerDto + Clone,
{
    records
        .iter()
        .filter(|r| keep(*r as &dyn TrackerDto))
        .cloned()
        .collect()
}
