//! Record types of a tracker import.
//!
//! Four record kinds form the batch: tracked entities own enrollments,
//! enrollments own events, and relationships reference any two records of the
//! other three kinds. Parent links are stored on the child as the parent's uid.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque record identifier, unique within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub const LENGTH: usize = 11;

    pub fn new(value: impl Into<String>) -> Self {
        Uid(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 11 ASCII alphanumerics, the first one a letter.
    pub fn is_valid_format(&self) -> bool {
        let bytes = self.0.as_bytes();
        bytes.len() == Self::LENGTH
            && bytes[0].is_ascii_alphabetic()
            && bytes.iter().all(u8::is_ascii_alphanumeric)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Uid::new(value)
    }
}

/// The closed set of record kinds, in hierarchy (persistence) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerType {
    TrackedEntity,
    Enrollment,
    Event,
    Relationship,
}

impl TrackerType {
    pub const ALL: [TrackerType; 4] = [
        TrackerType::TrackedEntity,
        TrackerType::Enrollment,
        TrackerType::Event,
        TrackerType::Relationship,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackerType::TrackedEntity => "trackedEntity",
            TrackerType::Enrollment => "enrollment",
            TrackerType::Event => "event",
            TrackerType::Relationship => "relationship",
        }
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind + uid; identifies one record across kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub tracker_type: TrackerType,
    pub uid: Uid,
}

impl RecordKey {
    pub fn new(tracker_type: TrackerType, uid: impl Into<Uid>) -> Self {
        RecordKey {
            tracker_type,
            uid: uid.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.tracker_type, self.uid)
    }
}

// =============================================================================
// STRATEGY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStrategy {
    Create,
    Update,
    #[default]
    CreateAndUpdate,
    Delete,
}

impl ImportStrategy {
    pub fn is_create(self) -> bool {
        self == ImportStrategy::Create
    }

    pub fn is_delete(self) -> bool {
        self == ImportStrategy::Delete
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Common view over the four record kinds.
pub trait TrackerDto {
    fn tracker_type(&self) -> TrackerType;

    fn uid(&self) -> &Uid;

    fn key(&self) -> RecordKey {
        RecordKey::new(self.tracker_type(), self.uid().clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackedEntity {
    pub tracked_entity: Uid,
    #[serde(default)]
    pub tracked_entity_type: Option<String>,
    #[serde(default)]
    pub org_unit: Option<String>,
}

impl TrackedEntity {
    pub fn new(uid: impl Into<Uid>) -> Self {
        TrackedEntity {
            tracked_entity: uid.into(),
            tracked_entity_type: None,
            org_unit: None,
        }
    }
}

impl TrackerDto for TrackedEntity {
    fn tracker_type(&self) -> TrackerType {
        TrackerType::TrackedEntity
    }

    fn uid(&self) -> &Uid {
        &self.tracked_entity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Enrollment {
    pub enrollment: Uid,
    pub tracked_entity: Uid,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub org_unit: Option<String>,
}

impl Enrollment {
    pub fn new(uid: impl Into<Uid>, tracked_entity: impl Into<Uid>) -> Self {
        Enrollment {
            enrollment: uid.into(),
            tracked_entity: tracked_entity.into(),
            program: None,
            org_unit: None,
        }
    }
}

impl TrackerDto for Enrollment {
    fn tracker_type(&self) -> TrackerType {
        TrackerType::Enrollment
    }

    fn uid(&self) -> &Uid {
        &self.enrollment
    }
}

/// An event either belongs to an enrollment or, registration-less, stands
/// alone as a hierarchy root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Event {
    pub event: Uid,
    #[serde(default)]
    pub enrollment: Option<Uid>,
    #[serde(default)]
    pub program_stage: Option<String>,
    #[serde(default)]
    pub org_unit: Option<String>,
}

impl Event {
    pub fn new(uid: impl Into<Uid>, enrollment: impl Into<Uid>) -> Self {
        Event {
            event: uid.into(),
            enrollment: Some(enrollment.into()),
            program_stage: None,
            org_unit: None,
        }
    }

    pub fn without_registration(uid: impl Into<Uid>) -> Self {
        Event {
            event: uid.into(),
            enrollment: None,
            program_stage: None,
            org_unit: None,
        }
    }
}

impl TrackerDto for Event {
    fn tracker_type(&self) -> TrackerType {
        TrackerType::Event
    }

    fn uid(&self) -> &Uid {
        &self.event
    }
}

/// One endpoint of a relationship. Exactly one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationshipItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_entity: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<Uid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Uid>,
}

impl RelationshipItem {
    pub fn tracked_entity(uid: impl Into<Uid>) -> Self {
        RelationshipItem {
            tracked_entity: Some(uid.into()),
            ..Default::default()
        }
    }

    pub fn enrollment(uid: impl Into<Uid>) -> Self {
        RelationshipItem {
            enrollment: Some(uid.into()),
            ..Default::default()
        }
    }

    pub fn event(uid: impl Into<Uid>) -> Self {
        RelationshipItem {
            event: Some(uid.into()),
            ..Default::default()
        }
    }

    /// The referenced record, or `None` unless exactly one field is set.
    pub fn key(&self) -> Option<RecordKey> {
        let set = [
            (TrackerType::TrackedEntity, &self.tracked_entity),
            (TrackerType::Enrollment, &self.enrollment),
            (TrackerType::Event, &self.event),
        ];
        let mut found = set
            .into_iter()
            .filter_map(|(tracker_type, uid)| uid.as_ref().map(|u| RecordKey::new(tracker_type, u.clone())));
        let first = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(first),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Relationship {
    pub relationship: Uid,
    #[serde(default)]
    pub relationship_type: Option<String>,
    pub from: RelationshipItem,
    pub to: RelationshipItem,
}

impl Relationship {
    pub fn new(uid: impl Into<Uid>, from: RelationshipItem, to: RelationshipItem) -> Self {
        Relationship {
            relationship: uid.into(),
            relationship_type: None,
            from,
            to,
        }
    }
}

impl TrackerDto for Relationship {
    fn tracker_type(&self) -> TrackerType {
        TrackerType::Relationship
    }

    fn uid(&self) -> &Uid {
        &self.relationship
    }
}

impl TrackerDto for RecordKey {
    fn tracker_type(&self) -> TrackerType {
        self.tracker_type
    }

    fn uid(&self) -> &Uid {
        &self.uid
    }
}
