//! Append-only collector of validation findings.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::codes::ValidationCode;
use crate::model::{RecordKey, TrackerDto, TrackerType, Uid};
use crate::params::{IdScheme, IdSchemes, MetadataKind};

/// An error or warning raised against one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub message: String,
    pub code: ValidationCode,
    pub tracker_type: TrackerType,
    pub uid: Uid,
}

impl Finding {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.tracker_type, self.uid.clone())
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({} `{}`)", self.code, self.message, self.tracker_type, self.uid)
    }
}

/// A metadata object named in a message, rendered with the configured scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRef {
    pub kind: MetadataKind,
    pub uid: String,
    pub code: Option<String>,
    pub name: Option<String>,
}

impl MetadataRef {
    pub fn display(&self, id_schemes: &IdSchemes) -> String {
        let value = match id_schemes.scheme_for(self.kind) {
            IdScheme::Uid => None,
            IdScheme::Code => self.code.as_ref(),
            IdScheme::Name => self.name.as_ref(),
        };
        value.unwrap_or(&self.uid).clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageArg {
    Text(String),
    Uid(Uid),
    Record(RecordKey),
    Metadata(MetadataRef),
}

impl MessageArg {
    fn render(&self, id_schemes: &IdSchemes) -> String {
        match self {
            MessageArg::Text(text) => text.clone(),
            MessageArg::Uid(uid) => uid.to_string(),
            MessageArg::Record(key) => format!("\"{}\" `{}`", key.tracker_type, key.uid),
            MessageArg::Metadata(metadata) => metadata.display(id_schemes),
        }
    }
}

impl From<&str> for MessageArg {
    fn from(value: &str) -> Self {
        MessageArg::Text(value.to_string())
    }
}

impl From<String> for MessageArg {
    fn from(value: String) -> Self {
        MessageArg::Text(value)
    }
}

impl From<&Uid> for MessageArg {
    fn from(value: &Uid) -> Self {
        MessageArg::Uid(value.clone())
    }
}

impl From<RecordKey> for MessageArg {
    fn from(value: RecordKey) -> Self {
        MessageArg::Record(value)
    }
}

impl From<MetadataRef> for MessageArg {
    fn from(value: MetadataRef) -> Self {
        MessageArg::Metadata(value)
    }
}

/// Fill `{0}`, `{1}`, ... of a code's template.
pub fn format_message(code: ValidationCode, args: &[MessageArg], id_schemes: &IdSchemes) -> String {
    args.iter()
        .enumerate()
        .fold(code.template().to_string(), |message, (i, arg)| {
            message.replace(&format!("{{{}}}", i), &arg.render(id_schemes))
        })
}

/// Per-kind uids of records with at least one error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRecords(BTreeMap<TrackerType, BTreeSet<Uid>>);

impl InvalidRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tracker_type: TrackerType, uid: Uid) -> bool {
        self.0.entry(tracker_type).or_default().insert(uid)
    }

    pub fn contains(&self, tracker_type: TrackerType, uid: &Uid) -> bool {
        self.0.get(&tracker_type).is_some_and(|uids| uids.contains(uid))
    }

    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.contains(key.tracker_type, &key.uid)
    }

    pub fn get(&self, tracker_type: TrackerType) -> impl Iterator<Item = &Uid> {
        self.0.get(&tracker_type).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

/// Immutable view of everything a validation run reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// The only channel through which validators report failure. Findings are
/// never removed; identical findings are kept once.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    id_schemes: IdSchemes,
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
    seen_errors: HashSet<Finding>,
    seen_warnings: HashSet<Finding>,
    error_counts: HashMap<RecordKey, usize>,
}

impl Reporter {
    pub fn new(id_schemes: IdSchemes) -> Self {
        Reporter {
            id_schemes,
            ..Default::default()
        }
    }

    pub fn add_error(&mut self, dto: &dyn TrackerDto, code: ValidationCode, args: &[MessageArg]) {
        let finding = self.finding(dto, code, args);
        self.push_error(finding);
    }

    pub fn add_error_if(
        &mut self,
        predicate: impl FnOnce() -> bool,
        dto: &dyn TrackerDto,
        code: ValidationCode,
        args: &[MessageArg],
    ) {
        if predicate() {
            self.add_error(dto, code, args);
        }
    }

    pub fn add_warning(&mut self, dto: &dyn TrackerDto, code: ValidationCode, args: &[MessageArg]) {
        let finding = self.finding(dto, code, args);
        if self.seen_warnings.insert(finding.clone()) {
            self.warnings.push(finding);
        }
    }

    pub fn add_warning_if(
        &mut self,
        predicate: impl FnOnce() -> bool,
        dto: &dyn TrackerDto,
        code: ValidationCode,
        args: &[MessageArg],
    ) {
        if predicate() {
            self.add_warning(dto, code, args);
        }
    }

    pub fn has_error_report(&self, predicate: impl Fn(&Finding) -> bool) -> bool {
        self.errors.iter().any(predicate)
    }

    pub fn has_warning_report(&self, predicate: impl Fn(&Finding) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of distinct errors reported against one record so far.
    pub fn error_count(&self, dto: &dyn TrackerDto) -> usize {
        self.error_counts.get(&dto.key()).copied().unwrap_or(0)
    }

    pub fn is_invalid(&self, dto: &dyn TrackerDto) -> bool {
        self.error_count(dto) > 0
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn invalid_records(&self) -> InvalidRecords {
        let mut invalid = InvalidRecords::new();
        for error in &self.errors {
            invalid.insert(error.tracker_type, error.uid.clone());
        }
        invalid
    }

    /// Union of both reporters' findings, in this reporter's order first.
    pub fn merge(&mut self, other: Reporter) {
        for error in other.errors {
            self.push_error(error);
        }
        for warning in other.warnings {
            if self.seen_warnings.insert(warning.clone()) {
                self.warnings.push(warning);
            }
        }
    }

    pub fn into_result(self) -> ValidationResult {
        ValidationResult {
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    fn finding(&self, dto: &dyn TrackerDto, code: ValidationCode, args: &[MessageArg]) -> Finding {
        Finding {
            message: format_message(code, args, &self.id_schemes),
            code,
            tracker_type: dto.tracker_type(),
            uid: dto.uid().clone(),
        }
    }

    fn push_error(&mut self, finding: Finding) {
        if self.seen_errors.insert(finding.clone()) {
            *self.error_counts.entry(finding.key()).or_default() += 1;
            self.errors.push(finding);
        }
    }
}
