//! Import parameters supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackerImportParams {
    #[serde(default)]
    pub validation_mode: ValidationMode,
    #[serde(default)]
    pub atomic_mode: AtomicMode,
    #[serde(default)]
    pub id_schemes: IdSchemes,
}

impl TrackerImportParams {
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How the validation orchestrator runs validators.
///
/// Whether `Skip` is allowed (e.g. for administrators) is the caller's
/// decision; the orchestrator only honors the value it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMode {
    /// Run no validator at all.
    Skip,
    /// Stop the whole run at the first error.
    FailFast,
    /// Run every validator on every record.
    #[default]
    Full,
}

/// Whether a single validation error blocks the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtomicMode {
    #[default]
    All,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdScheme {
    #[default]
    Uid,
    Code,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKind {
    OrgUnit,
    Program,
    ProgramStage,
    DataElement,
}

/// Identifier schemes used when naming metadata in finding messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IdSchemes {
    #[serde(default)]
    pub id_scheme: IdScheme,
    #[serde(default)]
    pub org_unit_id_scheme: Option<IdScheme>,
    #[serde(default)]
    pub program_id_scheme: Option<IdScheme>,
    #[serde(default)]
    pub program_stage_id_scheme: Option<IdScheme>,
    #[serde(default)]
    pub data_element_id_scheme: Option<IdScheme>,
}

impl IdSchemes {
    pub fn scheme_for(&self, kind: MetadataKind) -> IdScheme {
        let specific = match kind {
            MetadataKind::OrgUnit => self.org_unit_id_scheme,
            MetadataKind::Program => self.program_id_scheme,
            MetadataKind::ProgramStage => self.program_stage_id_scheme,
            MetadataKind::DataElement => self.data_element_id_scheme,
        };
        specific.unwrap_or(self.id_scheme)
    }
}
