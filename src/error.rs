//! Unified error type for faults that abort an import attempt.
//!
//! Validation findings are not errors in this sense; they are collected by the
//! [`Reporter`](crate::validate::Reporter) and never returned through `Err`.

use thiserror::Error;

use crate::model::{RecordKey, TrackerType, Uid};

/// Failure reported by a [`StorageLookup`](crate::lookup::StorageLookup).
pub type LookupError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The batch violates a structural invariant and cannot be validated.
    #[error("[{code}] {message}")]
    MalformedInput {
        code: &'static str,
        message: String,
        record: Option<RecordKey>,
    },

    #[error("storage lookup failed for {tracker_type} `{uid}`: {source}")]
    Lookup {
        tracker_type: TrackerType,
        uid: Uid,
        #[source]
        source: LookupError,
    },

    #[error("validator `{validator}` failed on {record}: {message}")]
    Validator {
        validator: &'static str,
        record: RecordKey,
        message: String,
    },

    #[error("invalid import params: {0}")]
    Params(#[from] serde_json::Error),
}

impl ImportError {
    pub fn malformed(code: &'static str, message: impl Into<String>, record: Option<RecordKey>) -> Self {
        ImportError::MalformedInput {
            code,
            message: message.into(),
            record,
        }
    }

    pub fn lookup(tracker_type: TrackerType, uid: &Uid, source: LookupError) -> Self {
        ImportError::Lookup {
            tracker_type,
            uid: uid.clone(),
            source,
        }
    }

    pub fn validator(validator: &'static str, record: RecordKey, message: impl Into<String>) -> Self {
        ImportError::Validator {
            validator,
            record,
            message: message.into(),
        }
    }

    /// Code of a malformed-input fault, if this is one.
    pub fn malformed_code(&self) -> Option<&'static str> {
        match self {
            ImportError::MalformedInput { code, .. } => Some(*code),
            _ => None,
        }
    }
}
