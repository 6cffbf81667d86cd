//! Closed vocabulary of finding codes.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationCode {
    E1002,
    E1030,
    E1032,
    E1048,
    E1063,
    E1080,
    E1081,
    E1121,
    E4000,
    E4015,
    E4016,
    E5000,
    E5001,
}

impl ValidationCode {
    /// Message template; `{0}`, `{1}`, ... are replaced by message arguments.
    pub fn template(self) -> &'static str {
        match self {
            ValidationCode::E1002 => "TrackedEntity: `{0}`, already exists.",
            ValidationCode::E1030 => "Event: `{0}`, already exists.",
            ValidationCode::E1032 => "Event: `{0}`, not found.",
            ValidationCode::E1048 => "Object: `{0}`, uid: `{1}`, has an invalid uid format.",
            ValidationCode::E1063 => "TrackedEntity: `{0}`, does not exist.",
            ValidationCode::E1080 => "Enrollment: `{0}`, already exists.",
            ValidationCode::E1081 => "Enrollment: `{0}`, not found.",
            ValidationCode::E1121 => "Missing required {0} property: `{1}`.",
            ValidationCode::E4000 => "Relationship: `{0}` cannot link to itself.",
            ValidationCode::E4015 => "Relationship: `{0}`, already exists.",
            ValidationCode::E4016 => "Relationship: `{0}`, not found.",
            ValidationCode::E5000 => {
                "{0} cannot be persisted because {1} referenced by it cannot be persisted."
            }
            ValidationCode::E5001 => {
                "{0} cannot be deleted because {1} referenced by it cannot be deleted."
            }
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
