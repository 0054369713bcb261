use serde::{Deserialize, Serialize};

/// A stored record as returned to callers.
///
/// `id` is assigned by the server on creation and never changes afterwards.
/// The category tag serializes as `type` on every wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Server-generated unique identifier (UUID v4, hyphenated).
    pub id: String,
    /// Free-text display name.
    pub name: String,
    /// Free-text category tag.
    #[serde(rename = "type")]
    pub record_type: String,
}

impl Record {
    /// Attaches an identifier to a draft.
    #[must_use]
    pub fn from_draft(id: impl Into<String>, draft: RecordDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            record_type: draft.record_type,
        }
    }
}

/// Client-supplied payload for creating a record. Carries no identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Free-text display name.
    #[serde(default)]
    pub name: String,
    /// Free-text category tag.
    #[serde(rename = "type", default)]
    pub record_type: String,
}

impl RecordDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
        }
    }
}
