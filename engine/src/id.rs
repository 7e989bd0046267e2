//! Record identifiers.
//!
//! Two id spaces exist: a tentative id assigned locally when an
//! optimistic creation is staged, and a confirmed id assigned by the
//! server on acknowledgement. Modelling them as enum variants (rather
//! than a string prefix convention) makes a collision between the two
//! spaces unrepresentable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a visible line record.
///
/// A record is created under a `Tentative` id and re-keyed to a
/// `Confirmed` id when the server acknowledges it. The tentative space
/// is owned by the client, the confirmed space by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RecordId {
    /// Locally generated, not yet acknowledged by the server.
    Tentative(String),
    /// Assigned by the server.
    Confirmed(String),
}

impl RecordId {
    /// Whether this id belongs to the locally generated space.
    pub fn is_tentative(&self) -> bool {
        matches!(self, RecordId::Tentative(_))
    }

    /// Whether this id was assigned by the server.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, RecordId::Confirmed(_))
    }

    /// The raw id string, without the space tag.
    pub fn as_str(&self) -> &str {
        match self {
            RecordId::Tentative(id) | RecordId::Confirmed(id) => id,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Tentative(id) => write!(f, "tentative:{id}"),
            RecordId::Confirmed(id) => write!(f, "confirmed:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tentative_and_confirmed_never_compare_equal() {
        let tentative = RecordId::Tentative("abc".into());
        let confirmed = RecordId::Confirmed("abc".into());
        assert_ne!(tentative, confirmed);
        assert_eq!(tentative.as_str(), confirmed.as_str());
    }

    #[test]
    fn space_predicates() {
        assert!(RecordId::Tentative("t".into()).is_tentative());
        assert!(!RecordId::Tentative("t".into()).is_confirmed());
        assert!(RecordId::Confirmed("c".into()).is_confirmed());
    }

    #[test]
    fn display_includes_space() {
        assert_eq!(RecordId::Tentative("t-1".into()).to_string(), "tentative:t-1");
        assert_eq!(RecordId::Confirmed("s-1".into()).to_string(), "confirmed:s-1");
    }

    #[test]
    fn serialization_roundtrip() {
        let id = RecordId::Tentative("t-42".into());
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("tentative")); // tagged form
        let parsed: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
