//! Edge types for the association graph.
//!
//! Every association is an edge from a key entry to an element. The edge
//! records which namespace the key lives in and when the edge was added,
//! so key lookups can return elements in the order they were linked.

use serde::{Deserialize, Serialize};

/// One of the two independent keyspaces an element can be indexed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Group-level keys (one per bulk insert in the key manager).
    Top,

    /// Element-level keys (usually derived from the element itself).
    Bottom,
}

impl Namespace {
    /// Both namespaces, top first.
    pub const ALL: [Namespace; 2] = [Namespace::Top, Namespace::Bottom];

    /// Returns the other namespace.
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }

    /// Returns the lowercase name used in logs and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An adjacency edge between a key entry and an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    /// Namespace of the key entry at the source of the edge.
    pub namespace: Namespace,

    /// Graph-wide insertion counter. Orders edges within a key entry.
    pub seq: u64,
}

impl Link {
    pub fn new(namespace: Namespace, seq: u64) -> Self {
        Self { namespace, seq }
    }
}

/// A flattened association for export/inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub namespace: Namespace,
    pub key: String,
    /// Position of the element in the insertion chain.
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(Namespace::Top.opposite(), Namespace::Bottom);
        assert_eq!(Namespace::Bottom.opposite(), Namespace::Top);
    }

    #[test]
    fn test_display_matches_serde_name() {
        assert_eq!(Namespace::Top.to_string(), "top");
        assert_eq!(
            serde_json::to_string(&Namespace::Bottom).unwrap(),
            "\"bottom\""
        );
    }
}
