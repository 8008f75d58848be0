use serde::{Deserialize, Serialize};

/// Tunables for an [`AssociationGraph`](crate::AssociationGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Log a warning when an already-declared key is declared again.
    pub warn_on_duplicate_key: bool,

    /// Number of vertices and edges to pre-allocate.
    pub capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            warn_on_duplicate_key: true,
            capacity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: GraphConfig = serde_json::from_str(r#"{ "capacity": 64 }"#).unwrap();
        assert!(config.warn_on_duplicate_key);
        assert_eq!(config.capacity, 64);
    }
}
