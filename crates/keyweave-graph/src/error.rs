use crate::edge::Namespace;
use thiserror::Error;

/// Errors returned by [`AssociationGraph`](crate::AssociationGraph) operations.
///
/// A failed call never leaves a partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The key was never declared in this namespace.
    #[error("{namespace} key not found: {key}")]
    KeyNotFound { namespace: Namespace, key: String },

    /// Keys must be non-empty.
    #[error("empty {namespace} key")]
    InvalidKey { namespace: Namespace },

    /// The value is not stored in the graph.
    #[error("element not found")]
    ElementNotFound,

    /// Another element already holds an equal value.
    #[error("an equal element is already stored")]
    DuplicateElement,
}

impl GraphError {
    pub(crate) fn key_not_found(namespace: Namespace, key: &str) -> Self {
        GraphError::KeyNotFound {
            namespace,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
