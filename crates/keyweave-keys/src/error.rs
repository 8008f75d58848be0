use crate::id::GroupId;
use keyweave_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type Result<T> = std::result::Result<T, KeyError>;
