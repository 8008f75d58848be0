//! Keyweave Graph - indexed bipartite association graph
//!
//! This crate stores elements under keys from two independent namespaces
//! (top and bottom) and answers keyed, identity-based, and ordered queries
//! over them.
//!
//! # Architecture
//!
//! Key entries and elements share one petgraph `StableGraph` arena. An
//! association is an edge from a key entry to an element, which gives:
//! - Keyed lookups through per-namespace key indexes
//! - Reverse lookups (which keys point at an element) through incoming edges
//! - An insertion chain threading every element in first-insertion order
//!
//! # Example
//!
//! ```
//! use keyweave_graph::{AssociationGraph, Namespace};
//!
//! let mut graph = AssociationGraph::new();
//! graph.associate(Namespace::Top, "g1", "mover").unwrap();
//! graph.associate(Namespace::Bottom, "physics", "mover").unwrap();
//!
//! assert_eq!(graph.lookup_by_top_key("g1").unwrap(), vec![&"mover"]);
//! assert_eq!(graph.len(), 1);
//! ```

mod builder;
mod chain;
mod config;
mod edge;
mod error;
mod graph;
mod tagged;

pub use builder::Binding;
pub use chain::Iter;
pub use config::GraphConfig;
pub use edge::{AssociationRecord, Namespace};
pub use error::{GraphError, Result};
pub use graph::{AssociationGraph, Associations, ElementId, GraphStats};
pub use tagged::Tagged;
