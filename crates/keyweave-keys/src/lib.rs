//! Keyweave Keys - group registry over the association graph
//!
//! Callers hand the [`KeyManager`] batches of named elements. Each batch
//! becomes a group with a freshly generated id; each element is also filed
//! under its own name. Groups can then be fetched by id, by element name,
//! or by "everything sharing a name with this element".
//!
//! Every element passed in is its own entry. Two equal elements added in
//! different groups are stored twice, and removing one group leaves the
//! other's copy alone.
//!
//! # Example
//!
//! ```
//! use keyweave_keys::{KeyManager, Named};
//!
//! #[derive(Debug, PartialEq)]
//! struct Module {
//!     name: &'static str,
//!     speed: u32,
//! }
//!
//! impl Named for Module {
//!     fn name(&self) -> &str {
//!         self.name
//!     }
//! }
//!
//! let mut manager = KeyManager::new();
//! let id = manager
//!     .add_group([Module { name: "mover", speed: 1 }, Module { name: "renderer", speed: 0 }])
//!     .unwrap();
//!
//! let group = manager.group(id.as_str()).unwrap();
//! assert_eq!(group["mover"].speed, 1);
//! ```

mod error;
mod id;
mod manager;

pub use error::{KeyError, Result};
pub use id::{GroupId, IdGenerator, SequentialIds, UuidIds};
pub use manager::{GroupQuery, KeyManager, ManagerConfig, Named, NamedElements};
