//! Core association graph.
//!
//! The AssociationGraph keeps key entries and elements as vertices of a
//! single petgraph `StableGraph`. An association is an edge from a key entry
//! to an element, so every edge is visible from both ends: the key entry
//! sees its elements (outgoing) and the element sees the keys pointing at
//! it (incoming). Elements are additionally threaded on an insertion chain
//! (see `chain.rs`).

use crate::builder::Binding;
use crate::config::GraphConfig;
use crate::edge::{AssociationRecord, Link, Namespace};
use crate::error::{GraphError, Result};
use indexmap::{IndexMap, IndexSet};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stable handle to a stored element.
///
/// Stays valid until the element is deleted, regardless of other removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) NodeIndex);

impl ElementId {
    /// Returns the raw arena slot.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({})", self.0.index())
    }
}

/// A stored value plus its insertion chain links.
#[derive(Debug)]
pub(crate) struct ElementNode<T> {
    pub value: T,
    pub prev: Option<NodeIndex>,
    pub next: Option<NodeIndex>,
}

/// A vertex in the arena: either a key entry or an element.
#[derive(Debug)]
pub(crate) enum Vertex<T> {
    Key { namespace: Namespace, key: String },
    Element(ElementNode<T>),
}

/// The keys currently pointing at one element, per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Associations<'a> {
    pub top: Vec<&'a str>,
    pub bottom: Vec<&'a str>,
}

impl<'a> Associations<'a> {
    /// Returns the keys for one namespace.
    pub fn get(&self, namespace: Namespace) -> &[&'a str] {
        match namespace {
            Namespace::Top => &self.top,
            Namespace::Bottom => &self.bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}

/// An indexed bipartite association graph.
///
/// Elements of type `T` are grouped under keys from two independent
/// namespaces. A value equal to one already stored is never duplicated:
/// associating it again links the existing element.
#[derive(Debug)]
pub struct AssociationGraph<T> {
    /// Arena holding key entries and elements.
    pub(crate) graph: StableGraph<Vertex<T>, Link>,

    /// Top-namespace key entries, in declaration order.
    top_index: IndexMap<String, NodeIndex>,

    /// Bottom-namespace key entries, in declaration order.
    bottom_index: IndexMap<String, NodeIndex>,

    /// First element of the insertion chain.
    pub(crate) head: Option<NodeIndex>,

    /// Last element of the insertion chain.
    pub(crate) tail: Option<NodeIndex>,

    /// Number of elements on the chain.
    pub(crate) len: usize,

    /// Next edge sequence number.
    next_seq: u64,

    config: GraphConfig,
}

impl<T> Default for AssociationGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssociationGraph<T> {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Creates an empty graph with the given configuration.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            graph: StableGraph::with_capacity(config.capacity, config.capacity),
            top_index: IndexMap::new(),
            bottom_index: IndexMap::new(),
            head: None,
            tail: None,
            len: 0,
            next_seq: 0,
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Declares a key, warning if it already exists.
    ///
    /// An existing key keeps its adjacency list.
    pub fn declare_key(&mut self, namespace: Namespace, key: &str) -> Result<()> {
        self.declare(namespace, key, self.config.warn_on_duplicate_key)
    }

    /// Declares a key without warning if it already exists.
    pub fn declare_key_quiet(&mut self, namespace: Namespace, key: &str) -> Result<()> {
        self.declare(namespace, key, false)
    }

    fn declare(&mut self, namespace: Namespace, key: &str, warn_duplicate: bool) -> Result<()> {
        validate_key(namespace, key)?;
        if self.contains_key(namespace, key) {
            if warn_duplicate {
                warn!("Duplicate {} key '{}' ignored", namespace, key);
            }
            return Ok(());
        }
        self.ensure_key(namespace, key);
        Ok(())
    }

    /// Returns true if the key has been declared.
    pub fn contains_key(&self, namespace: Namespace, key: &str) -> bool {
        self.index(namespace).contains_key(key)
    }

    /// Iterates over the declared keys of a namespace, in declaration order.
    pub fn keys(&self, namespace: Namespace) -> impl Iterator<Item = &str> + '_ {
        self.index(namespace).keys().map(String::as_str)
    }

    /// Removes a key entry and all of its edges.
    ///
    /// Returns the elements it pointed to (edge order, without repeats).
    /// The elements themselves stay in the graph, even if this leaves them
    /// with no keys at all.
    pub fn remove_key(&mut self, namespace: Namespace, key: &str) -> Result<Vec<ElementId>> {
        let entry = self.key_entry(namespace, key)?;
        let targets: IndexSet<NodeIndex> = self.ordered_targets(entry).into_iter().collect();

        self.index_mut(namespace).shift_remove(key);
        self.graph.remove_node(entry);
        debug!(
            "Removed {} key '{}' ({} elements detached)",
            namespace,
            key,
            targets.len()
        );

        Ok(targets.into_iter().map(ElementId).collect())
    }

    fn index(&self, namespace: Namespace) -> &IndexMap<String, NodeIndex> {
        match namespace {
            Namespace::Top => &self.top_index,
            Namespace::Bottom => &self.bottom_index,
        }
    }

    fn index_mut(&mut self, namespace: Namespace) -> &mut IndexMap<String, NodeIndex> {
        match namespace {
            Namespace::Top => &mut self.top_index,
            Namespace::Bottom => &mut self.bottom_index,
        }
    }

    fn key_entry(&self, namespace: Namespace, key: &str) -> Result<NodeIndex> {
        self.index(namespace)
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::key_not_found(namespace, key))
    }

    /// Returns the key entry, creating it if needed. The key must be valid.
    fn ensure_key(&mut self, namespace: Namespace, key: &str) -> NodeIndex {
        if let Some(&entry) = self.index(namespace).get(key) {
            return entry;
        }
        let entry = self.graph.add_node(Vertex::Key {
            namespace,
            key: key.to_string(),
        });
        self.index_mut(namespace).insert(key.to_string(), entry);
        debug!("Declared {} key '{}'", namespace, key);
        entry
    }

    /// Elements linked from a key entry, in the order the edges were added.
    fn ordered_targets(&self, entry: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(entry, Direction::Outgoing)
            .map(|edge| (edge.weight().seq, edge.target()))
            .collect();
        edges.sort_unstable_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Associates an element already in the graph with a key, by handle.
    pub fn attach(&mut self, namespace: Namespace, key: &str, id: ElementId) -> Result<()> {
        validate_key(namespace, key)?;
        if self.element(id.0).is_none() {
            return Err(GraphError::ElementNotFound);
        }
        let entry = self.ensure_key(namespace, key);
        self.link(namespace, entry, id.0);
        Ok(())
    }

    fn link(&mut self, namespace: Namespace, entry: NodeIndex, element: NodeIndex) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.graph.add_edge(entry, element, Link::new(namespace, seq));
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Returns the values linked to a key, in the order they were linked.
    ///
    /// A declared key with no elements yields an empty vec.
    pub fn lookup(&self, namespace: Namespace, key: &str) -> Result<Vec<&T>> {
        Ok(self
            .lookup_ids(namespace, key)?
            .into_iter()
            .filter_map(|id| self.get(id))
            .collect())
    }

    pub fn lookup_by_top_key(&self, key: &str) -> Result<Vec<&T>> {
        self.lookup(Namespace::Top, key)
    }

    pub fn lookup_by_bottom_key(&self, key: &str) -> Result<Vec<&T>> {
        self.lookup(Namespace::Bottom, key)
    }

    /// Same as [`lookup`](Self::lookup), returning element handles.
    pub fn lookup_ids(&self, namespace: Namespace, key: &str) -> Result<Vec<ElementId>> {
        let entry = self.key_entry(namespace, key)?;
        Ok(self
            .ordered_targets(entry)
            .into_iter()
            .map(ElementId)
            .collect())
    }

    /// Gets an element by handle.
    pub fn get(&self, id: ElementId) -> Option<&T> {
        self.element(id.0).map(|node| &node.value)
    }

    /// Same as [`lookup_siblings`](AssociationGraph::lookup_siblings), by handle.
    ///
    /// An unknown handle has no siblings.
    pub fn lookup_siblings_of(&self, id: ElementId, namespace: Namespace) -> Vec<&T> {
        let element = id.0;
        if self.element(element).is_none() {
            return Vec::new();
        }

        let mut siblings: IndexSet<NodeIndex> = IndexSet::new();
        for edge in self.graph.edges_directed(element, Direction::Incoming) {
            if edge.weight().namespace != namespace {
                continue;
            }
            siblings.extend(
                self.graph
                    .edges_directed(edge.source(), Direction::Outgoing)
                    .map(|shared| shared.target())
                    .filter(|&target| target != element),
            );
        }

        self.chain_indices()
            .filter(|index| siblings.contains(index))
            .filter_map(|index| self.element(index).map(|node| &node.value))
            .collect()
    }

    /// Returns true if the element has no adjacency edges left.
    pub fn is_orphan(&self, id: ElementId) -> bool {
        self.element(id.0).is_some()
            && self
                .graph
                .edges_directed(id.0, Direction::Incoming)
                .next()
                .is_none()
    }

    /// Returns true if the element is linked to at least one key of `namespace`.
    pub fn has_keys(&self, id: ElementId, namespace: Namespace) -> bool {
        self.graph
            .edges_directed(id.0, Direction::Incoming)
            .any(|edge| edge.weight().namespace == namespace)
    }

    /// Keys pointing at an element, in edge order, without repeats.
    pub fn associations_of(&self, id: ElementId) -> Associations<'_> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(id.0, Direction::Incoming)
            .map(|edge| (edge.weight().seq, edge.source()))
            .collect();
        edges.sort_unstable_by_key(|(seq, _)| *seq);

        let mut associations = Associations::default();
        for (_, entry) in edges {
            if let Some(Vertex::Key { namespace, key }) = self.graph.node_weight(entry) {
                let keys = match namespace {
                    Namespace::Top => &mut associations.top,
                    Namespace::Bottom => &mut associations.bottom,
                };
                if !keys.contains(&key.as_str()) {
                    keys.push(key.as_str());
                }
            }
        }
        associations
    }

    pub(crate) fn element(&self, index: NodeIndex) -> Option<&ElementNode<T>> {
        match self.graph.node_weight(index)? {
            Vertex::Element(node) => Some(node),
            Vertex::Key { .. } => None,
        }
    }

    pub(crate) fn element_mut(&mut self, index: NodeIndex) -> Option<&mut ElementNode<T>> {
        match self.graph.node_weight_mut(index)? {
            Vertex::Element(node) => Some(node),
            Vertex::Key { .. } => None,
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes an element by handle.
    ///
    /// All its edges in both namespaces go with it; the key entries remain.
    pub fn remove(&mut self, id: ElementId) -> Option<T> {
        self.element(id.0)?;
        self.unlink(id.0);
        match self.graph.remove_node(id.0)? {
            Vertex::Element(node) => {
                debug!("Removed {}", id);
                Some(node.value)
            }
            Vertex::Key { .. } => None,
        }
    }

    /// Removes every element and key.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.top_index.clear();
        self.bottom_index.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.next_seq = 0;
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the number of distinct stored elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of adjacency edges across both namespaces.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            elements: self.len,
            top_keys: self.top_index.len(),
            bottom_keys: self.bottom_index.len(),
            edges: self.graph.edge_count(),
        }
    }

    /// Flattens every association into records, top keys first.
    pub fn export_associations(&self) -> Vec<AssociationRecord> {
        let positions: HashMap<NodeIndex, usize> = self
            .chain_indices()
            .enumerate()
            .map(|(position, index)| (index, position))
            .collect();

        let mut records = Vec::with_capacity(self.graph.edge_count());
        for namespace in Namespace::ALL {
            for (key, &entry) in self.index(namespace) {
                for target in self.ordered_targets(entry) {
                    if let Some(&position) = positions.get(&target) {
                        records.push(AssociationRecord {
                            namespace,
                            key: key.clone(),
                            position,
                        });
                    }
                }
            }
        }
        records
    }
}

impl<T: PartialEq> AssociationGraph<T> {
    /// Finds the element holding `value`.
    ///
    /// Walks the insertion chain, so this is linear in the element count.
    pub fn find(&self, value: &T) -> Option<ElementId> {
        self.find_index(value).map(ElementId)
    }

    fn find_index(&self, value: &T) -> Option<NodeIndex> {
        self.chain_indices()
            .find(|&index| matches!(self.element(index), Some(node) if node.value == *value))
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find_index(value).is_some()
    }

    fn find_or_insert(&mut self, value: T) -> NodeIndex {
        match self.find_index(&value) {
            Some(index) => index,
            None => self.push_back(value),
        }
    }

    fn require(&self, value: &T) -> Result<NodeIndex> {
        self.find_index(value).ok_or(GraphError::ElementNotFound)
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Associates a value with a key, declaring the key if needed.
    ///
    /// An equal value already in the graph is linked rather than duplicated.
    /// Associating the same pair twice records two edges.
    pub fn associate(&mut self, namespace: Namespace, key: &str, value: T) -> Result<ElementId> {
        validate_key(namespace, key)?;
        let entry = self.ensure_key(namespace, key);
        let element = self.find_or_insert(value);
        self.link(namespace, entry, element);
        Ok(ElementId(element))
    }

    /// Associates several values with one key.
    pub fn associate_all(
        &mut self,
        namespace: Namespace,
        key: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Vec<ElementId>> {
        validate_key(namespace, key)?;
        let entry = self.ensure_key(namespace, key);
        Ok(values
            .into_iter()
            .map(|value| {
                let element = self.find_or_insert(value);
                self.link(namespace, entry, element);
                ElementId(element)
            })
            .collect())
    }

    /// Associates every value with every top and bottom key of the binding.
    ///
    /// Keys are validated before anything is written. A binding without
    /// keys stores nothing.
    pub fn associate_both(&mut self, binding: Binding<T>) -> Result<Vec<ElementId>> {
        for key in &binding.top_keys {
            validate_key(Namespace::Top, key)?;
        }
        for key in &binding.bottom_keys {
            validate_key(Namespace::Bottom, key)?;
        }
        if binding.has_no_keys() {
            return Ok(Vec::new());
        }

        let entries: Vec<(Namespace, NodeIndex)> = binding
            .top_keys
            .iter()
            .map(|key| (Namespace::Top, key))
            .chain(binding.bottom_keys.iter().map(|key| (Namespace::Bottom, key)))
            .map(|(namespace, key)| (namespace, self.ensure_key(namespace, key)))
            .collect();

        let mut ids = Vec::with_capacity(binding.values.len());
        for value in binding.values {
            let element = self.find_or_insert(value);
            for &(namespace, entry) in &entries {
                self.link(namespace, entry, element);
            }
            ids.push(ElementId(element));
        }
        Ok(ids)
    }

    /// Replaces the value of an element, keeping all of its associations.
    ///
    /// Fails with `DuplicateElement` if another element already holds an
    /// equal value, so a value never ends up on two elements.
    pub fn replace(&mut self, id: ElementId, value: T) -> Result<T> {
        if self.element(id.0).is_none() {
            return Err(GraphError::ElementNotFound);
        }
        if matches!(self.find_index(&value), Some(index) if index != id.0) {
            return Err(GraphError::DuplicateElement);
        }
        match self.element_mut(id.0) {
            Some(node) => Ok(std::mem::replace(&mut node.value, value)),
            None => Err(GraphError::ElementNotFound),
        }
    }

    /// Returns the elements sharing a `namespace` key with `value`.
    ///
    /// Each sibling appears once, in insertion order; `value` itself is
    /// never included.
    pub fn lookup_siblings(&self, value: &T, namespace: Namespace) -> Result<Vec<&T>> {
        let element = self.require(value)?;
        Ok(self.lookup_siblings_of(ElementId(element), namespace))
    }

    /// Keys pointing at `value`, per namespace.
    pub fn associations(&self, value: &T) -> Result<Associations<'_>> {
        let element = self.require(value)?;
        Ok(self.associations_of(ElementId(element)))
    }

    /// Removes every edge between one key and one value.
    ///
    /// Returns how many edges were removed. The value stays in the graph
    /// even when this was its last edge.
    pub fn detach(&mut self, namespace: Namespace, key: &str, value: &T) -> Result<usize> {
        let entry = self.key_entry(namespace, key)?;
        let element = self.require(value)?;

        let edges: Vec<_> = self
            .graph
            .edges_directed(entry, Direction::Outgoing)
            .filter(|edge| edge.target() == element)
            .map(|edge| edge.id())
            .collect();
        for edge in &edges {
            self.graph.remove_edge(*edge);
        }
        debug!(
            "Detached {} edge(s) from {} key '{}'",
            edges.len(),
            namespace,
            key
        );
        Ok(edges.len())
    }

    /// Deletes a value and every association it has.
    pub fn delete(&mut self, value: &T) -> Result<T> {
        let element = self.require(value)?;
        self.remove(ElementId(element))
            .ok_or(GraphError::ElementNotFound)
    }
}

/// Graph statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub elements: usize,
    pub top_keys: usize,
    pub bottom_keys: usize,
    pub edges: usize,
}

fn validate_key(namespace: Namespace, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GraphError::InvalidKey { namespace });
    }
    Ok(())
}
