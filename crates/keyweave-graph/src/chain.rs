//! Insertion chain.
//!
//! Elements form a doubly linked list in first-insertion order. Links are
//! arena indices, so unlinking an element never touches ownership.

use crate::graph::{AssociationGraph, ElementId, ElementNode, Vertex};
use petgraph::stable_graph::NodeIndex;
use std::iter::FusedIterator;

impl<T> AssociationGraph<T> {
    /// Appends a new element to the tail of the chain.
    pub(crate) fn push_back(&mut self, value: T) -> NodeIndex {
        let index = self.graph.add_node(Vertex::Element(ElementNode {
            value,
            prev: self.tail,
            next: None,
        }));

        match self.tail.and_then(|tail| self.element_mut(tail)) {
            Some(tail) => tail.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        index
    }

    /// Unlinks an element from the chain. The vertex itself is left in place.
    pub(crate) fn unlink(&mut self, index: NodeIndex) {
        let Some(node) = self.element(index) else {
            return;
        };
        let (prev, next) = (node.prev, node.next);

        match prev.and_then(|prev| self.element_mut(prev)) {
            Some(prev) => prev.next = next,
            None => self.head = next,
        }
        match next.and_then(|next| self.element_mut(next)) {
            Some(next) => next.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.element_mut(index) {
            node.prev = None;
            node.next = None;
        }
        self.len -= 1;
    }

    /// Walks the chain from head to tail.
    pub(crate) fn chain_indices(&self) -> ChainIndices<'_, T> {
        ChainIndices {
            graph: self,
            cursor: self.head,
        }
    }

    /// Iterates over every element in first-insertion order.
    ///
    /// Each call starts again from the head. The iterator borrows the graph,
    /// so the graph cannot change while it is alive.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.chain_indices(),
            remaining: self.len,
        }
    }

    /// Alias of [`iter`](Self::iter).
    pub fn get_all(&self) -> Iter<'_, T> {
        self.iter()
    }

    /// Iterates over element handles in first-insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.chain_indices().map(ElementId)
    }
}

pub(crate) struct ChainIndices<'a, T> {
    graph: &'a AssociationGraph<T>,
    cursor: Option<NodeIndex>,
}

impl<T> Iterator for ChainIndices<'_, T> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.cursor?;
        self.cursor = self.graph.element(current).and_then(|node| node.next);
        Some(current)
    }
}

/// Iterator over stored values in insertion order.
pub struct Iter<'a, T> {
    inner: ChainIndices<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let index = self.inner.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        self.inner.graph.element(index).map(|node| &node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a AssociationGraph<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
