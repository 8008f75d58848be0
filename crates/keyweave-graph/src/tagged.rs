//! Serial-identified values.
//!
//! The graph de-duplicates by `PartialEq`. Wrapping values in [`Tagged`]
//! makes identity a serial number instead, so equal payloads inserted under
//! different serials stay separate elements and the payload can be edited
//! in place without colliding with another element.

use crate::graph::{AssociationGraph, ElementId};
use std::ops::Deref;

/// A value whose identity is its serial, not its contents.
#[derive(Debug, Clone)]
pub struct Tagged<T> {
    serial: u64,
    value: T,
}

impl<T> Tagged<T> {
    pub fn new(serial: u64, value: T) -> Self {
        Self { serial, value }
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> PartialEq for Tagged<T> {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial
    }
}

impl<T> Eq for Tagged<T> {}

impl<T> Deref for Tagged<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> AssociationGraph<Tagged<T>> {
    /// Gets the payload of an element mutably.
    ///
    /// The serial cannot be changed, so identity is unaffected.
    pub fn value_mut(&mut self, id: ElementId) -> Option<&mut T> {
        self.element_mut(id.0).map(|node| &mut node.value.value)
    }
}
