//! Binding builder for multi-key associations.
//!
//! A binding names every top and bottom key a batch of values should be
//! linked under, and is applied in one call with
//! [`AssociationGraph::associate_both`](crate::AssociationGraph::associate_both).

/// Values plus the keys they should be associated under.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    pub top_keys: Vec<String>,
    pub bottom_keys: Vec<String>,
    pub values: Vec<T>,
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Binding<T> {
    /// Creates an empty binding.
    pub fn new() -> Self {
        Self {
            top_keys: Vec::new(),
            bottom_keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Adds a top-namespace key.
    pub fn top(mut self, key: impl Into<String>) -> Self {
        self.top_keys.push(key.into());
        self
    }

    /// Adds a bottom-namespace key.
    pub fn bottom(mut self, key: impl Into<String>) -> Self {
        self.bottom_keys.push(key.into());
        self
    }

    /// Adds a value.
    pub fn value(mut self, value: T) -> Self {
        self.values.push(value);
        self
    }

    /// Adds several values.
    pub fn values(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.values.extend(values);
        self
    }

    /// Returns true if the binding names no keys at all.
    pub fn has_no_keys(&self) -> bool {
        self.top_keys.is_empty() && self.bottom_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_keys_and_values() {
        let binding = Binding::new()
            .top("g1")
            .bottom("mover")
            .bottom("physics")
            .value(1)
            .values([2, 3]);

        assert_eq!(binding.top_keys, vec!["g1"]);
        assert_eq!(binding.bottom_keys, vec!["mover", "physics"]);
        assert_eq!(binding.values, vec![1, 2, 3]);
        assert!(!binding.has_no_keys());
        assert!(Binding::<i32>::new().has_no_keys());
    }
}
