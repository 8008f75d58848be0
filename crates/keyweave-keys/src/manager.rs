//! Group-keyed element registry.
//!
//! The KeyManager is the caller-facing side of the association graph.
//! Each `add_group` call gets a fresh group id (a top key); each element is
//! also filed under its own name (a bottom key), so callers can ask for
//! "everything in group g2" or "every mover" without touching the graph.

use crate::error::{KeyError, Result};
use crate::id::{GroupId, IdGenerator, SequentialIds, UuidIds};
use indexmap::{IndexMap, IndexSet};
use keyweave_graph::{
    AssociationGraph, Binding, ElementId, GraphConfig, GraphError, Namespace, Tagged,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An element that can be filed under its own name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

impl Named for &str {
    fn name(&self) -> &str {
        self
    }
}

/// Configuration for a [`KeyManager`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    #[serde(flatten)]
    pub graph: GraphConfig,

    /// Use `<prefix>1`, `<prefix>2`, ... as group ids instead of UUIDs.
    pub id_prefix: Option<String>,
}

/// What to look a group up by.
#[derive(Debug, Clone, Copy)]
pub enum GroupQuery<'a, T> {
    /// A group id returned by `add_group`.
    Id(&'a str),
    /// A stored element; resolves to the elements sharing its name.
    Element(&'a T),
}

/// Name-keyed view of a set of elements.
pub type NamedElements<'a, T> = IndexMap<&'a str, &'a T>;

/// Registry of element groups.
///
/// Every element passed to `add_group` is its own entry, even when it
/// compares equal to an element that is already stored.
pub struct KeyManager<T> {
    graph: AssociationGraph<Tagged<T>>,
    ids: Box<dyn IdGenerator>,
    next_serial: u64,
}

impl<T: std::fmt::Debug> std::fmt::Debug for KeyManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("graph", &self.graph)
            .field("next_serial", &self.next_serial)
            .finish_non_exhaustive()
    }
}

impl<T: Named + PartialEq> Default for KeyManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyManager<T> {
    /// Returns the number of stored elements.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Iterates over the live group ids, oldest first.
    pub fn groups(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.keys(Namespace::Top)
    }

    pub fn group_count(&self) -> usize {
        self.graph.keys(Namespace::Top).count()
    }

    /// Iterates over every element in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.graph.iter().map(Tagged::value)
    }

    /// Read access to the underlying graph.
    pub fn graph(&self) -> &AssociationGraph<Tagged<T>> {
        &self.graph
    }

    /// Gets an element by handle.
    pub fn get(&self, id: ElementId) -> Option<&T> {
        self.graph.get(id).map(Tagged::value)
    }

    /// Gets an element mutably by handle.
    ///
    /// Renaming an element does not move it between name keys.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut T> {
        self.graph.value_mut(id)
    }

    /// Adds an element already in the manager to another group.
    pub fn join_group(&mut self, id: &str, member: ElementId) -> Result<()> {
        if !self.graph.contains_key(Namespace::Top, id) {
            return Err(KeyError::GroupNotFound(GroupId::from(id)));
        }
        self.graph.attach(Namespace::Top, id, member)?;
        debug!("Element joined group {}", id);
        Ok(())
    }
}

impl<T: Named + PartialEq> KeyManager<T> {
    /// Creates an empty manager that hands out UUID group ids.
    pub fn new() -> Self {
        Self::with_generator(GraphConfig::default(), UuidIds)
    }

    /// Creates an empty manager from configuration.
    pub fn from_config(config: ManagerConfig) -> Self {
        match config.id_prefix {
            Some(prefix) => Self::with_generator(config.graph, SequentialIds::new(prefix)),
            None => Self::with_generator(config.graph, UuidIds),
        }
    }

    /// Creates an empty manager with a custom id source.
    pub fn with_generator(config: GraphConfig, ids: impl IdGenerator + 'static) -> Self {
        Self {
            graph: AssociationGraph::with_config(config),
            ids: Box::new(ids),
            next_serial: 0,
        }
    }

    /// Adds elements as one group and returns the new group id.
    ///
    /// Every element is filed under the group id and under its own name.
    /// Elements with an empty name join the group but get no name key.
    pub fn add_group(&mut self, elements: impl IntoIterator<Item = T>) -> Result<GroupId> {
        let id = self.ids.next_id();
        self.graph.declare_key(Namespace::Top, id.as_str())?;

        let mut count = 0;
        for element in elements {
            let mut binding = Binding::new().top(id.as_str());
            if !element.name().is_empty() {
                binding = binding.bottom(element.name());
            }
            let serial = self.next_serial;
            self.next_serial += 1;
            self.graph.associate_both(binding.value(Tagged::new(serial, element)))?;
            count += 1;
        }

        debug!("Added group {} with {} elements", id, count);
        Ok(id)
    }

    /// Returns the members of a group keyed by name.
    ///
    /// When two members share a name the later one wins.
    pub fn group(&self, id: &str) -> Result<NamedElements<'_, T>> {
        let members = self
            .graph
            .lookup_by_top_key(id)
            .map_err(|err| group_error(err, id))?;
        Ok(keyed_by_name(members.into_iter().map(Tagged::value)))
    }

    /// Returns the elements sharing a name with `element`, keyed by name.
    pub fn siblings(&self, element: &T) -> Result<NamedElements<'_, T>> {
        let id = self.resolve(element)?;
        let siblings = self.graph.lookup_siblings_of(id, Namespace::Bottom);
        Ok(keyed_by_name(siblings.into_iter().map(Tagged::value)))
    }

    /// Looks up a group by id, or the siblings of an element.
    pub fn get_group(&self, query: GroupQuery<'_, T>) -> Result<NamedElements<'_, T>> {
        match query {
            GroupQuery::Id(id) => self.group(id),
            GroupQuery::Element(element) => self.siblings(element),
        }
    }

    /// Returns every element filed under `name`.
    pub fn by_name(&self, name: &str) -> Result<Vec<&T>> {
        self.by_names([name])
    }

    /// Returns every element filed under any of `names`.
    ///
    /// Each element appears once, in the order it was first found.
    pub fn by_names<I, S>(&self, names: I) -> Result<Vec<&T>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self
            .ids_by_names(names)?
            .into_iter()
            .filter_map(|id| self.get(id))
            .collect())
    }

    /// Same as [`by_names`](Self::by_names), returning element handles.
    pub fn ids_by_names<I, S>(&self, names: I) -> Result<Vec<ElementId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut found: IndexSet<ElementId> = IndexSet::new();
        for name in names {
            found.extend(self.graph.lookup_ids(Namespace::Bottom, name.as_ref())?);
        }
        Ok(found.into_iter().collect())
    }

    /// Returns the groups containing `element`.
    pub fn groups_of(&self, element: &T) -> Result<Vec<GroupId>> {
        let id = self.resolve(element)?;
        let associations = self.graph.associations_of(id);
        Ok(associations.top.into_iter().map(GroupId::from).collect())
    }

    /// Finds the handle of a stored element.
    ///
    /// A reference obtained from this manager resolves to exactly that
    /// element. Any other reference resolves to the first equal element.
    pub fn element_id(&self, element: &T) -> Option<ElementId> {
        let stored = |id: &ElementId| self.get(*id);
        self.graph
            .ids()
            .find(|id| matches!(stored(id), Some(value) if std::ptr::eq(value, element)))
            .or_else(|| {
                self.graph
                    .ids()
                    .find(|id| matches!(stored(id), Some(value) if value == element))
            })
    }

    fn resolve(&self, element: &T) -> Result<ElementId> {
        self.element_id(element)
            .ok_or(KeyError::Graph(GraphError::ElementNotFound))
    }

    /// Removes a group.
    ///
    /// The group id stops resolving. Members that belonged to no other group
    /// are deleted and returned; members shared with another group stay.
    pub fn remove_group(&mut self, id: &str) -> Result<Vec<T>> {
        let members = self
            .graph
            .remove_key(Namespace::Top, id)
            .map_err(|err| group_error(err, id))?;

        let orphaned: Vec<ElementId> = members
            .into_iter()
            .filter(|&member| !self.graph.has_keys(member, Namespace::Top))
            .collect();
        let removed: Vec<T> = orphaned
            .into_iter()
            .filter_map(|member| self.graph.remove(member))
            .map(Tagged::into_value)
            .collect();

        debug!("Removed group {} ({} elements deleted)", id, removed.len());
        Ok(removed)
    }
}

fn group_error(err: GraphError, id: &str) -> KeyError {
    match err {
        GraphError::KeyNotFound { .. } => KeyError::GroupNotFound(GroupId::from(id)),
        other => other.into(),
    }
}

fn keyed_by_name<'a, T: Named + 'a>(
    elements: impl ExactSizeIterator<Item = &'a T>,
) -> NamedElements<'a, T> {
    let mut named = IndexMap::with_capacity(elements.len());
    for element in elements {
        named.insert(element.name(), element);
    }
    named
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Module {
        name: &'static str,
        tag: u32,
    }

    impl Named for Module {
        fn name(&self) -> &str {
            self.name
        }
    }

    fn module(name: &'static str, tag: u32) -> Module {
        Module { name, tag }
    }

    fn manager() -> KeyManager<Module> {
        KeyManager::with_generator(GraphConfig::default(), SequentialIds::default())
    }

    #[test]
    fn test_add_group_returns_fresh_ids() {
        let mut manager = manager();
        let g1 = manager.add_group([module("a", 1)]).unwrap();
        let g2 = manager.add_group([module("b", 1)]).unwrap();

        assert_eq!(g1.as_str(), "g1");
        assert_eq!(g2.as_str(), "g2");
        assert_eq!(manager.groups().collect::<Vec<_>>(), vec!["g1", "g2"]);
    }

    #[test]
    fn test_group_keyed_by_name() {
        let mut manager = manager();
        let id = manager
            .add_group([module("mover", 1), module("renderer", 1)])
            .unwrap();

        let group = manager.group(id.as_str()).unwrap();
        assert_eq!(group.keys().copied().collect::<Vec<_>>(), vec!["mover", "renderer"]);
        assert_eq!(group["mover"], &module("mover", 1));
    }

    #[test]
    fn test_group_later_name_wins() {
        let mut manager = manager();
        let id = manager
            .add_group([module("mover", 1), module("mover", 2)])
            .unwrap();

        let group = manager.group(id.as_str()).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group["mover"].tag, 2);
    }

    #[test]
    fn test_empty_group() {
        let mut manager = manager();
        let id = manager.add_group(Vec::new()).unwrap();

        assert!(manager.group(id.as_str()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_group() {
        let manager = manager();
        assert_eq!(
            manager.group("g9").unwrap_err(),
            KeyError::GroupNotFound(GroupId::from("g9"))
        );
    }

    #[test]
    fn test_unnamed_element_gets_no_name_key() {
        let mut manager = manager();
        let id = manager.add_group([module("", 1), module("a", 1)]).unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.group(id.as_str()).unwrap().len(), 2);
        assert_eq!(manager.graph().keys(Namespace::Bottom).collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_siblings_share_name() {
        let mut manager = manager();
        manager.add_group([module("mover", 1), module("renderer", 1)]).unwrap();
        manager.add_group([module("mover", 2), module("logger", 1)]).unwrap();

        let siblings = manager.siblings(&module("mover", 1)).unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings["mover"].tag, 2);

        let via_query = manager
            .get_group(GroupQuery::Element(&module("mover", 2)))
            .unwrap();
        assert_eq!(via_query["mover"].tag, 1);

        assert!(manager.siblings(&module("logger", 1)).unwrap().is_empty());
    }

    #[test]
    fn test_get_group_by_id() {
        let mut manager = manager();
        let id = manager.add_group([module("a", 1)]).unwrap();

        let group = manager.get_group(GroupQuery::Id(id.as_str())).unwrap();
        assert!(group.contains_key("a"));
    }

    #[test]
    fn test_by_names_deduplicates() {
        let mut manager = manager();
        manager.add_group([module("mover", 1), module("renderer", 1)]).unwrap();
        manager.add_group([module("mover", 2)]).unwrap();

        let movers = manager.by_names(["mover", "mover"]).unwrap();
        assert_eq!(movers.len(), 2);

        let mixed = manager.by_names(vec!["renderer".to_string(), "mover".to_string()]).unwrap();
        assert_eq!(
            mixed.iter().map(|m| m.name).collect::<Vec<_>>(),
            vec!["renderer", "mover", "mover"]
        );
    }

    #[test]
    fn test_by_name_unknown() {
        let manager = manager();
        assert!(matches!(
            manager.by_name("ghost"),
            Err(KeyError::Graph(GraphError::KeyNotFound { .. }))
        ));
    }

    #[test]
    fn test_identical_elements_stay_separate() {
        let mut manager = manager();
        let g1 = manager.add_group([module("mover", 1), module("renderer", 1)]).unwrap();
        let g2 = manager.add_group([module("mover", 1), module("logger", 1)]).unwrap();

        assert_eq!(manager.len(), 4);
        assert_eq!(manager.by_names(["mover", "mover"]).unwrap().len(), 2);

        let removed = manager.remove_group(g1.as_str()).unwrap();
        assert_eq!(removed, vec![module("mover", 1), module("renderer", 1)]);
        assert_eq!(manager.by_name("mover").unwrap(), vec![&module("mover", 1)]);
        assert_eq!(manager.group(g2.as_str()).unwrap().len(), 2);
    }

    #[test]
    fn test_reference_resolves_to_its_own_element() {
        let mut manager = manager();
        let g1 = manager.add_group([module("mover", 1)]).unwrap();
        let g2 = manager.add_group([module("mover", 1)]).unwrap();

        let second = manager.group(g2.as_str()).unwrap()["mover"];
        assert_eq!(manager.groups_of(second).unwrap(), vec![g2]);

        let first = manager.group(g1.as_str()).unwrap()["mover"];
        assert_eq!(manager.groups_of(first).unwrap(), vec![g1.clone()]);
        assert_eq!(manager.groups_of(&module("mover", 1)).unwrap(), vec![g1]);
    }

    #[test]
    fn test_shared_element_joins_both_groups() {
        let mut manager = manager();
        let g1 = manager.add_group([module("mover", 1)]).unwrap();
        let g2 = manager.add_group([module("logger", 1)]).unwrap();

        let mover = manager.ids_by_names(["mover"]).unwrap()[0];
        manager.join_group(g2.as_str(), mover).unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.groups_of(&module("mover", 1)).unwrap(), vec![g1, g2]);
        assert_eq!(
            manager.join_group("g9", mover),
            Err(KeyError::GroupNotFound(GroupId::from("g9")))
        );
    }

    #[test]
    fn test_remove_group_deletes_unshared_members() {
        let mut manager = manager();
        let g1 = manager.add_group([module("mover", 1), module("shared", 1)]).unwrap();
        let g2 = manager.add_group([module("logger", 1)]).unwrap();
        let shared = manager.ids_by_names(["shared"]).unwrap()[0];
        manager.join_group(g2.as_str(), shared).unwrap();

        let removed = manager.remove_group(g1.as_str()).unwrap();

        assert_eq!(removed, vec![module("mover", 1)]);
        assert!(manager.group(g1.as_str()).is_err());
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.group(g2.as_str()).unwrap().len(), 2);
        assert!(manager.by_name("mover").unwrap().is_empty());
        assert_eq!(manager.groups_of(&module("shared", 1)).unwrap(), vec![g2]);
    }

    #[test]
    fn test_remove_unknown_group() {
        let mut manager = manager();
        assert_eq!(
            manager.remove_group("nope"),
            Err(KeyError::GroupNotFound(GroupId::from("nope")))
        );
    }

    #[test]
    fn test_from_config_uses_prefix() {
        let mut manager: KeyManager<Module> = KeyManager::from_config(ManagerConfig {
            id_prefix: Some("pkg".to_string()),
            ..ManagerConfig::default()
        });
        let id = manager.add_group([module("a", 1)]).unwrap();
        assert_eq!(id.as_str(), "pkg1");
    }

    #[test]
    fn test_config_from_json() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "id_prefix": "g", "warn_on_duplicate_key": false }"#)
                .unwrap();
        assert_eq!(config.id_prefix.as_deref(), Some("g"));
        assert!(!config.graph.warn_on_duplicate_key);
    }

    #[test]
    fn test_get_mut_through_ids() {
        let mut manager = manager();
        manager.add_group([module("mover", 1)]).unwrap();

        let ids = manager.ids_by_names(["mover"]).unwrap();
        manager.get_mut(ids[0]).unwrap().tag = 5;
        assert_eq!(manager.by_name("mover").unwrap()[0].tag, 5);
    }

    #[test]
    fn test_get_mut_into_equal_value_keeps_both() {
        let mut manager = manager();
        manager.add_group([module("a", 1), module("b", 1)]).unwrap();

        let b = manager.ids_by_names(["b"]).unwrap()[0];
        *manager.get_mut(b).unwrap() = module("a", 1);

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.by_name("a").unwrap().len(), 1);
        assert_eq!(manager.by_name("b").unwrap(), vec![&module("a", 1)]);
        assert_eq!(manager.iter().count(), 2);
    }

    /// Hands out the same id every time.
    struct FixedId;

    impl IdGenerator for FixedId {
        fn next_id(&mut self) -> GroupId {
            GroupId::from("fixed")
        }
    }

    fn count_warnings(f: impl FnOnce()) -> usize {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == tracing::Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn test_repeated_group_id_warns() {
        let warnings = count_warnings(|| {
            let mut manager = KeyManager::with_generator(GraphConfig::default(), FixedId);
            manager.add_group([module("a", 1)]).unwrap();
            manager.add_group([module("b", 1)]).unwrap();
            assert_eq!(manager.group("fixed").unwrap().len(), 2);
        });
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_repeated_group_id_warning_disabled() {
        let config = GraphConfig {
            warn_on_duplicate_key: false,
            ..GraphConfig::default()
        };
        let warnings = count_warnings(|| {
            let mut manager = KeyManager::with_generator(config, FixedId);
            manager.add_group([module("a", 1)]).unwrap();
            manager.add_group([module("b", 1)]).unwrap();
        });
        assert_eq!(warnings, 0);
    }
}
