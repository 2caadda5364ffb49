//! Hierarchy Index
//!
//! A derived parent → children index over the node store. The `parent` field
//! of each [`SceneNode`] stays authoritative; this index only accelerates
//! child and descendant queries and can always be rebuilt from the fields.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::scene::node::SceneNode;
use crate::scene::Identifier;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyIndex {
    children: FxHashMap<Identifier, Vec<Identifier>>,
    /// Every `(parent, child)` edge, for constant-time duplicate checks.
    edges: FxHashSet<(Identifier, Identifier)>,
}

impl HierarchyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct children of `parent`, in insertion order.
    #[must_use]
    pub fn children(&self, parent: Identifier) -> &[Identifier] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records the edge `parent → child`. Duplicate edges are ignored.
    pub fn insert_edge(&mut self, parent: Identifier, child: Identifier) {
        if self.edges.insert((parent, child)) {
            self.children.entry(parent).or_default().push(child);
        }
    }

    pub fn remove_edge(&mut self, parent: Identifier, child: Identifier) {
        if !self.edges.remove(&(parent, child)) {
            return;
        }
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|&c| c != child);
            if list.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Drops the child list of `parent` and returns it.
    pub fn take_children(&mut self, parent: Identifier) -> Vec<Identifier> {
        let list = self.children.remove(&parent).unwrap_or_default();
        for &child in &list {
            self.edges.remove(&(parent, child));
        }
        list
    }

    /// All descendants of `root`, depth first, without `root` itself.
    ///
    /// Walks iteratively and never visits a node twice.
    #[must_use]
    pub fn descendants(&self, root: Identifier) -> Vec<Identifier> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        visited.insert(root);

        let mut stack: Vec<Identifier> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.edges.clear();
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Rebuilds the index from the authoritative `parent` fields.
    ///
    /// Edges are only created when the parent resolves to a hierarchy node.
    /// Children are ordered by identifier.
    pub fn rebuild<'a>(
        &mut self,
        nodes: impl IntoIterator<Item = &'a SceneNode>,
        resolve: impl Fn(Identifier) -> bool,
    ) {
        self.clear();
        for node in nodes {
            if node.is_hierarchy() && resolve(node.parent) {
                self.insert_edge(node.parent, node.id);
            }
        }
        for list in self.children.values_mut() {
            list.sort_unstable();
        }
    }

    /// Canonical `(parent, sorted children)` view, for comparing indices.
    #[must_use]
    pub fn canonical(&self) -> BTreeMap<Identifier, Vec<Identifier>> {
        self.children
            .iter()
            .map(|(&parent, list)| {
                let mut sorted = list.clone();
                sorted.sort_unstable();
                (parent, sorted)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> Identifier {
        Identifier::new(v)
    }

    #[test]
    fn descendants_are_depth_first() {
        let mut index = HierarchyIndex::new();
        index.insert_edge(id(1), id(2));
        index.insert_edge(id(2), id(3));
        index.insert_edge(id(1), id(4));
        assert_eq!(index.descendants(id(1)), vec![id(2), id(3), id(4)]);
    }

    #[test]
    fn descendants_terminate_on_cycles() {
        let mut index = HierarchyIndex::new();
        index.insert_edge(id(1), id(2));
        index.insert_edge(id(2), id(1));
        assert_eq!(index.descendants(id(1)), vec![id(2)]);
    }

    #[test]
    fn remove_last_edge_drops_entry() {
        let mut index = HierarchyIndex::new();
        index.insert_edge(id(1), id(2));
        index.insert_edge(id(1), id(2));
        assert_eq!(index.edge_count(), 1);
        index.remove_edge(id(1), id(2));
        assert!(index.children(id(1)).is_empty());
        assert_eq!(index, HierarchyIndex::new());
    }

    #[test]
    fn wide_fan_out_keeps_insertion_order() {
        let mut index = HierarchyIndex::new();
        for child in (2..5002).rev() {
            index.insert_edge(id(1), id(child));
            index.insert_edge(id(1), id(child));
        }
        assert_eq!(index.edge_count(), 5000);
        assert_eq!(index.children(id(1)).first(), Some(&id(5001)));

        let taken = index.take_children(id(1));
        assert_eq!(taken.len(), 5000);
        assert_eq!(index.edge_count(), 0);
        index.insert_edge(id(1), id(2));
        assert_eq!(index.children(id(1)), &[id(2)]);
    }
}
