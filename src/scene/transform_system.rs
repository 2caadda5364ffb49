//! Transform System
//!
//! Propagates global matrices down the hierarchy. Kept apart from the rest of
//! [`Scene`] so it only borrows the node store and the hierarchy index.

use std::collections::BTreeMap;

use glam::Affine3A;

use crate::scene::hierarchy::HierarchyIndex;
use crate::scene::node::SceneNode;
use crate::scene::{Identifier, Scene};

/// Recomputes global matrices for every node reachable from `roots`.
///
/// Uses an explicit stack so deep hierarchies cannot overflow the call stack.
/// A node's global is only rewritten when its own TRS or an ancestor changed,
/// unless `force` is set.
pub fn update_hierarchy_iterative(
    nodes: &mut BTreeMap<Identifier, SceneNode>,
    hierarchy: &HierarchyIndex,
    roots: &[Identifier],
    force: bool,
) {
    // (node, parent global, parent changed)
    let mut stack: Vec<(Identifier, Affine3A, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, Affine3A::IDENTITY, force));
    }

    while let Some((id, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(&id) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world * *node.transform.local_matrix();
            node.transform.set_world_matrix(new_world);
        }

        let current_world = *node.transform.world_matrix();
        for &child in hierarchy.children(id).iter().rev() {
            stack.push((child, current_world, world_needs_update));
        }
    }
}

impl Scene {
    /// Refreshes the cached global matrix of every hierarchy node.
    pub fn update_global_transforms(&mut self) {
        let roots = self.roots();
        update_hierarchy_iterative(&mut self.nodes, &self.hierarchy, &roots, true);
    }

    /// Global matrix of `id` composed from the `parent` fields, ignoring caches.
    #[must_use]
    pub fn compute_global_matrix(&self, id: Identifier) -> Affine3A {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if chain.contains(&node_id) {
                break;
            }
            chain.push(node_id);
            current = self.parent_of(node_id);
        }

        chain.iter().rev().fold(Affine3A::IDENTITY, |acc, node_id| {
            self.get(*node_id)
                .map_or(acc, |node| acc * node.transform.compute_local_matrix())
        })
    }
}
