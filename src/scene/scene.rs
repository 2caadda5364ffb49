use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use crate::bounds::{BoundingBox, BoundingVolumes};
use crate::errors::{Result, SceneError};
use crate::scene::content::ContentType;
use crate::scene::hierarchy::HierarchyIndex;
use crate::scene::joint_ordering::JointOrdering;
use crate::scene::mesh::Mesh;
use crate::scene::morph::MorphTargetData;
use crate::scene::node::{Descriptor, NodeKind, SceneNode, Shader};
use crate::scene::skin::Skin;
use crate::scene::Identifier;
use crate::settings::ProcessorSettings;

/// The content scene: node store, hierarchy index and derived tables.
///
/// # Two-phase mutation
///
/// [`add`](Self::add) stores a node immediately but only *stages* its
/// hierarchy edge. [`commit`](Self::commit) (or [`update`](Self::update),
/// which commits first) applies staged edges. Passes that depend on the
/// hierarchy refuse to run while anything is staged.
///
/// # Side tables
///
/// Per-variant identifier sets (joints, meshes, skins, ...) are maintained by
/// `add` / `remove` so the passes can iterate one kind without scanning the
/// whole store. All of them are ordered, which keeps every pass deterministic.
#[derive(Debug, Default)]
pub struct Scene {
    pub(crate) nodes: BTreeMap<Identifier, SceneNode>,
    pub(crate) hierarchy: HierarchyIndex,
    staged: Vec<Identifier>,
    orphans: BTreeSet<Identifier>,

    // === Side tables ===
    pub(crate) transforms: BTreeSet<Identifier>,
    pub(crate) joints: BTreeSet<Identifier>,
    pub(crate) pivots: BTreeSet<Identifier>,
    pub(crate) descriptors: BTreeSet<Identifier>,
    pub(crate) meshes: BTreeSet<Identifier>,
    pub(crate) skins: BTreeSet<Identifier>,
    pub(crate) shaders: BTreeSet<Identifier>,
    pub(crate) animation_clips: BTreeSet<Identifier>,
    pub(crate) collision_primitives: BTreeSet<Identifier>,
    pub(crate) effectors: BTreeSet<Identifier>,

    // === Derived data ===
    typed_meshes: BTreeMap<(ContentType, i32), Vec<Identifier>>,
    pub(crate) joint_ordering: JointOrdering,
    pub(crate) morph_targets: MorphTargetData,
    pub(crate) bounding_volumes: BoundingVolumes,
    pub(crate) diagnostics: Vec<String>,

    pub(crate) settings: ProcessorSettings,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: ProcessorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ProcessorSettings {
        &mut self.settings
    }

    /// Drops every node and derived table. Settings are kept.
    pub fn reset(&mut self) {
        let settings = std::mem::take(&mut self.settings);
        *self = Self::with_settings(settings);
    }

    // ========================================================================
    // Node Store
    // ========================================================================

    /// Inserts `node` if its identifier is new.
    ///
    /// Hierarchy nodes are staged; their edge appears after the next commit.
    /// Returns `false` (and leaves the scene untouched) for duplicates.
    pub fn add(&mut self, node: SceneNode) -> bool {
        if node.id.is_null() {
            log::warn!("Ignoring {} '{}' with a NULL identifier", node.kind.type_name(), node.name);
            return false;
        }
        if self.nodes.contains_key(&node.id) {
            log::debug!("Node {} already in scene, add ignored", node.id);
            return false;
        }

        let id = node.id;
        self.side_table_mut(&node.kind).insert(id);
        if node.is_hierarchy() {
            self.staged.push(id);
        }
        self.nodes.insert(id, node);
        true
    }

    /// Removes a node and returns it.
    ///
    /// Children of a removed hierarchy node are re-parented to the removed
    /// node's parent, so the rest of the forest stays intact.
    pub fn remove(&mut self, id: Identifier) -> Option<SceneNode> {
        let node = self.nodes.remove(&id)?;

        self.side_table_mut(&node.kind).remove(&id);
        self.staged.retain(|&staged| staged != id);
        self.orphans.remove(&id);

        if node.is_hierarchy() {
            let new_parent = node.parent;
            let parent_resolves = self.resolves(new_parent);

            self.hierarchy.remove_edge(new_parent, id);
            for child in self.hierarchy.take_children(id) {
                if let Some(child_node) = self.nodes.get_mut(&child) {
                    child_node.parent = new_parent;
                    child_node.transform.mark_dirty();
                }
                if parent_resolves {
                    self.hierarchy.insert_edge(new_parent, child);
                } else if !new_parent.is_null() {
                    self.orphans.insert(child);
                }
            }

            // staged children have no edge yet, only the field
            for pending in self.staged.iter().chain(self.orphans.iter()) {
                if let Some(child_node) = self.nodes.get_mut(pending)
                    && child_node.parent == id
                {
                    child_node.parent = new_parent;
                }
            }
        }

        for list in self.typed_meshes.values_mut() {
            list.retain(|&mesh| mesh != id);
        }

        Some(node)
    }

    #[must_use]
    pub fn get(&self, id: Identifier) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: Identifier) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    #[inline]
    #[must_use]
    pub fn exists(&self, id: Identifier) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn mesh(&self, id: Identifier) -> Option<&Mesh> {
        self.nodes.get(&id).and_then(SceneNode::as_mesh)
    }

    pub fn mesh_mut(&mut self, id: Identifier) -> Option<&mut Mesh> {
        self.nodes.get_mut(&id).and_then(SceneNode::as_mesh_mut)
    }

    #[must_use]
    pub fn skin(&self, id: Identifier) -> Option<&Skin> {
        self.nodes.get(&id).and_then(SceneNode::as_skin)
    }

    /// The shader assigned to triangle `tri` of mesh `mesh`.
    #[must_use]
    pub fn shader_for_triangle(&self, mesh: Identifier, tri: usize) -> Option<&Shader> {
        let shader_id = self.mesh(mesh)?.shader_for_triangle(tri);
        match &self.nodes.get(&shader_id)?.kind {
            NodeKind::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    pub fn joints(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.joints.iter().copied()
    }

    pub fn meshes(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.meshes.iter().copied()
    }

    pub fn skins(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.skins.iter().copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.descriptors.iter().copied()
    }

    pub fn shaders(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.shaders.iter().copied()
    }

    pub fn pivots(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.pivots.iter().copied()
    }

    pub fn animation_clips(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.animation_clips.iter().copied()
    }

    /// One past the largest identifier in the store.
    #[must_use]
    pub fn next_identifier(&self) -> Identifier {
        let max = self.nodes.keys().next_back().map_or(0, |id| id.value());
        Identifier::new(max + 1)
    }

    fn side_table_mut(&mut self, kind: &NodeKind) -> &mut BTreeSet<Identifier> {
        match kind {
            NodeKind::Transform => &mut self.transforms,
            NodeKind::Joint => &mut self.joints,
            NodeKind::Pivot => &mut self.pivots,
            NodeKind::Descriptor(_) => &mut self.descriptors,
            NodeKind::Mesh(_) => &mut self.meshes,
            NodeKind::Skin(_) => &mut self.skins,
            NodeKind::Shader(_) => &mut self.shaders,
            NodeKind::AnimationClip(_) => &mut self.animation_clips,
            NodeKind::CollisionPrimitive(_) => &mut self.collision_primitives,
            NodeKind::Effector => &mut self.effectors,
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Applies every staged hierarchy edge.
    ///
    /// Nodes whose parent does not resolve stay roots and are retried on the
    /// next commit. A staged edge that would close a cycle is dropped: the
    /// node becomes a root and a diagnostic is recorded.
    pub fn commit(&mut self) {
        if self.staged.is_empty() && self.orphans.is_empty() {
            return;
        }

        let mut candidates = std::mem::take(&mut self.staged);
        candidates.extend(std::mem::take(&mut self.orphans));

        for id in candidates {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let parent = node.parent;
            if !node.is_hierarchy() || parent.is_null() {
                continue;
            }

            if !self.resolves(parent) {
                log::debug!("Parent {parent} of {id} does not resolve, treating as root");
                self.orphans.insert(id);
                continue;
            }

            if self.ancestor_chain_contains(parent, id) {
                let message = format!(
                    "Hierarchy cycle through '{}' ({id}); detached from parent {parent}",
                    node.name
                );
                log::warn!("{message}");
                self.diagnostics.push(message);
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.parent = Identifier::NULL;
                }
                continue;
            }

            self.hierarchy.insert_edge(parent, id);
        }
    }

    #[inline]
    #[must_use]
    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub(crate) fn ensure_committed(&self) -> Result<()> {
        if self.staged.is_empty() {
            Ok(())
        } else {
            Err(SceneError::Uncommitted {
                staged: self.staged.len(),
            })
        }
    }

    /// Whether `id` names a hierarchy node in the store.
    #[inline]
    #[must_use]
    pub fn resolves(&self, id: Identifier) -> bool {
        !id.is_null() && self.nodes.get(&id).is_some_and(SceneNode::is_hierarchy)
    }

    /// The resolved hierarchy parent of `id`.
    #[must_use]
    pub fn parent_of(&self, id: Identifier) -> Option<Identifier> {
        let parent = self.nodes.get(&id)?.parent;
        self.resolves(parent).then_some(parent)
    }

    #[must_use]
    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    #[must_use]
    pub fn children(&self, id: Identifier) -> &[Identifier] {
        self.hierarchy.children(id)
    }

    #[must_use]
    pub fn descendants(&self, id: Identifier) -> Vec<Identifier> {
        self.hierarchy.descendants(id)
    }

    /// Whether `child` lies anywhere beneath `parent`.
    #[must_use]
    pub fn is_child_of(&self, child: Identifier, parent: Identifier) -> bool {
        child != parent
            && self
                .parent_of(child)
                .is_some_and(|first| self.ancestor_chain_contains(first, parent))
    }

    /// Hierarchy nodes without a resolvable parent, in identifier order.
    #[must_use]
    pub fn roots(&self) -> Vec<Identifier> {
        self.nodes
            .values()
            .filter(|node| node.is_hierarchy() && !self.resolves(node.parent))
            .map(|node| node.id)
            .collect()
    }

    /// Number of resolvable ancestors of `id`.
    #[must_use]
    pub fn hierarchy_depth(&self, id: Identifier) -> usize {
        let mut depth = 0;
        let mut visited = FxHashSet::default();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent) {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Moves `child` under `parent` (NULL detaches it to a root).
    pub fn set_parent(&mut self, child: Identifier, parent: Identifier) -> Result<()> {
        if child == parent {
            log::warn!("Cannot parent node {child} to itself");
            return Err(SceneError::CycleDetected { child, parent });
        }
        let old_parent = match self.nodes.get(&child) {
            Some(node) if node.is_hierarchy() => node.parent,
            _ => return Err(SceneError::NodeNotFound(child)),
        };
        if !parent.is_null() {
            if !self.resolves(parent) {
                return Err(SceneError::NodeNotFound(parent));
            }
            if self.ancestor_chain_contains(parent, child) {
                return Err(SceneError::CycleDetected { child, parent });
            }
        }

        self.hierarchy.remove_edge(old_parent, child);
        self.orphans.remove(&child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
            node.transform.mark_dirty();
        }
        if self.resolves(parent) {
            self.hierarchy.insert_edge(parent, child);
        }
        Ok(())
    }

    /// Whether walking up from `start` (inclusive) reaches `target`.
    fn ancestor_chain_contains(&self, start: Identifier, target: Identifier) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = start;
        while self.resolves(current) && visited.insert(current) {
            if current == target {
                return true;
            }
            current = self.nodes.get(&current).map_or(Identifier::NULL, |n| n.parent);
        }
        false
    }

    /// Whether the index matches one rebuilt from the `parent` fields.
    #[must_use]
    pub fn check_hierarchy(&self) -> bool {
        let mut rebuilt = HierarchyIndex::new();
        rebuilt.rebuild(self.nodes.values(), |id| self.resolves(id));
        rebuilt.canonical() == self.hierarchy.canonical()
    }

    /// Discards the index and rebuilds it from the `parent` fields.
    pub fn rebuild_hierarchy(&mut self) {
        let mut rebuilt = HierarchyIndex::new();
        rebuilt.rebuild(self.nodes.values(), |id| self.resolves(id));
        self.hierarchy = rebuilt;
    }

    // ========================================================================
    // Update & export classification
    // ========================================================================

    /// Commits staged nodes and refreshes every derived table.
    pub fn update(&mut self) -> Result<()> {
        self.commit();
        self.update_export_data()?;
        self.calculate_joint_ordering()?;
        self.collate_morph_targets();
        Ok(())
    }

    /// Stamps each descriptor's export type and group on the meshes beneath it.
    ///
    /// Collision descriptors also flag the collision primitives beneath them.
    pub fn update_export_data(&mut self) -> Result<()> {
        self.ensure_committed()?;

        let descriptors: Vec<(Identifier, Descriptor)> = self
            .descriptors
            .iter()
            .filter_map(|&id| self.nodes.get(&id)?.as_descriptor().map(|d| (id, *d)))
            .collect();

        for (descriptor_id, descriptor) in descriptors {
            for id in self.hierarchy.descendants(descriptor_id) {
                let Some(node) = self.nodes.get_mut(&id) else {
                    continue;
                };
                match &mut node.kind {
                    NodeKind::Mesh(mesh) => {
                        mesh.set_export_type(descriptor.export_type, descriptor.content_num);
                    }
                    NodeKind::CollisionPrimitive(prim) if descriptor.export_type.is_collision() => {
                        prim.export_types.insert(descriptor.export_type.flag());
                    }
                    _ => {}
                }
            }
        }

        self.rebuild_typed_meshes();
        Ok(())
    }

    fn rebuild_typed_meshes(&mut self) {
        self.typed_meshes.clear();
        for &id in &self.meshes {
            let Some(mesh) = self.nodes.get(&id).and_then(SceneNode::as_mesh) else {
                continue;
            };
            for ty in mesh.export_types.types() {
                let group = mesh.export_group(ty).unwrap_or(-1);
                self.typed_meshes.entry((ty, group)).or_default().push(id);
            }
        }
    }

    /// Meshes classified as `ty` in group `group` (`None` matches any group).
    ///
    /// `ContentType::Default` matches every type.
    #[must_use]
    pub fn meshes_by_type(&self, ty: ContentType, group: Option<i32>) -> Vec<Identifier> {
        if ty == ContentType::Default && group.is_none() {
            return self.meshes.iter().copied().collect();
        }
        let mut out: Vec<Identifier> = self
            .typed_meshes
            .iter()
            .filter(|((t, g), _)| {
                (ty == ContentType::Default || *t == ty) && group.is_none_or(|want| want == *g)
            })
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// One message per bangle descriptor whose content number repeats.
    #[must_use]
    pub fn duplicate_bangle_indices(&self) -> Vec<String> {
        let mut seen: BTreeMap<i32, Identifier> = BTreeMap::new();
        let mut messages = Vec::new();
        for &id in &self.descriptors {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let Some(descriptor) = node.as_descriptor() else {
                continue;
            };
            if descriptor.export_type != ContentType::Bangle {
                continue;
            }
            if let Some(first) = seen.get(&descriptor.content_num) {
                messages.push(format!(
                    "Bangle descriptor '{}' ({id}) reuses index {} already taken by {first}",
                    node.name, descriptor.content_num
                ));
            } else {
                seen.insert(descriptor.content_num, id);
            }
        }
        messages
    }

    /// Flags every non-foliage render geometry mesh as high-res collision.
    pub fn set_render_geometry_to_collision(&mut self) {
        for &id in &self.meshes {
            let Some(mesh) = self.nodes.get_mut(&id).and_then(SceneNode::as_mesh_mut) else {
                continue;
            };
            if mesh.has_export_type(ContentType::Geometry) && !mesh.has_export_type(ContentType::Foliage) {
                let group = mesh.export_group(ContentType::Geometry).unwrap_or(-1);
                mesh.set_export_type(ContentType::HighResCollision, group);
            }
        }
        self.rebuild_typed_meshes();
    }

    /// Union of the bounding boxes of every mesh, in mesh space.
    #[must_use]
    pub fn aligned_bounding_box(&self) -> Option<BoundingBox> {
        self.meshes
            .iter()
            .filter_map(|&id| self.mesh(id)?.aligned_bounding_box())
            .reduce(|a, b| a.union(&b))
    }

    // ========================================================================
    // Derived data access
    // ========================================================================

    #[must_use]
    pub fn joint_ordering(&self) -> &JointOrdering {
        &self.joint_ordering
    }

    #[must_use]
    pub fn morph_targets(&self) -> &MorphTargetData {
        &self.morph_targets
    }

    /// User-facing messages recorded by commits and passes.
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }
}
