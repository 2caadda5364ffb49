//! Joint Ordering
//!
//! Computes a dense ordering of the joints needed at runtime such that every
//! joint comes after all of its joint ancestors, together with the mapping
//! between master (scene) identifiers and local identifiers.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::scene::node::NodeKind;
use crate::scene::{Identifier, Scene};

/// Ordered joint list with master ↔ local identifier maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointOrdering {
    joints: Vec<Identifier>,
    indices: FxHashMap<Identifier, u32>,
    master_to_local: FxHashMap<Identifier, Identifier>,
    local_to_master: FxHashMap<Identifier, Identifier>,
}

impl JointOrdering {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `joint` and returns its dense index. Re-adding returns the
    /// existing index.
    pub fn add_joint(&mut self, joint: Identifier) -> u32 {
        if let Some(&index) = self.indices.get(&joint) {
            return index;
        }
        let index = self.joints.len() as u32;
        self.joints.push(joint);
        self.indices.insert(joint, index);
        index
    }

    /// Records a master ↔ local identifier pair.
    pub fn insert_mapping(&mut self, master: Identifier, local: Identifier) {
        self.master_to_local.insert(master, local);
        self.local_to_master.insert(local, master);
    }

    #[must_use]
    pub fn joints(&self) -> &[Identifier] {
        &self.joints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, joint: Identifier) -> Option<u32> {
        self.indices.get(&joint).copied()
    }

    #[must_use]
    pub fn contains(&self, joint: Identifier) -> bool {
        self.indices.contains_key(&joint)
    }

    #[must_use]
    pub fn local_for_master(&self, master: Identifier) -> Option<Identifier> {
        self.master_to_local.get(&master).copied()
    }

    #[must_use]
    pub fn master_for_local(&self, local: Identifier) -> Option<Identifier> {
        self.local_to_master.get(&local).copied()
    }

    #[must_use]
    pub fn master_to_local(&self) -> &FxHashMap<Identifier, Identifier> {
        &self.master_to_local
    }

    #[must_use]
    pub fn local_to_master(&self) -> &FxHashMap<Identifier, Identifier> {
        &self.local_to_master
    }

    /// Joint identifier → dense index, in the shape the skinning export expects.
    #[must_use]
    pub fn index_map(&self) -> FxHashMap<Identifier, u32> {
        self.indices.clone()
    }
}

impl Scene {
    /// Rebuilds the joint ordering.
    ///
    /// Required joints are those with a significant skin weight, those
    /// parenting a collision primitive or effector, and every joint in the
    /// joint list together with its chain of joint ancestors. The result is
    /// sorted by hierarchy depth, then identifier.
    pub fn calculate_joint_ordering(&mut self) -> Result<()> {
        self.ensure_committed()?;

        let mut ordering = JointOrdering::new();
        let mut required = self.influential_joints();

        for &id in self.collision_primitives.iter().chain(&self.effectors) {
            if let Some(parent) = self.parent_of(id)
                && self.joints.contains(&parent)
            {
                required.insert(parent);
            }
        }

        for &joint in &self.joints {
            ordering.insert_mapping(joint, joint);
            required.insert(joint);

            let mut current = joint;
            while let Some(parent) = self.parent_of(current) {
                if !self.joints.contains(&parent) {
                    break;
                }
                required.insert(parent);
                current = parent;
            }
        }

        let mut sorted: Vec<(usize, Identifier)> = required
            .into_iter()
            .map(|joint| (self.hierarchy_depth(joint), joint))
            .collect();
        sorted.sort_unstable();

        for (_, joint) in sorted {
            ordering.add_joint(joint);
        }

        for &joint in &self.joints {
            if !ordering.contains(joint) {
                log::trace!("Joint not required: {joint}");
            }
        }

        log::debug!("Joint ordering holds {} joint(s)", ordering.len());
        self.joint_ordering = ordering;
        Ok(())
    }

    /// Joints carrying a weight at or above the skin weight threshold.
    ///
    /// References to identifiers that are not joints are ignored.
    #[must_use]
    pub fn influential_joints(&self) -> BTreeSet<Identifier> {
        let threshold = self.settings.skin_weight_threshold;
        let mut joints = BTreeSet::new();
        for &skin_id in &self.skins {
            let Some(skin) = self.skin(skin_id) else {
                continue;
            };
            for influence in &skin.influences {
                for joint in influence.significant(threshold) {
                    if self.joints.contains(&joint) {
                        joints.insert(joint);
                    } else {
                        log::debug!("Skin {skin_id} references missing joint {joint}");
                    }
                }
            }
        }
        joints
    }

    /// The joints animated by `clip` that exist in the scene.
    #[must_use]
    pub fn joints_from_clip(&self, clip: Identifier) -> Vec<Identifier> {
        match self.get(clip).map(|node| &node.kind) {
            Some(NodeKind::AnimationClip(clip)) => clip
                .joint_ids
                .iter()
                .copied()
                .filter(|id| self.joints.contains(id))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_joint_assigns_dense_indices() {
        let mut ordering = JointOrdering::new();
        assert_eq!(ordering.add_joint(Identifier::new(10)), 0);
        assert_eq!(ordering.add_joint(Identifier::new(7)), 1);
        assert_eq!(ordering.add_joint(Identifier::new(10)), 0);
        assert_eq!(ordering.len(), 2);
        assert_eq!(ordering.index_of(Identifier::new(7)), Some(1));
    }
}
