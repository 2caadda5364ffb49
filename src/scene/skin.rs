use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::scene::Identifier;

/// Parallel joint / weight arrays describing how one or more vertices deform.
///
/// Weights are in `[0, 1]` and need not sum to one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub joints: SmallVec<[Identifier; 4]>,
    pub weights: SmallVec<[f32; 4]>,
}

impl Influence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, joint: Identifier, weight: f32) -> Self {
        self.push(joint, weight);
        self
    }

    pub fn push(&mut self, joint: Identifier, weight: f32) {
        self.joints.push(joint);
        self.weights.push(weight);
    }

    /// `(joint, weight)` pairs; truncated to the shorter array.
    pub fn iter(&self) -> impl Iterator<Item = (Identifier, f32)> + '_ {
        self.joints.iter().copied().zip(self.weights.iter().copied())
    }

    /// Joints whose weight reaches `threshold`.
    pub fn significant(&self, threshold: f32) -> impl Iterator<Item = Identifier> + '_ {
        self.iter()
            .filter(move |&(_, weight)| weight >= threshold)
            .map(|(joint, _)| joint)
    }
}

/// Binds a mesh's vertices to joints.
///
/// `influence_indices[v]` selects the influence for vertex `v`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    pub mesh: Identifier,
    pub influences: Vec<Influence>,
    pub influence_indices: Vec<u32>,
}

impl Skin {
    #[must_use]
    pub fn new(mesh: Identifier) -> Self {
        Self {
            mesh,
            ..Self::default()
        }
    }

    /// The influence driving `vertex`, if the tables cover it.
    #[must_use]
    pub fn influence_for_vertex(&self, vertex: usize) -> Option<&Influence> {
        let index = *self.influence_indices.get(vertex)?;
        self.influences.get(index as usize)
    }

    /// Every joint referenced by any influence, duplicates included.
    pub fn referenced_joints(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.influences.iter().flat_map(|inf| inf.joints.iter().copied())
    }
}

/// A vertex position with its influences translated to dense joint indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinVertex {
    pub position: Vec3,
    pub joint_ids: SmallVec<[Identifier; 4]>,
    pub joints: SmallVec<[u32; 4]>,
    pub weights: SmallVec<[f32; 4]>,
}

impl SkinVertex {
    /// Rigid bind of `position` to a single joint at full weight.
    #[must_use]
    pub fn rigid(position: Vec3, joint_id: Identifier, joint: u32) -> Self {
        let mut v = Self {
            position,
            joint_ids: SmallVec::new(),
            joints: SmallVec::new(),
            weights: SmallVec::new(),
        };
        v.joint_ids.push(joint_id);
        v.joints.push(joint);
        v.weights.push(1.0);
        v
    }
}
