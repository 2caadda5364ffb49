use std::collections::BTreeMap;

use crate::scene::{Identifier, Scene};

/// Morph targets of every mesh, grouped by target name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphTargetData {
    /// Target name → `(mesh, index into that mesh's morph_targets)`.
    pub targets: BTreeMap<String, Vec<(Identifier, usize)>>,
    /// Sum of the sparse delta counts over all targets.
    pub delta_count: usize,
}

impl MorphTargetData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }
}

impl Scene {
    /// Regroups the meshes' morph targets by name.
    pub fn collate_morph_targets(&mut self) {
        let mut data = MorphTargetData::default();
        for &id in &self.meshes {
            let Some(mesh) = self.mesh(id) else {
                continue;
            };
            for (index, target) in mesh.morph_targets.iter().enumerate() {
                data.targets
                    .entry(target.name.clone())
                    .or_default()
                    .push((id, index));
                data.delta_count += target.vertex_indices.len();
            }
        }
        self.morph_targets = data;
    }
}
