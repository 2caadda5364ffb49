use glam::Vec2;

use crate::scene::content::ContentType;
use crate::scene::mesh::{Mesh, UvSet};
use crate::scene::{Identifier, Scene};

/// The UV triangles of one mesh, three consecutive coordinates per triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvShell {
    pub mesh: Identifier,
    pub uvs: Vec<Vec2>,
}

impl UvShell {
    /// Triangle-expanded UVs of `set`, or `None` when the set is absent or
    /// too short for the mesh's triangle indices.
    #[must_use]
    pub fn from_mesh(id: Identifier, mesh: &Mesh, set: UvSet) -> Option<Self> {
        let source = mesh.uvs(set);
        if source.is_empty() {
            return None;
        }
        let mut uvs = Vec::with_capacity(mesh.triangle_indices.len());
        for &index in &mesh.triangle_indices {
            let Some(&uv) = source.get(index as usize) else {
                log::warn!("Mesh {id} indexes past its {set:?} UVs, shell skipped");
                return None;
            };
            uvs.push(uv);
        }
        Some(Self { mesh: id, uvs })
    }

    /// Builds a shell straight from triangle-expanded coordinates.
    #[must_use]
    pub fn from_triangles(triangles: &[[Vec2; 3]]) -> Self {
        Self {
            mesh: Identifier::NULL,
            uvs: triangles.iter().flatten().copied().collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.uvs.len() / 3
    }

    #[inline]
    #[must_use]
    pub fn triangle(&self, tri: usize) -> [Vec2; 3] {
        let base = tri * 3;
        [self.uvs[base], self.uvs[base + 1], self.uvs[base + 2]]
    }
}

impl Scene {
    /// One shell per mesh that carries `set`.
    ///
    /// The lightmap set only yields shells for meshes classified `LightMapped`.
    #[must_use]
    pub fn uv_shells(&self, set: UvSet) -> Vec<UvShell> {
        self.meshes
            .iter()
            .filter_map(|&id| {
                let mesh = self.mesh(id)?;
                if set == UvSet::Lightmap && !mesh.has_export_type(ContentType::LightMapped) {
                    return None;
                }
                UvShell::from_mesh(id, mesh, set)
            })
            .collect()
    }
}
