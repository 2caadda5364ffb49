//! Mesh Merger
//!
//! Rebuilds all meshes as one mesh per `(shader, export flags)` pair. Every
//! triangle is copied with three fresh vertices, so destinations never share
//! vertices with each other or with their sources.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3, Vec4};

use crate::errors::Result;
use crate::scene::content::ContentTypeSet;
use crate::scene::mesh::Mesh;
use crate::scene::node::SceneNode;
use crate::scene::{Identifier, Scene};

/// A destination mesh under construction.
struct MergeTarget {
    id: Identifier,
    parent: Identifier,
    name: String,
    mesh: Mesh,
}

impl MergeTarget {
    fn new(id: Identifier, shader: Identifier, source: &Mesh, parent: Identifier) -> Self {
        let mesh = Mesh {
            shader_ids: vec![shader],
            shader_triangle_counts: vec![0],
            export_types: source.export_types,
            export_groups: source.export_groups.clone(),
            ..Mesh::default()
        };
        Self {
            id,
            parent,
            name: format!("merged_{shader}"),
            mesh,
        }
    }

    /// Appends triangle `tri` of `source` as three new vertices.
    ///
    /// Short attribute channels are zero-filled; a triangle indexing past the
    /// positions is dropped.
    fn push_triangle(&mut self, source: &Mesh, tri: usize) {
        let dest = &mut self.mesh;
        let lightmap = !source.lightmap_uvs.is_empty();
        let blend = !source.blend_uvs.is_empty();

        // a channel that appears late is back-filled so arrays stay parallel
        if lightmap && dest.lightmap_uvs.len() < dest.positions.len() {
            dest.lightmap_uvs.resize(dest.positions.len(), Vec2::ZERO);
        }
        if blend && dest.blend_uvs.len() < dest.positions.len() {
            dest.blend_uvs.resize(dest.positions.len(), Vec2::ZERO);
        }

        let corners = source.triangle(tri);
        if corners.iter().any(|&vertex| vertex >= source.positions.len()) {
            log::warn!("Skipping triangle {tri}: vertex index past {} position(s)", source.positions.len());
            return;
        }

        for vertex in corners {
            let new_index = dest.positions.len() as u32;
            dest.positions.push(source.positions[vertex]);
            dest.normals
                .push(source.normals.get(vertex).copied().unwrap_or(Vec3::ZERO));
            dest.colors
                .push(source.colors.get(vertex).copied().unwrap_or(Vec4::ONE));
            dest.base_uvs
                .push(source.base_uvs.get(vertex).copied().unwrap_or(Vec2::ZERO));
            if lightmap {
                dest.lightmap_uvs
                    .push(source.lightmap_uvs.get(vertex).copied().unwrap_or(Vec2::ZERO));
            } else if !dest.lightmap_uvs.is_empty() {
                dest.lightmap_uvs.push(Vec2::ZERO);
            }
            if blend {
                dest.blend_uvs
                    .push(source.blend_uvs.get(vertex).copied().unwrap_or(Vec2::ZERO));
            } else if !dest.blend_uvs.is_empty() {
                dest.blend_uvs.push(Vec2::ZERO);
            }
            dest.triangle_indices.push(new_index);
        }

        dest.shader_indices.push(0);
        dest.polygon_indices
            .push(source.polygon_indices.get(tri).copied().unwrap_or(tri as u32));
        dest.shader_triangle_counts[0] += 1;
    }
}

impl Scene {
    /// Merges every mesh into one mesh per `(shader, export flags)` pair.
    ///
    /// Sources are removed, destinations added under the parent of the first
    /// source that created them, then [`update`](Self::update) runs. Skins
    /// keep their references to removed sources.
    pub fn merge_meshes(&mut self) -> Result<()> {
        self.ensure_committed()?;

        let mut next_id = self.next_identifier().value();
        let mut targets: BTreeMap<(Identifier, ContentTypeSet), MergeTarget> = BTreeMap::new();
        let sources: Vec<Identifier> = self.meshes.iter().copied().collect();

        for &source_id in &sources {
            let Some(node) = self.nodes.get(&source_id) else {
                continue;
            };
            let Some(source) = node.as_mesh() else {
                continue;
            };

            for (shader_index, &shader) in source.shader_ids.iter().enumerate() {
                let key = (shader, source.export_types);
                let target = targets.entry(key).or_insert_with(|| {
                    let id = Identifier::new(next_id);
                    next_id += 1;
                    MergeTarget::new(id, shader, source, node.parent)
                });

                for tri in 0..source.triangle_count() {
                    if source.shader_indices.get(tri).copied() == Some(shader_index as u32) {
                        target.push_triangle(source, tri);
                    }
                }
            }

            // triangles without a valid shader slot are gathered under NULL
            let unassigned: Vec<usize> = (0..source.triangle_count())
                .filter(|&tri| {
                    source
                        .shader_indices
                        .get(tri)
                        .is_none_or(|&index| index as usize >= source.shader_ids.len())
                })
                .collect();
            if !unassigned.is_empty() {
                let key = (Identifier::NULL, source.export_types);
                let target = targets.entry(key).or_insert_with(|| {
                    let id = Identifier::new(next_id);
                    next_id += 1;
                    MergeTarget::new(id, Identifier::NULL, source, node.parent)
                });
                for tri in unassigned {
                    target.push_triangle(source, tri);
                }
            }
        }

        for &source_id in &sources {
            if let Some(node) = self.remove(source_id) {
                log::debug!("Removing mesh '{}' ({source_id})", node.name);
            }
        }

        for skin_id in self.skins() {
            if let Some(skin) = self.skin(skin_id)
                && sources.binary_search(&skin.mesh).is_ok()
            {
                log::debug!("Skin {skin_id} still refers to merged mesh {}", skin.mesh);
            }
        }

        for target in targets.into_values() {
            log::debug!(
                "Adding merged mesh '{}' with {} triangle(s)",
                target.name,
                target.mesh.triangle_count()
            );
            let node = SceneNode::mesh(target.id, target.mesh)
                .with_name(target.name)
                .with_parent(target.parent);
            self.add(node);
        }

        self.update()
    }
}
