use std::collections::BTreeMap;

use glam::{Affine3A, Mat3, Vec2, Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::scene::content::{ContentType, ContentTypeSet};
use crate::scene::Identifier;

/// Which UV channel of a mesh to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UvSet {
    Base,
    Blend,
    Lightmap,
}

/// Sparse per-vertex deltas of a named blend shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MorphTarget {
    pub name: String,
    pub vertex_indices: Vec<u32>,
    pub position_deltas: Vec<Vec3>,
    #[serde(default)]
    pub normal_deltas: Vec<Vec3>,
}

/// Triangle mesh payload of a mesh node.
///
/// Vertex channels are parallel arrays indexed by vertex. `normals`,
/// `colors` and the UV sets may be empty when the channel is absent.
/// Triangle tables (`shader_indices`, `polygon_indices`) are indexed by
/// triangle; `shader_triangle_counts` is parallel to `shader_ids`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mesh {
    // === Vertex channels ===
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    pub base_uvs: Vec<Vec2>,
    pub blend_uvs: Vec<Vec2>,
    pub lightmap_uvs: Vec<Vec2>,

    // === Triangle tables ===
    pub triangle_indices: Vec<u32>,
    pub shader_indices: Vec<u32>,
    pub polygon_indices: Vec<u32>,

    // === Shader tables ===
    pub shader_ids: Vec<Identifier>,
    pub shader_triangle_counts: Vec<u32>,

    // === Export classification ===
    pub export_types: ContentTypeSet,
    pub export_groups: BTreeMap<ContentType, i32>,

    pub morph_targets: Vec<MorphTarget>,
}

impl Mesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }

    /// Vertex indices of triangle `tri`.
    #[inline]
    #[must_use]
    pub fn triangle(&self, tri: usize) -> [usize; 3] {
        let base = tri * 3;
        [
            self.triangle_indices[base] as usize,
            self.triangle_indices[base + 1] as usize,
            self.triangle_indices[base + 2] as usize,
        ]
    }

    /// The shader identifier assigned to triangle `tri`, NULL if unassigned.
    #[must_use]
    pub fn shader_for_triangle(&self, tri: usize) -> Identifier {
        self.shader_indices
            .get(tri)
            .and_then(|&index| self.shader_ids.get(index as usize))
            .copied()
            .unwrap_or(Identifier::NULL)
    }

    #[must_use]
    pub fn uvs(&self, set: UvSet) -> &[Vec2] {
        match set {
            UvSet::Base => &self.base_uvs,
            UvSet::Blend => &self.blend_uvs,
            UvSet::Lightmap => &self.lightmap_uvs,
        }
    }

    // ========================================================================
    // Export classification
    // ========================================================================

    /// Sets the flag for `ty` and records its group index.
    pub fn set_export_type(&mut self, ty: ContentType, group: i32) {
        self.export_types.insert(ty.flag());
        self.export_groups.insert(ty, group);
    }

    #[inline]
    #[must_use]
    pub fn has_export_type(&self, ty: ContentType) -> bool {
        self.export_types.has(ty)
    }

    /// Group index recorded for `ty`; `-1` if flagged without a group.
    #[must_use]
    pub fn export_group(&self, ty: ContentType) -> Option<i32> {
        if !self.has_export_type(ty) {
            return None;
        }
        Some(self.export_groups.get(&ty).copied().unwrap_or(-1))
    }

    // ========================================================================
    // Measurements
    // ========================================================================

    /// Total triangle area. NaN contributions and triangles indexing past the
    /// positions are skipped.
    #[must_use]
    pub fn surface_area(&self) -> f32 {
        self.scaled_surface_area(Vec3::ONE)
    }

    /// Total triangle area with positions scaled per axis by `scale`.
    #[must_use]
    pub fn scaled_surface_area(&self, scale: Vec3) -> f32 {
        (0..self.triangle_count())
            .filter_map(|tri| {
                let [a, b, c] = corners(&self.positions, self.triangle(tri))?;
                let e1 = (b - a) * scale;
                let e2 = (c - a) * scale;
                Some(e1.cross(e2).length() * 0.5)
            })
            .filter(|area| !area.is_nan())
            .sum()
    }

    /// Total triangle area in the given UV set; zero when the set is absent.
    /// Triangles indexing past a short channel are skipped.
    #[must_use]
    pub fn uv_surface_area(&self, set: UvSet) -> f32 {
        let uvs = self.uvs(set);
        if uvs.is_empty() {
            return 0.0;
        }
        (0..self.triangle_count())
            .filter_map(|tri| {
                let [a, b, c] = corners(uvs, self.triangle(tri))?;
                Some((b - a).perp_dot(c - a).abs() * 0.5)
            })
            .filter(|area| !area.is_nan())
            .sum()
    }

    #[inline]
    #[must_use]
    pub fn lightmap_uvs_exist(&self) -> bool {
        !self.lightmap_uvs.is_empty()
    }

    /// Whether every lightmap UV lies inside the unit square.
    #[must_use]
    pub fn lightmap_uvs_in_range(&self) -> bool {
        self.lightmap_uvs
            .iter()
            .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y))
    }

    #[must_use]
    pub fn aligned_bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.positions)
    }

    // ========================================================================
    // Geometry edits
    // ========================================================================

    /// Transforms positions by `matrix` and normals by its inverse-transpose.
    ///
    /// Normals are renormalized afterwards. Morph deltas are transformed as
    /// directions.
    pub fn bake_transform(&mut self, matrix: &Affine3A) {
        let linear = Mat3::from(matrix.matrix3);
        let normal_matrix = if linear.determinant().abs() > f32::EPSILON {
            linear.inverse().transpose()
        } else {
            linear
        };

        self.positions
            .par_iter_mut()
            .for_each(|p| *p = matrix.transform_point3(*p));
        self.normals
            .par_iter_mut()
            .for_each(|n| *n = (normal_matrix * *n).normalize_or_zero());

        for target in &mut self.morph_targets {
            for delta in &mut target.position_deltas {
                *delta = matrix.transform_vector3(*delta);
            }
            for delta in &mut target.normal_deltas {
                *delta = normal_matrix * *delta;
            }
        }
    }
}

/// The three attribute values of a triangle, `None` when the channel is short.
fn corners<T: Copy>(channel: &[T], [a, b, c]: [usize; 3]) -> Option<[T; 3]> {
    Some([*channel.get(a)?, *channel.get(b)?, *channel.get(c)?])
}
