//! Lightmap readiness checks and area / texel density statistics.
//!
//! The sums run as parallel reductions over the mesh list.

use glam::Vec3;
use rayon::prelude::*;

use crate::scene::content::ContentType;
use crate::scene::mesh::{Mesh, UvSet};
use crate::scene::Scene;

impl Scene {
    fn par_meshes(&self) -> impl ParallelIterator<Item = &Mesh> {
        let ids: Vec<_> = self.meshes.iter().copied().collect();
        ids.into_par_iter().filter_map(move |id| self.mesh(id))
    }

    /// Every light-mapped mesh has lightmap UVs.
    #[must_use]
    pub fn lightmap_uvs_exist(&self) -> bool {
        self.meshes
            .iter()
            .filter_map(|&id| self.mesh(id))
            .filter(|mesh| mesh.has_export_type(ContentType::LightMapped))
            .all(Mesh::lightmap_uvs_exist)
    }

    /// Every light-mapped mesh keeps its lightmap UVs inside the unit square.
    #[must_use]
    pub fn lightmap_uvs_in_range(&self) -> bool {
        self.meshes
            .iter()
            .filter_map(|&id| self.mesh(id))
            .filter(|mesh| mesh.has_export_type(ContentType::LightMapped))
            .all(Mesh::lightmap_uvs_in_range)
    }

    /// Every mesh is either light-mapped or vertex-lit.
    #[must_use]
    pub fn meshes_are_classified_for_lighting(&self) -> bool {
        self.meshes.iter().filter_map(|&id| self.mesh(id)).all(|mesh| {
            mesh.has_export_type(ContentType::LightMapped) || mesh.has_export_type(ContentType::VertexLit)
        })
    }

    /// Summed area of the meshes flagged `ty`, positions scaled by `scale`.
    #[must_use]
    pub fn mesh_surface_area(&self, ty: ContentType, scale: Vec3) -> f32 {
        self.par_meshes()
            .filter(|mesh| mesh.has_export_type(ty))
            .map(|mesh| mesh.scaled_surface_area(scale))
            .sum()
    }

    /// Summed UV area of `set`; the lightmap set only counts light-mapped meshes.
    #[must_use]
    pub fn uv_surface_area(&self, set: UvSet) -> f32 {
        self.par_meshes()
            .filter(|mesh| set != UvSet::Lightmap || mesh.has_export_type(ContentType::LightMapped))
            .map(|mesh| mesh.uv_surface_area(set))
            .sum()
    }

    /// Lightmap texels per world unit over all light-mapped meshes, for a
    /// square lightmap of `1 << log_texture_size` texels.
    #[must_use]
    pub fn lightmap_texels_per_meter(&self, log_texture_size: u32, scale: Vec3) -> f32 {
        let (surface_area, uv_area) = self
            .par_meshes()
            .filter(|mesh| mesh.has_export_type(ContentType::LightMapped))
            .map(|mesh| {
                (
                    mesh.scaled_surface_area(scale),
                    mesh.uv_surface_area(UvSet::Lightmap),
                )
            })
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));
        texel_density(surface_area, uv_area, log_texture_size)
    }

    /// Mean of the per-mesh lightmap texel densities.
    #[must_use]
    pub fn average_lightmap_texels_per_meter(&self, log_texture_size: u32, scale: Vec3) -> f32 {
        let (total, count) = self
            .par_meshes()
            .filter(|mesh| mesh.has_export_type(ContentType::LightMapped))
            .map(|mesh| {
                let density = texel_density(
                    mesh.scaled_surface_area(scale),
                    mesh.uv_surface_area(UvSet::Lightmap),
                    log_texture_size,
                );
                (density, 1u32)
            })
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
        if count == 0 { 0.0 } else { total / count as f32 }
    }
}

fn texel_density(surface_area: f32, uv_area: f32, log_texture_size: u32) -> f32 {
    if surface_area <= 0.0 {
        return 0.0;
    }
    let texture_size = (1u64 << log_texture_size.min(31)) as f32;
    (uv_area * texture_size * texture_size / surface_area).sqrt()
}
