//! Bounding Volume Generation
//!
//! Per content type, gathers skinned vertex positions into buckets keyed by
//! `(joint, mesh group)` and by mesh group alone, then fits one sphere per
//! bucket. Spheres below the configured minimum radius are discarded.
//!
//! Gathering runs in parallel over skins; fitting runs in parallel over
//! buckets. Buckets are merged in skin order and results stored by key, so
//! the output does not depend on thread scheduling.

use std::collections::BTreeMap;

use glam::{Affine3A, Vec3};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SceneError};
use crate::scene::content::ContentType;
use crate::scene::mesh::Mesh;
use crate::scene::skin::SkinVertex;
use crate::scene::{Identifier, Scene};

pub mod fit;

use fit::{FitMode, PrincipalAxisFitter, SphereFitter};

// ============================================================================
// Primitive volumes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Tight box around `points`; `None` when empty.
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().fold(Self { min: first, max: first }, |acc, &p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut new_min = Vec3::splat(f32::INFINITY);
        let mut new_max = Vec3::splat(f32::NEG_INFINITY);
        for point in corners {
            let transformed = matrix.transform_point3(point);
            new_min = new_min.min(transformed);
            new_max = new_max.max(transformed);
        }

        Self {
            min: new_min,
            max: new_max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn contains(&self, point: Vec3, tolerance: f32) -> bool {
        point.distance(self.center) <= self.radius + tolerance
    }
}

/// A fitted sphere tagged with the mesh group it was built from.
///
/// `group_id` is `0` for every content type except `Bangle`, where it is the
/// bangle index plus one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSphere {
    pub sphere: BoundingSphere,
    pub group_id: i32,
}

// ============================================================================
// Bounding volume tables
// ============================================================================

/// Fitted spheres for every content type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingVolumes {
    per_joint: Vec<BTreeMap<Identifier, Vec<GroupSphere>>>,
    per_group: Vec<Vec<GroupSphere>>,
}

type JointBuckets = BTreeMap<(Identifier, i32), Vec<Vec3>>;
type GroupBuckets = BTreeMap<i32, Vec<Vec3>>;

impl BoundingVolumes {
    fn empty() -> Self {
        Self {
            per_joint: vec![BTreeMap::new(); ContentType::COUNT],
            per_group: vec![Vec::new(); ContentType::COUNT],
        }
    }

    /// Builds every table from the skins of `scene`.
    #[must_use]
    pub fn generate(scene: &Scene, fitter: &dyn SphereFitter) -> Self {
        let settings = scene.settings();
        let mut volumes = Self::empty();

        let skins: Vec<Identifier> = scene.skins().collect();

        for ty in ContentType::ALL {
            let (joint_buckets, group_buckets) = gather(scene, &skins, ty, settings.skin_weight_threshold);
            if joint_buckets.is_empty() && group_buckets.is_empty() {
                continue;
            }

            let joint_spheres = fit_buckets(joint_buckets.into_iter().collect(), fitter, settings.fit_mode);
            for ((joint, group_id), sphere) in joint_spheres {
                if sphere.radius < settings.min_sphere_radius {
                    log::trace!("Dropping {} sphere for joint {joint}: radius {}", ty.name(), sphere.radius);
                    continue;
                }
                volumes.per_joint[ty.index()]
                    .entry(joint)
                    .or_default()
                    .push(GroupSphere { sphere, group_id });
            }

            let group_spheres = fit_buckets(group_buckets.into_iter().collect(), fitter, settings.fit_mode);
            for (group_id, sphere) in group_spheres {
                if sphere.radius >= settings.min_sphere_radius {
                    volumes.per_group[ty.index()].push(GroupSphere { sphere, group_id });
                }
            }
        }

        volumes
    }

    /// Spheres recorded for `joint` under content type `ty`.
    #[must_use]
    pub fn for_joint(&self, joint: Identifier, ty: ContentType) -> &[GroupSphere] {
        self.per_joint
            .get(ty.index())
            .and_then(|table| table.get(&joint))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whole-group spheres recorded under content type `ty`.
    #[must_use]
    pub fn for_content_type(&self, ty: ContentType) -> &[GroupSphere] {
        self.per_group.get(ty.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Joints with at least one sphere under `ty`.
    pub fn joints(&self, ty: ContentType) -> impl Iterator<Item = Identifier> + '_ {
        self.per_joint
            .get(ty.index())
            .into_iter()
            .flat_map(|table| table.keys().copied())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_joint.iter().all(BTreeMap::is_empty) && self.per_group.iter().all(Vec::is_empty)
    }
}

/// Group id of `mesh` for content type `ty`.
fn group_id(mesh: &Mesh, ty: ContentType) -> i32 {
    if ty == ContentType::Bangle {
        mesh.export_group(ContentType::Bangle).unwrap_or(-1) + 1
    } else {
        0
    }
}

fn gather(scene: &Scene, skins: &[Identifier], ty: ContentType, threshold: f32) -> (JointBuckets, GroupBuckets) {
    // per-skin buckets are built in parallel and merged in skin order
    let per_skin: Vec<(JointBuckets, i32, &[Vec3])> = skins
        .par_iter()
        .filter_map(|&skin_id| {
            let skin = scene.skin(skin_id)?;
            let Some(mesh) = scene.mesh(skin.mesh) else {
                log::debug!("Skin {skin_id} references missing mesh {}", skin.mesh);
                return None;
            };
            if !mesh.has_export_type(ty) {
                return None;
            }
            let group = group_id(mesh, ty);

            let mut local: JointBuckets = BTreeMap::new();
            for (vertex, &position) in mesh.positions.iter().enumerate() {
                let Some(influence) = skin.influence_for_vertex(vertex) else {
                    continue;
                };
                for joint in influence.significant(threshold) {
                    if scene.joints.contains(&joint) {
                        local.entry((joint, group)).or_default().push(position);
                    }
                }
            }
            Some((local, group, mesh.positions.as_slice()))
        })
        .collect();

    let mut joint_buckets: JointBuckets = BTreeMap::new();
    let mut group_buckets: GroupBuckets = BTreeMap::new();
    for (local, group, positions) in per_skin {
        for (key, mut points) in local {
            joint_buckets.entry(key).or_default().append(&mut points);
        }
        group_buckets.entry(group).or_default().extend_from_slice(positions);
    }
    (joint_buckets, group_buckets)
}

fn fit_buckets<K: Send + Sync + Copy>(
    buckets: Vec<(K, Vec<Vec3>)>,
    fitter: &dyn SphereFitter,
    mode: FitMode,
) -> Vec<(K, BoundingSphere)> {
    buckets
        .par_iter()
        .filter_map(|(key, points)| fitter.fit(points, mode).map(|sphere| (*key, sphere)))
        .collect()
}

// ============================================================================
// Scene API
// ============================================================================

impl Scene {
    /// Rebuilds the bounding sphere tables with the default fitter.
    pub fn calculate_joint_bounding_volumes(&mut self) {
        self.calculate_joint_bounding_volumes_with(&PrincipalAxisFitter::default());
    }

    pub fn calculate_joint_bounding_volumes_with(&mut self, fitter: &dyn SphereFitter) {
        self.bounding_volumes = BoundingVolumes::generate(self, fitter);
    }

    #[must_use]
    pub fn bounding_volumes(&self) -> &BoundingVolumes {
        &self.bounding_volumes
    }

    /// Spheres fitted for `joint` under content type `ty`; empty when none.
    #[must_use]
    pub fn bounding_spheres_for_joint(&self, joint: Identifier, ty: ContentType) -> &[GroupSphere] {
        self.bounding_volumes.for_joint(joint, ty)
    }

    /// Whole-group spheres under content type `ty`; empty when none.
    #[must_use]
    pub fn bounding_spheres(&self, ty: ContentType) -> &[GroupSphere] {
        self.bounding_volumes.for_content_type(ty)
    }

    /// Skinned vertices with joint identifiers translated through `joint_index_map`.
    ///
    /// Produces one list per skin whose mesh exists (and carries `content_type`
    /// when given). A mesh with no mapped weight is bound rigidly to `root`.
    pub fn skin_vertices(
        &self,
        content_type: Option<ContentType>,
        joint_index_map: &FxHashMap<Identifier, u32>,
        root: Identifier,
    ) -> Result<Vec<Vec<SkinVertex>>> {
        let root_index = *joint_index_map
            .get(&root)
            .ok_or(SceneError::MissingRootJoint(root))?;

        let mut lists = Vec::new();
        for &skin_id in &self.skins {
            let Some(skin) = self.skin(skin_id) else {
                continue;
            };
            let Some(mesh) = self.mesh(skin.mesh) else {
                continue;
            };
            if content_type.is_some_and(|ty| !mesh.has_export_type(ty)) {
                continue;
            }

            let mut vertices = Vec::with_capacity(mesh.vertex_count());
            for (vertex, &position) in mesh.positions.iter().enumerate() {
                let Some(influence) = skin.influence_for_vertex(vertex) else {
                    continue;
                };
                let mut skin_vertex = SkinVertex {
                    position,
                    joint_ids: Default::default(),
                    joints: Default::default(),
                    weights: Default::default(),
                };
                for (joint, weight) in influence.iter() {
                    let Some(&index) = joint_index_map.get(&joint) else {
                        log::debug!("Joint {joint} missing from index map, influence skipped");
                        continue;
                    };
                    skin_vertex.joint_ids.push(joint);
                    skin_vertex.joints.push(index);
                    skin_vertex.weights.push(weight);
                }
                if !skin_vertex.joints.is_empty() {
                    vertices.push(skin_vertex);
                }
            }

            if vertices.is_empty() {
                log::debug!("Mesh {} has no mapped weights, binding rigidly to {root}", skin.mesh);
                vertices = mesh
                    .positions
                    .iter()
                    .map(|&position| SkinVertex::rigid(position, root, root_index))
                    .collect();
            }
            lists.push(vertices);
        }
        Ok(lists)
    }
}
