//! Bounding Volume tests
//!
//! Tests for:
//! - Per-joint and per-group sphere tables per content type
//! - Minimum radius filtering and weight threshold
//! - Bangle group identifiers
//! - Skin vertex translation and rigid fallback
//! - Custom sphere fitters

use content_scene::bounds::fit::{FitMode, PrincipalAxisFitter, SphereFitter};
use content_scene::bounds::{BoundingBox, BoundingSphere};
use content_scene::errors::SceneError;
use content_scene::scene::skin::{Influence, Skin};
use content_scene::scene::{ContentType, Identifier, Mesh, Scene, SceneNode};
use content_scene::settings::ProcessorSettings;
use glam::{Affine3A, Vec3};
use rustc_hash::FxHashMap;

// ============================================================================
// Helpers
// ============================================================================

const EPSILON: f32 = 1e-4;

fn id(value: u64) -> Identifier {
    Identifier::new(value)
}

/// Unit cube corners flagged `ty` in `group`.
fn cube_mesh(ty: ContentType, group: i32, offset: Vec3) -> Mesh {
    let mut positions = Vec::new();
    for x in [0.0, 1.0] {
        for y in [0.0, 1.0] {
            for z in [0.0, 1.0] {
                positions.push(Vec3::new(x, y, z) + offset);
            }
        }
    }
    let mut mesh = Mesh {
        positions,
        triangle_indices: vec![0, 1, 2, 1, 3, 2],
        ..Mesh::default()
    };
    mesh.set_export_type(ty, group);
    mesh
}

fn add_skinned(scene: &mut Scene, mesh_id: u64, mesh: Mesh, influences: Vec<Influence>, indices: Vec<u32>) {
    let mut skin = Skin::new(id(mesh_id));
    skin.influences = influences;
    skin.influence_indices = indices;
    scene.add(SceneNode::mesh(id(mesh_id), mesh));
    scene.add(SceneNode::skin(id(mesh_id + 1000), skin));
}

fn joints(scene: &mut Scene, ids: &[u64]) {
    let mut parent = Identifier::NULL;
    for &joint in ids {
        scene.add(SceneNode::joint(id(joint)).with_parent(parent));
        parent = id(joint);
    }
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn joint_sphere_encloses_its_vertices() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1]);
    let mesh = cube_mesh(ContentType::Geometry, 0, Vec3::ZERO);
    add_skinned(&mut scene, 10, mesh, vec![Influence::new().with(id(1), 1.0)], vec![0; 8]);
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes();

    let spheres = scene.bounding_spheres_for_joint(id(1), ContentType::Geometry);
    assert_eq!(spheres.len(), 1);
    assert_eq!(spheres[0].group_id, 0);
    let sphere = spheres[0].sphere;
    let corner = Vec3::ONE;
    assert!(sphere.contains(corner, EPSILON));
    assert!(sphere.contains(Vec3::ZERO, EPSILON));
    assert!(sphere.radius >= 3.0_f32.sqrt() * 0.5 - EPSILON);

    assert_eq!(scene.bounding_spheres(ContentType::Geometry).len(), 1);
    assert!(scene.bounding_spheres_for_joint(id(1), ContentType::Bangle).is_empty());
}

#[test]
fn low_weights_do_not_reach_joint_buckets() {
    let mut scene = Scene::with_settings(ProcessorSettings::new().with_skin_weight_threshold(0.5));
    joints(&mut scene, &[1, 2]);
    let mesh = cube_mesh(ContentType::Geometry, 0, Vec3::ZERO);
    let influence = Influence::new().with(id(1), 0.8).with(id(2), 0.2);
    add_skinned(&mut scene, 10, mesh, vec![influence], vec![0; 8]);
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes();

    assert_eq!(scene.bounding_spheres_for_joint(id(1), ContentType::Geometry).len(), 1);
    assert!(scene.bounding_spheres_for_joint(id(2), ContentType::Geometry).is_empty());
    let with_spheres: Vec<_> = scene.bounding_volumes().joints(ContentType::Geometry).collect();
    assert_eq!(with_spheres, vec![id(1)]);
}

#[test]
fn tiny_spheres_are_discarded() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1, 2]);
    let mut mesh = cube_mesh(ContentType::Geometry, 0, Vec3::ZERO);
    // joint 2 only drives a single vertex
    mesh.positions.push(Vec3::splat(0.5));
    let mut indices = vec![0; 8];
    indices.push(1);
    add_skinned(
        &mut scene,
        10,
        mesh,
        vec![Influence::new().with(id(1), 1.0), Influence::new().with(id(2), 1.0)],
        indices,
    );
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes();

    assert!(scene.bounding_spheres_for_joint(id(2), ContentType::Geometry).is_empty());
    assert_eq!(scene.bounding_spheres_for_joint(id(1), ContentType::Geometry).len(), 1);
    for ty in ContentType::ALL {
        for group in scene.bounding_spheres(ty) {
            assert!(group.sphere.radius >= scene.settings().min_sphere_radius);
        }
    }
}

#[test]
fn bangle_spheres_carry_index_plus_one() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1]);
    add_skinned(
        &mut scene,
        10,
        cube_mesh(ContentType::Bangle, 0, Vec3::ZERO),
        vec![Influence::new().with(id(1), 1.0)],
        vec![0; 8],
    );
    add_skinned(
        &mut scene,
        20,
        cube_mesh(ContentType::Bangle, 3, Vec3::new(5.0, 0.0, 0.0)),
        vec![Influence::new().with(id(1), 1.0)],
        vec![0; 8],
    );
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes();

    let mut groups: Vec<i32> = scene
        .bounding_spheres_for_joint(id(1), ContentType::Bangle)
        .iter()
        .map(|s| s.group_id)
        .collect();
    groups.sort_unstable();
    assert_eq!(groups, vec![1, 4]);

    let mut whole: Vec<i32> = scene
        .bounding_spheres(ContentType::Bangle)
        .iter()
        .map(|s| s.group_id)
        .collect();
    whole.sort_unstable();
    assert_eq!(whole, vec![1, 4]);
}

#[test]
fn skins_without_content_produce_nothing() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1]);
    let mut skin = Skin::new(id(55));
    skin.influences = vec![Influence::new().with(id(1), 1.0)];
    skin.influence_indices = vec![0; 3];
    scene.add(SceneNode::skin(id(56), skin));
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes();
    assert!(scene.bounding_volumes().is_empty());
}

#[test]
fn generation_is_deterministic() {
    let build = || {
        let mut scene = Scene::new();
        joints(&mut scene, &[1, 2, 3]);
        for (n, joint) in [(10u64, 1u64), (20, 2), (30, 3)] {
            add_skinned(
                &mut scene,
                n,
                cube_mesh(ContentType::Geometry, 0, Vec3::splat(n as f32)),
                vec![Influence::new().with(id(joint), 1.0)],
                vec![0; 8],
            );
        }
        scene.update().unwrap();
        scene.calculate_joint_bounding_volumes();
        scene
    };
    let a = build();
    let b = build();
    assert_eq!(a.bounding_volumes(), b.bounding_volumes());
}

// ============================================================================
// Custom fitter
// ============================================================================

/// Always reports the AABB sphere, whatever the mode.
struct BoxFitter;

impl SphereFitter for BoxFitter {
    fn fit(&self, points: &[Vec3], _mode: FitMode) -> Option<BoundingSphere> {
        let aabb = BoundingBox::from_points(points)?;
        Some(BoundingSphere {
            center: aabb.center(),
            radius: aabb.size().length() * 0.5,
        })
    }
}

#[test]
fn custom_fitter_is_used() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1]);
    add_skinned(
        &mut scene,
        10,
        cube_mesh(ContentType::Geometry, 0, Vec3::ZERO),
        vec![Influence::new().with(id(1), 1.0)],
        vec![0; 8],
    );
    scene.update().unwrap();
    scene.calculate_joint_bounding_volumes_with(&BoxFitter);

    let sphere = scene.bounding_spheres_for_joint(id(1), ContentType::Geometry)[0].sphere;
    assert!((sphere.center - Vec3::splat(0.5)).length() < EPSILON);
    assert!((sphere.radius - 3.0_f32.sqrt() * 0.5).abs() < EPSILON);
}

#[test]
fn fast_mode_encloses_points() {
    let points = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];
    let sphere = PrincipalAxisFitter::default().fit(&points, FitMode::Fast).unwrap();
    assert!(points.iter().all(|&p| sphere.contains(p, EPSILON)));
}

// ============================================================================
// Skin vertices
// ============================================================================

#[test]
fn skin_vertices_translate_joint_ids() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1, 2]);
    add_skinned(
        &mut scene,
        10,
        cube_mesh(ContentType::Geometry, 0, Vec3::ZERO),
        vec![Influence::new().with(id(1), 0.25).with(id(2), 0.75)],
        vec![0; 8],
    );
    scene.update().unwrap();

    let map = scene.joint_ordering().index_map();
    let lists = scene.skin_vertices(None, &map, id(1)).unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].len(), 8);
    let vertex = &lists[0][0];
    assert_eq!(vertex.joints.as_slice(), &[0, 1]);
    assert_eq!(vertex.joint_ids.as_slice(), &[id(1), id(2)]);
    assert_eq!(vertex.weights.as_slice(), &[0.25, 0.75]);
}

#[test]
fn skin_vertices_skip_unmapped_joints() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1, 2]);
    add_skinned(
        &mut scene,
        10,
        cube_mesh(ContentType::Geometry, 0, Vec3::ZERO),
        vec![Influence::new().with(id(1), 0.5).with(id(2), 0.5)],
        vec![0; 8],
    );
    scene.update().unwrap();

    let mut map = FxHashMap::default();
    map.insert(id(1), 7);
    let lists = scene.skin_vertices(None, &map, id(1)).unwrap();
    assert!(lists[0].iter().all(|v| v.joints.as_slice() == [7]));
}

#[test]
fn unmapped_mesh_binds_rigidly_to_root() {
    let mut scene = Scene::new();
    joints(&mut scene, &[1]);
    add_skinned(
        &mut scene,
        10,
        cube_mesh(ContentType::Geometry, 0, Vec3::ZERO),
        vec![Influence::new().with(id(77), 1.0)],
        vec![0; 8],
    );
    scene.update().unwrap();

    let mut map = FxHashMap::default();
    map.insert(id(1), 3);
    let lists = scene.skin_vertices(Some(ContentType::Geometry), &map, id(1)).unwrap();
    assert_eq!(lists[0].len(), 8);
    for vertex in &lists[0] {
        assert_eq!(vertex.joints.as_slice(), &[3]);
        assert_eq!(vertex.weights.as_slice(), &[1.0]);
    }

    // content type filter excludes the mesh entirely
    let none = scene.skin_vertices(Some(ContentType::Bangle), &map, id(1)).unwrap();
    assert!(none.is_empty());
}

#[test]
fn missing_root_is_an_error() {
    let scene = Scene::new();
    let map = FxHashMap::default();
    let err = scene.skin_vertices(None, &map, id(1)).unwrap_err();
    assert!(matches!(err, SceneError::MissingRootJoint(root) if root == id(1)));
}

// ============================================================================
// Boxes
// ============================================================================

#[test]
fn scene_bounding_box_unions_meshes() {
    let mut scene = Scene::new();
    scene.add(SceneNode::mesh(id(1), cube_mesh(ContentType::Geometry, 0, Vec3::ZERO)));
    scene.add(SceneNode::mesh(id(2), cube_mesh(ContentType::Geometry, 0, Vec3::new(0.0, 0.0, -4.0))));
    scene.commit();

    let aabb = scene.aligned_bounding_box().unwrap();
    assert_eq!(aabb.min, Vec3::new(0.0, 0.0, -4.0));
    assert_eq!(aabb.max, Vec3::ONE);

    let moved = aabb.transform(&Affine3A::from_translation(Vec3::X));
    assert_eq!(moved.min, Vec3::new(1.0, 0.0, -4.0));
}
