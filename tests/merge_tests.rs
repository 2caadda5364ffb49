//! Mesh Merger tests
//!
//! Tests for:
//! - One destination per (shader, export flags) pair
//! - Triangle conservation and disjoint vertex ranges
//! - Shader tables of merged meshes
//! - Scene state after merging (sources removed, tables refreshed)

use content_scene::scene::node::Shader;
use content_scene::scene::skin::Skin;
use content_scene::scene::{ContentType, Identifier, Mesh, Scene, SceneNode};
use glam::{Vec2, Vec3};

// ============================================================================
// Helpers
// ============================================================================

fn id(value: u64) -> Identifier {
    Identifier::new(value)
}

/// A quad split in two triangles, the first using `shaders[0]`, the second
/// using `shaders[1]` (or `shaders[0]` when only one is given).
fn quad(shaders: &[Identifier], offset: f32) -> Mesh {
    let second: u32 = if shaders.len() > 1 { 1 } else { 0 };
    let mut counts = vec![0u32; shaders.len()];
    counts[0] += 1;
    counts[second as usize] += 1;
    Mesh {
        positions: vec![
            Vec3::new(offset, 0.0, 0.0),
            Vec3::new(offset + 1.0, 0.0, 0.0),
            Vec3::new(offset + 1.0, 1.0, 0.0),
            Vec3::new(offset, 1.0, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        base_uvs: vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
        triangle_indices: vec![0, 1, 2, 0, 2, 3],
        shader_indices: vec![0, second],
        polygon_indices: vec![0, 0],
        shader_ids: shaders.to_vec(),
        shader_triangle_counts: counts,
        ..Mesh::default()
    }
}

fn scene_with_shaders() -> Scene {
    let mut scene = Scene::new();
    scene.add(SceneNode::shader(id(100), Shader { base_texture: "stone.png".into() }));
    scene.add(SceneNode::shader(id(101), Shader { base_texture: "moss.png".into() }));
    scene.add(SceneNode::transform_node(id(1)));
    scene
}

fn total_triangles(scene: &Scene) -> usize {
    scene
        .meshes()
        .filter_map(|m| scene.mesh(m))
        .map(Mesh::triangle_count)
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn merges_by_shader() {
    let mut scene = scene_with_shaders();
    scene.add(SceneNode::mesh(id(2), quad(&[id(100), id(101)], 0.0)).with_parent(id(1)));
    scene.add(SceneNode::mesh(id(3), quad(&[id(100)], 5.0)).with_parent(id(1)));
    scene.add(SceneNode::mesh(id(4), quad(&[id(101)], 9.0)).with_parent(id(1)));
    scene.update().unwrap();
    let before = total_triangles(&scene);

    scene.merge_meshes().unwrap();

    let merged: Vec<Identifier> = scene.meshes().collect();
    assert_eq!(merged.len(), 2);
    assert_eq!(total_triangles(&scene), before);
    for &old in &[id(2), id(3), id(4)] {
        assert!(!scene.exists(old));
    }

    for mesh_id in merged {
        let mesh = scene.mesh(mesh_id).unwrap();
        assert_eq!(mesh.shader_ids.len(), 1);
        assert_eq!(mesh.shader_triangle_counts, vec![mesh.triangle_count() as u32]);
        assert!(mesh.shader_indices.iter().all(|&s| s == 0));
        assert_eq!(mesh.shader_indices.len(), mesh.triangle_count());
        assert_eq!(mesh.polygon_indices.len(), mesh.triangle_count());
        // three fresh vertices per triangle
        assert_eq!(mesh.vertex_count(), mesh.triangle_count() * 3);
        assert_eq!(mesh.normals.len(), mesh.vertex_count());
        assert_eq!(mesh.base_uvs.len(), mesh.vertex_count());

        // stone: first triangle of mesh 2 and both of mesh 3; moss: the rest
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(scene.parent_of(mesh_id), Some(id(1)));
    }
}

#[test]
fn merged_triangles_reference_their_own_vertices() {
    let mut scene = scene_with_shaders();
    scene.add(SceneNode::mesh(id(2), quad(&[id(100)], 0.0)));
    scene.add(SceneNode::mesh(id(3), quad(&[id(100)], 3.0)));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    let mesh_id = scene.meshes().next().unwrap();
    let mesh = scene.mesh(mesh_id).unwrap();
    let mut seen = vec![false; mesh.vertex_count()];
    for &index in &mesh.triangle_indices {
        assert!(!seen[index as usize], "vertex {index} shared between triangles");
        seen[index as usize] = true;
    }
    assert!(seen.into_iter().all(|used| used));
    assert_eq!(
        scene.shader_for_triangle(mesh_id, 0).map(|s| s.base_texture.as_str()),
        Some("stone.png")
    );
}

#[test]
fn export_flags_split_destinations() {
    let mut scene = scene_with_shaders();
    let mut lit = quad(&[id(100)], 0.0);
    lit.set_export_type(ContentType::LightMapped, 0);
    lit.lightmap_uvs = vec![Vec2::ZERO; 4];
    scene.add(SceneNode::mesh(id(2), lit));
    scene.add(SceneNode::mesh(id(3), quad(&[id(100)], 3.0)));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    assert_eq!(scene.meshes().count(), 2);
    assert_eq!(scene.meshes_by_type(ContentType::LightMapped, None).len(), 1);
    let lit_id = scene.meshes_by_type(ContentType::LightMapped, None)[0];
    let lit = scene.mesh(lit_id).unwrap();
    assert_eq!(lit.lightmap_uvs.len(), lit.vertex_count());
}

#[test]
fn unassigned_triangles_are_kept() {
    let mut scene = scene_with_shaders();
    let mut mesh = quad(&[id(100)], 0.0);
    // second triangle points past the shader table
    mesh.shader_indices[1] = 7;
    scene.add(SceneNode::mesh(id(2), mesh));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    assert_eq!(total_triangles(&scene), 2);
    let null_meshes: Vec<_> = scene
        .meshes()
        .filter(|&m| scene.mesh(m).unwrap().shader_ids == vec![Identifier::NULL])
        .collect();
    assert_eq!(null_meshes.len(), 1);
}

#[test]
fn merged_identifiers_are_fresh() {
    let mut scene = scene_with_shaders();
    scene.add(SceneNode::mesh(id(2), quad(&[id(100)], 0.0)));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    let merged = scene.meshes().next().unwrap();
    assert!(merged.value() > 101);
    assert!(!scene.has_staged());
}

#[test]
fn merging_empty_scene_is_a_no_op() {
    let mut scene = scene_with_shaders();
    scene.update().unwrap();
    scene.merge_meshes().unwrap();
    assert_eq!(scene.meshes().count(), 0);
    assert_eq!(scene.len(), 3);
}

#[test]
fn short_uv_channels_are_zero_filled() {
    let mut scene = scene_with_shaders();
    let mut lit = quad(&[id(100)], 0.0);
    lit.set_export_type(ContentType::LightMapped, 0);
    lit.lightmap_uvs = vec![Vec2::ONE];
    lit.blend_uvs = vec![Vec2::ONE, Vec2::ONE];
    scene.add(SceneNode::mesh(id(2), lit));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    let merged = scene.meshes().next().unwrap();
    let mesh = scene.mesh(merged).unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.lightmap_uvs.len(), mesh.vertex_count());
    assert_eq!(mesh.blend_uvs.len(), mesh.vertex_count());
    // triangle 0 uses vertices 0, 1, 2 of the source
    assert_eq!(&mesh.lightmap_uvs[..3], &[Vec2::ONE, Vec2::ZERO, Vec2::ZERO]);
    assert_eq!(&mesh.blend_uvs[..3], &[Vec2::ONE, Vec2::ONE, Vec2::ZERO]);
}

#[test]
fn triangles_past_the_positions_are_dropped() {
    let mut scene = scene_with_shaders();
    let mut mesh = quad(&[id(100)], 0.0);
    mesh.positions.truncate(3);
    scene.add(SceneNode::mesh(id(2), mesh));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    let merged = scene.meshes().next().unwrap();
    let mesh = scene.mesh(merged).unwrap();
    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.shader_triangle_counts, vec![1]);
}

#[test]
fn skins_of_merged_meshes_survive() {
    let mut scene = scene_with_shaders();
    scene.add(SceneNode::mesh(id(2), quad(&[id(100)], 0.0)));
    scene.add(SceneNode::skin(id(50), Skin::new(id(2))));
    scene.update().unwrap();
    scene.merge_meshes().unwrap();

    assert!(!scene.exists(id(2)));
    assert_eq!(scene.skin(id(50)).map(|skin| skin.mesh), Some(id(2)));
    assert_eq!(scene.skins().count(), 1);
}
