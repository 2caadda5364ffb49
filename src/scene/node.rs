use serde::{Deserialize, Serialize};

use crate::scene::content::{ContentType, ContentTypeSet};
use crate::scene::mesh::Mesh;
use crate::scene::skin::Skin;
use crate::scene::transform::Transform;
use crate::scene::Identifier;

/// A node of the content scene.
///
/// # Hierarchy
///
/// `parent` is the single source of truth for the hierarchy. The
/// [`HierarchyIndex`](crate::scene::HierarchyIndex) held by the scene is
/// derived from it. A NULL parent, or one that does not resolve to a
/// hierarchy node, makes the node a root.
///
/// Non-hierarchy variants (skins, shaders, animation clips) keep a NULL
/// parent; their transform is unused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: Identifier,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Identifier,
    #[serde(default)]
    pub transform: Transform,
    pub kind: NodeKind,
}

impl SceneNode {
    #[must_use]
    pub fn new(id: Identifier, kind: NodeKind) -> Self {
        Self {
            id,
            name: String::new(),
            parent: Identifier::NULL,
            transform: Transform::new(),
            kind,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Identifier) -> Self {
        self.parent = parent;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    // ========================================================================
    // Constructors per variant
    // ========================================================================

    #[must_use]
    pub fn transform_node(id: Identifier) -> Self {
        Self::new(id, NodeKind::Transform)
    }

    #[must_use]
    pub fn joint(id: Identifier) -> Self {
        Self::new(id, NodeKind::Joint)
    }

    #[must_use]
    pub fn pivot(id: Identifier) -> Self {
        Self::new(id, NodeKind::Pivot)
    }

    #[must_use]
    pub fn effector(id: Identifier) -> Self {
        Self::new(id, NodeKind::Effector)
    }

    #[must_use]
    pub fn descriptor(id: Identifier, export_type: ContentType, content_num: i32) -> Self {
        Self::new(
            id,
            NodeKind::Descriptor(Descriptor {
                export_type,
                content_num,
            }),
        )
    }

    #[must_use]
    pub fn mesh(id: Identifier, mesh: Mesh) -> Self {
        Self::new(id, NodeKind::Mesh(Box::new(mesh)))
    }

    #[must_use]
    pub fn skin(id: Identifier, skin: Skin) -> Self {
        Self::new(id, NodeKind::Skin(skin))
    }

    #[must_use]
    pub fn shader(id: Identifier, shader: Shader) -> Self {
        Self::new(id, NodeKind::Shader(shader))
    }

    #[must_use]
    pub fn collision_primitive(id: Identifier, shape: CollisionShape) -> Self {
        Self::new(
            id,
            NodeKind::CollisionPrimitive(CollisionPrimitive {
                shape,
                export_types: ContentTypeSet::empty(),
            }),
        )
    }

    #[must_use]
    pub fn animation_clip(id: Identifier, joint_ids: Vec<Identifier>) -> Self {
        Self::new(id, NodeKind::AnimationClip(AnimationClip { joint_ids }))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_hierarchy(&self) -> bool {
        self.kind.is_hierarchy()
    }

    #[inline]
    #[must_use]
    pub fn is_joint(&self) -> bool {
        matches!(self.kind, NodeKind::Joint)
    }

    #[must_use]
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(&**mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(&mut **mesh),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_skin(&self) -> Option<&Skin> {
        match &self.kind {
            NodeKind::Skin(skin) => Some(skin),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match &self.kind {
            NodeKind::Descriptor(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Closed set of node variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Transform,
    Joint,
    Pivot,
    Descriptor(Descriptor),
    Mesh(Box<Mesh>),
    Skin(Skin),
    Shader(Shader),
    AnimationClip(AnimationClip),
    CollisionPrimitive(CollisionPrimitive),
    Effector,
}

impl NodeKind {
    /// Whether this variant participates in the hierarchy.
    #[must_use]
    pub const fn is_hierarchy(&self) -> bool {
        match self {
            NodeKind::Transform
            | NodeKind::Joint
            | NodeKind::Pivot
            | NodeKind::Descriptor(_)
            | NodeKind::Mesh(_)
            | NodeKind::CollisionPrimitive(_)
            | NodeKind::Effector => true,
            NodeKind::Skin(_) | NodeKind::Shader(_) | NodeKind::AnimationClip(_) => false,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Transform => "Transform",
            NodeKind::Joint => "Joint",
            NodeKind::Pivot => "Pivot",
            NodeKind::Descriptor(_) => "Descriptor",
            NodeKind::Mesh(_) => "Mesh",
            NodeKind::Skin(_) => "Skin",
            NodeKind::Shader(_) => "Shader",
            NodeKind::AnimationClip(_) => "AnimationClip",
            NodeKind::CollisionPrimitive(_) => "CollisionPrimitive",
            NodeKind::Effector => "Effector",
        }
    }
}

/// Export marker: every mesh beneath it is classified as `export_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub export_type: ContentType,
    /// Group index (bangle number, fragment group, ...). `-1` means ungrouped.
    pub content_num: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shader {
    #[serde(default)]
    pub base_texture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub joint_ids: Vec<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionShape {
    Sphere,
    Box,
    Capsule,
    Cylinder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionPrimitive {
    pub shape: CollisionShape,
    #[serde(default)]
    pub export_types: ContentTypeSet,
}
