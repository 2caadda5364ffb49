//! Scene Graph Module
//!
//! The in-memory content scene and the passes that transform it:
//! - [`SceneNode`] / [`NodeKind`]: the closed set of node variants
//! - [`Transform`]: local TRS with cached object and global matrices
//! - [`HierarchyIndex`]: derived parent → children index
//! - [`Scene`]: node store, side tables and the public processing API
//! - [`JointOrdering`]: dense joint ordering with master/local maps
//! - transform system, optimizer, mesh merger and morph collation passes

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod content;
pub mod hierarchy;
pub mod joint_ordering;
pub mod merge;
pub mod mesh;
pub mod morph;
pub mod node;
pub mod optimize;
pub mod scene;
pub mod skin;
pub mod transform;
pub mod transform_system;

pub use content::{ContentType, ContentTypeSet};
pub use hierarchy::HierarchyIndex;
pub use joint_ordering::JointOrdering;
pub use mesh::{Mesh, MorphTarget, UvSet};
pub use morph::MorphTargetData;
pub use node::{
    AnimationClip, CollisionPrimitive, CollisionShape, Descriptor, NodeKind, SceneNode, Shader,
};
pub use scene::Scene;
pub use skin::{Influence, Skin, SkinVertex};
pub use transform::Transform;

/// Opaque 64-bit node identifier.
///
/// [`Identifier::NULL`] (zero) means "no reference".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identifier(pub u64);

impl Identifier {
    pub const NULL: Identifier = Identifier(0);

    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
