use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Export classification of a piece of content.
///
/// Descriptors stamp one of these on every mesh beneath them; meshes may end
/// up carrying several. `Bangle` marks repeated, separately indexed instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentType {
    Default,
    Geometry,
    Skeleton,
    Bangle,
    HighResCollision,
    LowResCollision,
    Pathfinding,
    LowResPathfinding,
    LightMapped,
    VertexLit,
    Foliage,
    Overlay,
    Water,
    Glue,
    FragmentGroup,
    Exclude,
}

impl ContentType {
    pub const ALL: [ContentType; 16] = [
        ContentType::Default,
        ContentType::Geometry,
        ContentType::Skeleton,
        ContentType::Bangle,
        ContentType::HighResCollision,
        ContentType::LowResCollision,
        ContentType::Pathfinding,
        ContentType::LowResPathfinding,
        ContentType::LightMapped,
        ContentType::VertexLit,
        ContentType::Foliage,
        ContentType::Overlay,
        ContentType::Water,
        ContentType::Glue,
        ContentType::FragmentGroup,
        ContentType::Exclude,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The single-bit flag corresponding to this content type.
    #[inline]
    #[must_use]
    pub const fn flag(self) -> ContentTypeSet {
        ContentTypeSet::from_bits_retain(1 << self as u32)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ContentType::Default => "Default",
            ContentType::Geometry => "Geometry",
            ContentType::Skeleton => "Skeleton",
            ContentType::Bangle => "Bangle",
            ContentType::HighResCollision => "HighResCollision",
            ContentType::LowResCollision => "LowResCollision",
            ContentType::Pathfinding => "Pathfinding",
            ContentType::LowResPathfinding => "LowResPathfinding",
            ContentType::LightMapped => "LightMapped",
            ContentType::VertexLit => "VertexLit",
            ContentType::Foliage => "Foliage",
            ContentType::Overlay => "Overlay",
            ContentType::Water => "Water",
            ContentType::Glue => "Glue",
            ContentType::FragmentGroup => "FragmentGroup",
            ContentType::Exclude => "Exclude",
        }
    }

    /// Collision content types propagate to collision primitives as well as meshes.
    #[inline]
    #[must_use]
    pub const fn is_collision(self) -> bool {
        matches!(self, ContentType::HighResCollision | ContentType::LowResCollision)
    }
}

bitflags! {
    /// Set of [`ContentType`] export flags carried by a mesh.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
    pub struct ContentTypeSet: u32 {
        const DEFAULT = 1 << 0;
        const GEOMETRY = 1 << 1;
        const SKELETON = 1 << 2;
        const BANGLE = 1 << 3;
        const HIGH_RES_COLLISION = 1 << 4;
        const LOW_RES_COLLISION = 1 << 5;
        const PATHFINDING = 1 << 6;
        const LOW_RES_PATHFINDING = 1 << 7;
        const LIGHT_MAPPED = 1 << 8;
        const VERTEX_LIT = 1 << 9;
        const FOLIAGE = 1 << 10;
        const OVERLAY = 1 << 11;
        const WATER = 1 << 12;
        const GLUE = 1 << 13;
        const FRAGMENT_GROUP = 1 << 14;
        const EXCLUDE = 1 << 15;
    }
}

impl ContentTypeSet {
    #[inline]
    #[must_use]
    pub fn has(self, ty: ContentType) -> bool {
        self.contains(ty.flag())
    }

    /// Iterates the content types present in this set, in declaration order.
    pub fn types(self) -> impl Iterator<Item = ContentType> {
        ContentType::ALL.into_iter().filter(move |ty| self.has(*ty))
    }
}

impl From<ContentType> for ContentTypeSet {
    fn from(ty: ContentType) -> Self {
        ty.flag()
    }
}
