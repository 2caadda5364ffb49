#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod archive;
pub mod bounds;
pub mod errors;
pub mod scene;
pub mod settings;
pub mod uv;

pub use archive::{ElementArchive, JsonArchive, NullRevisionControl, RevisionControl};
pub use bounds::fit::{FitMode, PrincipalAxisFitter, SphereFitter};
pub use bounds::{BoundingBox, BoundingSphere, BoundingVolumes, GroupSphere};
pub use errors::{Result, SceneError};
pub use scene::{
    ContentType, ContentTypeSet, Identifier, JointOrdering, Mesh, NodeKind, Scene, SceneNode,
    Transform, UvSet,
};
pub use settings::ProcessorSettings;
pub use uv::{OverlapMap, OverlapParams, UvShell};
