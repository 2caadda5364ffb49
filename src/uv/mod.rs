//! UV validation: shell extraction, overlap detection and lightmap statistics.

pub mod lightmap;
pub mod overlap;
pub mod shell;

pub use overlap::{OverlapMap, OverlapParams, any_overlap, find_overlaps, uv_triangles_overlap};
pub use shell::UvShell;
