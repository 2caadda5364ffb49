//! UV Overlap Detection
//!
//! Broad phase: a bounding circle per shell (from its UV extents); shell pairs
//! whose circles intersect, plus every shell paired with itself, go on.
//!
//! Narrow phase: triangles are magnified, shrunk slightly toward their
//! centroid so shared edges and vertices separate, then tested with a 2D
//! separating-axis test over the edge normals of both triangles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::scene::Scene;
use crate::scene::mesh::UvSet;
use crate::settings::ProcessorSettings;
use crate::uv::shell::UvShell;

/// Shell index → indices of its triangles involved in an overlap.
pub type OverlapMap = BTreeMap<u32, BTreeSet<u32>>;

/// Magnification and shrink applied before the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapParams {
    pub scale: f32,
    pub shrink: f32,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self::from(&ProcessorSettings::default())
    }
}

impl From<&ProcessorSettings> for OverlapParams {
    fn from(settings: &ProcessorSettings) -> Self {
        Self {
            scale: settings.uv_scale,
            shrink: settings.uv_shrink_factor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundingCircle {
    center: Vec2,
    radius: f32,
}

impl BoundingCircle {
    fn of_shell(shell: &UvShell) -> Option<Self> {
        let first = *shell.uvs.first()?;
        let (min, max) = shell
            .uvs
            .iter()
            .fold((first, first), |(min, max), &uv| (min.min(uv), max.max(uv)));
        let diff = max - min;
        Some(Self {
            center: min + diff * 0.5,
            radius: diff.length() * 0.5,
        })
    }

    fn intersects(&self, other: &Self) -> bool {
        self.center.distance(other.center) < self.radius + other.radius
    }
}

/// Shell pairs `(a, b)` with `a <= b` that need a narrow-phase test.
fn broad_phase(shells: &[UvShell]) -> Vec<(usize, usize)> {
    let circles: Vec<Option<BoundingCircle>> = shells.iter().map(BoundingCircle::of_shell).collect();
    let mut pairs = Vec::new();
    for a in 0..circles.len() {
        let Some(ca) = circles[a] else {
            continue;
        };
        pairs.push((a, a));
        for (b, cb) in circles.iter().enumerate().skip(a + 1) {
            if cb.is_some_and(|cb| ca.intersects(&cb)) {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

/// Magnified, shrunk, counter-clockwise triangle; `None` when degenerate.
fn prepare(tri: [Vec2; 3], params: OverlapParams) -> Option<[Vec2; 3]> {
    let scaled = tri.map(|v| v * params.scale);
    let centroid = (scaled[0] + scaled[1] + scaled[2]) / 3.0;
    let mut shrunk = scaled.map(|v| centroid + (v - centroid) * params.shrink);

    let signed_area = (shrunk[1] - shrunk[0]).perp_dot(shrunk[2] - shrunk[0]);
    if !signed_area.is_finite() || signed_area.abs() <= f32::EPSILON {
        return None;
    }
    if signed_area < 0.0 {
        shrunk.swap(1, 2);
    }
    Some(shrunk)
}

fn prepare_shell(shell: &UvShell, params: OverlapParams) -> Vec<Option<[Vec2; 3]>> {
    (0..shell.triangle_count())
        .map(|tri| prepare(shell.triangle(tri), params))
        .collect()
}

/// Whether some edge of `a` has every vertex of `b` strictly outside it.
fn separated_by_edges_of(a: &[Vec2; 3], b: &[Vec2; 3]) -> bool {
    (0..3).any(|i| {
        let start = a[i];
        let edge = a[(i + 1) % 3] - start;
        // outward normal of a counter-clockwise edge
        let normal = Vec2::new(edge.y, -edge.x);
        b.iter().all(|&p| normal.dot(p - start) > 0.0)
    })
}

/// Separating-axis test for two counter-clockwise triangles.
#[must_use]
pub fn triangles_overlap(a: &[Vec2; 3], b: &[Vec2; 3]) -> bool {
    !separated_by_edges_of(a, b) && !separated_by_edges_of(b, a)
}

/// Tests raw UV triangles the way the detector does.
#[must_use]
pub fn uv_triangles_overlap(a: [Vec2; 3], b: [Vec2; 3], params: OverlapParams) -> bool {
    match (prepare(a, params), prepare(b, params)) {
        (Some(a), Some(b)) => triangles_overlap(&a, &b),
        _ => false,
    }
}

/// Visits every overlapping `(shell a, tri i, shell b, tri j)` until `visit`
/// returns `false` or `stop` is raised.
fn narrow_phase<F>(shells: &[UvShell], params: OverlapParams, stop: &AtomicBool, visit: F)
where
    F: Fn(usize, usize, usize, usize) -> bool + Sync,
{
    let prepared: Vec<Vec<Option<[Vec2; 3]>>> =
        shells.par_iter().map(|shell| prepare_shell(shell, params)).collect();

    broad_phase(shells).into_par_iter().for_each(|(a, b)| {
        let tris_a = &prepared[a];
        let tris_b = &prepared[b];

        (0..tris_a.len()).into_par_iter().for_each(|i| {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let Some(ta) = &tris_a[i] else {
                return;
            };
            let first = if a == b { i + 1 } else { 0 };
            for (j, tb) in tris_b.iter().enumerate().skip(first) {
                if stop.load(Ordering::Relaxed) {
                    return;
                }
                let Some(tb) = tb else {
                    continue;
                };
                if triangles_overlap(ta, tb) && !visit(a, i, b, j) {
                    stop.store(true, Ordering::Relaxed);
                    return;
                }
            }
        });
    });
}

/// Every overlapping triangle, grouped by shell.
#[must_use]
pub fn find_overlaps(shells: &[UvShell], params: OverlapParams) -> OverlapMap {
    let overlaps: Mutex<OverlapMap> = Mutex::new(BTreeMap::new());
    let stop = AtomicBool::new(false);

    narrow_phase(shells, params, &stop, |a, i, b, j| {
        let mut map = overlaps.lock();
        map.entry(a as u32).or_default().insert(i as u32);
        map.entry(b as u32).or_default().insert(j as u32);
        true
    });

    overlaps.into_inner()
}

/// Whether any two triangles overlap. Stops early once one is found.
#[must_use]
pub fn any_overlap(shells: &[UvShell], params: OverlapParams) -> bool {
    let stop = AtomicBool::new(false);
    narrow_phase(shells, params, &stop, |_, _, _, _| false);
    stop.load(Ordering::Relaxed)
}

impl Scene {
    /// Whether any two lightmap UV triangles overlap.
    #[must_use]
    pub fn lightmap_uvs_overlap(&self) -> bool {
        let shells = self.uv_shells(UvSet::Lightmap);
        any_overlap(&shells, OverlapParams::from(&self.settings))
    }

    /// Every overlapping lightmap triangle, keyed by shell index.
    ///
    /// Shell indices follow [`uv_shells`](Self::uv_shells) for the lightmap set.
    #[must_use]
    pub fn lightmap_uv_overlaps(&self) -> OverlapMap {
        let shells = self.uv_shells(UvSet::Lightmap);
        let overlaps = find_overlaps(&shells, OverlapParams::from(&self.settings));
        if !overlaps.is_empty() {
            log::warn!(
                "Lightmap UVs overlap in {} shell(s)",
                overlaps.len()
            );
        }
        overlaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> [Vec2; 3] {
        [Vec2::new(a.0, a.1), Vec2::new(b.0, b.1), Vec2::new(c.0, c.1)]
    }

    #[test]
    fn winding_does_not_matter() {
        let params = OverlapParams::default();
        let a = tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        let b = tri((0.2, 0.2), (0.2, 0.9), (0.9, 0.2));
        assert!(uv_triangles_overlap(a, b, params));
        assert!(uv_triangles_overlap(b, a, params));
    }

    #[test]
    fn degenerate_triangle_never_overlaps() {
        let params = OverlapParams::default();
        let line = tri((0.0, 0.0), (1.0, 1.0), (2.0, 2.0));
        let a = tri((0.0, 0.0), (2.0, 0.0), (0.0, 2.0));
        assert!(!uv_triangles_overlap(line, a, params));
    }

    #[test]
    fn containment_counts_as_overlap() {
        let params = OverlapParams::default();
        let outer = tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        let inner = tri((0.1, 0.1), (0.3, 0.1), (0.1, 0.3));
        assert!(uv_triangles_overlap(outer, inner, params));
    }

    #[test]
    fn broad_phase_always_pairs_shell_with_itself() {
        let near = UvShell::from_triangles(&[tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0))]);
        let far = UvShell::from_triangles(&[tri((10.0, 10.0), (11.0, 10.0), (10.0, 11.0))]);
        let pairs = broad_phase(&[near, far]);
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }
}
