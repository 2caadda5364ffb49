//! Scene Optimizer
//!
//! Flattens the hierarchy before export:
//! - bare pivots are removed (their children move up to the pivot's parent)
//! - static, non-foliage mesh geometry is baked into world space and the
//!   mesh moves to the root when its parent keeps a non-identity global
//! - every surviving transform node gets a local TRS that reproduces its
//!   original global matrix under its new ancestry

use glam::Affine3A;

use crate::errors::Result;
use crate::scene::content::ContentType;
use crate::scene::node::NodeKind;
use crate::scene::{Identifier, Scene};

impl Scene {
    /// Removes pivots, bakes mesh transforms and rewrites local transforms.
    ///
    /// Globals are refreshed first and again at the end, so the cached global
    /// of every surviving node matches its pre-optimization value (meshes
    /// excepted, whose global becomes identity once baked).
    pub fn optimize(&mut self) -> Result<()> {
        self.ensure_committed()?;
        self.update_global_transforms();

        let epsilon = self.settings.identity_epsilon;
        let mut pivots = Vec::new();
        let mut detached = Vec::new();
        let mut baked = 0usize;

        // (node, parent global after optimization)
        let mut stack: Vec<(Identifier, Affine3A)> = self
            .roots()
            .into_iter()
            .rev()
            .map(|root| (root, Affine3A::IDENTITY))
            .collect();

        while let Some((id, parent_global)) = stack.pop() {
            // capture children before anything is mutated
            let children = self.hierarchy.children(id).to_vec();
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let old_global = *node.transform.world_matrix();

            let new_global = match &mut node.kind {
                NodeKind::Descriptor(_) => {
                    node.transform.reset();
                    parent_global
                }
                NodeKind::Pivot => {
                    pivots.push(id);
                    parent_global
                }
                NodeKind::Mesh(mesh) if !mesh.has_export_type(ContentType::Foliage) => {
                    if !old_global.abs_diff_eq(Affine3A::IDENTITY, epsilon) {
                        mesh.bake_transform(&old_global);
                        baked += 1;
                    }
                    node.transform.reset();
                    // world-space geometry cannot sit under a transformed ancestor
                    if !parent_global.abs_diff_eq(Affine3A::IDENTITY, epsilon) {
                        detached.push(id);
                    }
                    Affine3A::IDENTITY
                }
                _ => {
                    let local = parent_global.inverse() * old_global;
                    node.transform.apply_local_matrix(local);
                    old_global
                }
            };
            node.transform.set_world_matrix(new_global);

            for child in children.into_iter().rev() {
                stack.push((child, new_global));
            }
        }

        for &mesh in &detached {
            self.set_parent(mesh, Identifier::NULL)?;
        }

        let removed = pivots.len();
        for pivot in pivots {
            self.remove(pivot);
        }

        self.update_global_transforms();
        log::debug!(
            "Optimize removed {removed} pivot(s), baked {baked} mesh(es), moved {} mesh(es) to the root",
            detached.len()
        );
        Ok(())
    }
}
