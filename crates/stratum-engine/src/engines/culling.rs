use stratum_ecs::prelude::*;

use crate::components::{Aabb, Visibility, WorldBounds};
use crate::engines::Engine;
use crate::views::MeshRenderableView;
use crate::EngineError;

/// Marks active meshes visible when their world bounds overlap a region.
#[derive(Debug)]
pub struct CullingEngine {
    region: Aabb,
    frame: u64,
    targets: Vec<(Egid, ImplementerPtr<WorldBounds>, ImplementerPtr<Visibility>)>,
    visible: Vec<Egid>,
}

impl CullingEngine {
    pub fn new(region: Aabb) -> Self {
        Self {
            region,
            frame: 0,
            targets: Vec::new(),
            visible: Vec::new(),
        }
    }

    pub fn region(&self) -> Aabb {
        self.region
    }

    pub fn set_region(&mut self, region: Aabb) {
        self.region = region;
    }

    /// Meshes found visible by the last step.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Identifiers of the meshes found visible by the last step, in view
    /// order.
    pub fn visible(&self) -> &[Egid] {
        &self.visible
    }
}

impl Engine for CullingEngine {
    fn name(&self) -> &str {
        "culling"
    }

    fn step(&mut self, db: &mut EntityDatabase) -> Result<(), EngineError> {
        self.frame += 1;
        self.targets.clear();
        self.targets.extend(
            db.query_group::<MeshRenderableView>(groups::ACTIVE)?
                .iter()
                .filter_map(|v| Some((v.gid, v.bounds?, v.visibility?))),
        );

        self.visible.clear();
        for &(egid, bounds, visibility) in &self.targets {
            let visible = db.implementer(bounds)?.0.intersects(&self.region);
            *db.implementer_mut(visibility)? = Visibility {
                visible,
                last_frame: self.frame,
            };
            if visible {
                self.visible.push(egid);
            }
        }

        tracing::debug!(
            frame = self.frame,
            tested = self.targets.len(),
            visible = self.visible.len(),
            "culled meshes"
        );
        Ok(())
    }
}
