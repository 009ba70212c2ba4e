use stratum_ecs::prelude::*;

use crate::components::{LocalBounds, Transform, WorldBounds};
use crate::engines::Engine;
use crate::views::TransformView;
use crate::EngineError;

/// Recomputes every active entity's world bounds from its local bounds and
/// transform.
#[derive(Debug, Default)]
pub struct TransformEngine {
    targets: Vec<(
        ImplementerPtr<Transform>,
        ImplementerPtr<LocalBounds>,
        ImplementerPtr<WorldBounds>,
    )>,
    updated: usize,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities updated by the last step.
    pub fn updated(&self) -> usize {
        self.updated
    }
}

impl Engine for TransformEngine {
    fn name(&self) -> &str {
        "transform"
    }

    fn step(&mut self, db: &mut EntityDatabase) -> Result<(), EngineError> {
        self.targets.clear();
        self.targets.extend(
            db.query_group::<TransformView>(groups::ACTIVE)?
                .iter()
                .filter_map(|v| Some((v.transform?, v.local_bounds?, v.world_bounds?))),
        );

        for &(transform, local, world) in &self.targets {
            let transform = *db.implementer(transform)?;
            let local = db.implementer(local)?.0;
            db.implementer_mut(world)?.0 = local.transformed(&transform);
        }

        self.updated = self.targets.len();
        Ok(())
    }
}
