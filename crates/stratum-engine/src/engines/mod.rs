//! Engines: per-frame callers of the entity database.

use std::any::Any;

use stratum_ecs::EntityDatabase;

use crate::EngineError;

mod culling;
mod debug_scene;
mod transform;

pub use culling::CullingEngine;
pub use debug_scene::{DebugSceneEngine, SceneConfig};
pub use transform::TransformEngine;

/// A unit of per-frame work over the database.
///
/// Engines read view collections with `query_group`/`query_one` and write
/// through the implementer pointers those views carry.
pub trait Engine: 'static {
    /// Unique name within a [`FrameLoop`](crate::frame::FrameLoop).
    fn name(&self) -> &str;

    /// Advance one frame. An error stops the rest of the frame.
    fn step(&mut self, db: &mut EntityDatabase) -> Result<(), EngineError>;
}

/// Object-safe face of an [`Engine`] that can be downcast back to its
/// concrete type.
pub(crate) trait AnyEngine: Engine {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Engine> AnyEngine for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
