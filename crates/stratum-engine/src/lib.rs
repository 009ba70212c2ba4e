//! Stratum Engine -- frame loop, stock components, and engines on top of
//! [`stratum_ecs`].
//!
//! Engines are the callers of the entity database: each one steps over the
//! database once per frame, iterating the view collections it cares about and
//! writing through the implementer pointers those views carry. The
//! [`FrameLoop`](frame::FrameLoop) steps them in registration order.
//!
//! # Quick Start
//!
//! ```
//! use stratum_engine::prelude::*;
//!
//! let mut frames = FrameLoop::new(EntityDatabase::new());
//! frames.add_engine(DebugSceneEngine::new(SceneConfig {
//!     mesh_count: 8,
//!     light_count: 2,
//!     ..Default::default()
//! }));
//! frames.add_engine(TransformEngine::new());
//! frames.add_engine(CullingEngine::new(Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0))));
//!
//! // Ground plane and column, eight rocks, two light spheres. The sun has no
//! // mesh and is never culled.
//! frames.run_frames(3).unwrap();
//! assert_eq!(frames.frame_count(), 3);
//! assert_eq!(frames.engine::<CullingEngine>().unwrap().visible_count(), 12);
//! ```

#![deny(unsafe_code)]

pub mod builders;
pub mod components;
pub mod config;
pub mod engines;
pub mod frame;
pub mod logging;
pub mod services;
pub mod views;

use std::path::PathBuf;

use stratum_ecs::DbError;

/// Re-export the storage crate for convenience.
pub use stratum_ecs;

/// Re-export the math crate the stock components are built on.
pub use glam;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by engines, the frame loop, and configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A database precondition failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// An engine's step failed; the rest of the frame was skipped.
    #[error("engine '{engine}' failed at frame {frame}: {source}")]
    EngineFailed {
        engine: String,
        frame: u64,
        #[source]
        source: Box<EngineError>,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use glam::{EulerRot, Quat, Vec3};
    pub use stratum_ecs::prelude::*;

    pub use crate::builders::{
        build_light_entity, build_light_sphere_entity, build_mesh_renderable_entity, LightDesc,
        LightSphereDesc, MeshRenderableDesc,
    };
    pub use crate::components::{
        rotation_from_euler, Aabb, Light, LightKind, LocalBounds, MeshRenderable, Transform,
        Visibility, WorldBounds,
    };
    pub use crate::config::EngineConfig;
    pub use crate::engines::{
        CullingEngine, DebugSceneEngine, Engine, SceneConfig, TransformEngine,
    };
    pub use crate::frame::{FrameDiagnostics, FrameLoop};
    pub use crate::services::ServiceRegistry;
    pub use crate::views::{
        LightSphereFields, LightSphereView, LightView, LightViewFields, MeshRenderableFields,
        MeshRenderableView, TransformFields, TransformView,
    };
    pub use crate::EngineError;
}
