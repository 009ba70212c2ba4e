//! Headless demo: seed the debug scene and run the stock engines for a fixed
//! number of frames.
//!
//! Usage: `stratum-demo [config.json]`

use anyhow::Context;
use stratum_engine::logging::init_logging;
use stratum_engine::prelude::*;

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_filter);

    let half = config.cull_half_extent;
    let mut frames = FrameLoop::new(EntityDatabase::with_config(config.database));
    frames.add_engine(DebugSceneEngine::new(config.scene()));
    frames.add_engine(TransformEngine::new());
    frames.add_engine(CullingEngine::new(Aabb::new(Vec3::splat(-half), Vec3::splat(half))));

    frames
        .run_frames(config.frame_count)
        .context("frame loop failed")?;

    let visible = frames
        .engine::<CullingEngine>()
        .map(CullingEngine::visible_count)
        .unwrap_or_default();
    let stats = frames.database().stats();
    tracing::info!(
        frames = frames.frame_count(),
        visible,
        meshes = frames.database().view_count::<MeshRenderableView>(groups::ACTIVE),
        buckets = stats.buckets,
        "demo finished"
    );

    // The database outlives the engines; services release it last-in first-out.
    let mut services = ServiceRegistry::new();
    services.register(frames.into_database());
    services.shutdown();
    Ok(())
}
