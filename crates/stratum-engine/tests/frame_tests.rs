//! Frame-loop integration tests: the stock engines running together over one
//! database.

use proptest::prelude::*;
use stratum_engine::prelude::*;

fn stock_loop(scene: SceneConfig, region: Aabb) -> FrameLoop {
    let mut frames = FrameLoop::new(EntityDatabase::new());
    frames.add_engine(DebugSceneEngine::new(scene));
    frames.add_engine(TransformEngine::new());
    frames.add_engine(CullingEngine::new(region));
    frames
}

#[test]
fn stock_engines_run_in_order() {
    let mut frames = stock_loop(
        SceneConfig::default(),
        Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)),
    );
    frames.run_frames(4).unwrap();

    assert_eq!(frames.frame_count(), 4);
    assert_eq!(frames.engine_count(), 3);
    assert_eq!(
        frames.engine_names(),
        vec!["debug_scene", "transform", "culling"]
    );
    let meshes = frames
        .database()
        .view_count::<MeshRenderableView>(groups::ACTIVE);
    assert_eq!(meshes, 2 + 256 + 32);
    assert_eq!(
        frames.engine::<TransformEngine>().unwrap().updated(),
        meshes
    );

    // Rocks scatter over +-70 on x and z, so a +-50 region sees some but not
    // all of them.
    let visible = frames.engine::<CullingEngine>().unwrap().visible_count();
    assert!(visible > 0 && visible < meshes, "visible = {visible}");
}

#[test]
fn visibility_components_agree_with_the_culling_engine() {
    let mut frames = stock_loop(
        SceneConfig {
            seed: 21,
            mesh_count: 40,
            light_count: 6,
        },
        Aabb::new(Vec3::splat(-30.0), Vec3::splat(30.0)),
    );
    frames.run_frames(2).unwrap();

    let visible: Vec<Egid> = frames.engine::<CullingEngine>().unwrap().visible().to_vec();
    let db = frames.database();
    for view in db.query_group::<MeshRenderableView>(groups::ACTIVE).unwrap() {
        let visibility = db.implementer(view.visibility.unwrap()).unwrap();
        assert_eq!(visibility.last_frame, 2);
        assert_eq!(visibility.visible, visible.contains(&view.gid), "{}", view.gid);
    }
}

#[test]
fn moved_entity_is_culled_next_frame() {
    let mut frames = FrameLoop::new(EntityDatabase::new());
    frames.add_engine(TransformEngine::new());
    frames.add_engine(CullingEngine::new(Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0))));

    let egid =
        build_mesh_renderable_entity(frames.database_mut(), &MeshRenderableDesc::default())
            .unwrap();
    frames.frame().unwrap();
    assert_eq!(frames.engine::<CullingEngine>().unwrap().visible(), &[egid]);

    let transform = frames
        .database()
        .query_one::<TransformView>(egid)
        .unwrap()
        .transform
        .unwrap();
    frames.database_mut().implementer_mut(transform).unwrap().position =
        Vec3::new(500.0, 0.0, 0.0);
    frames.frame().unwrap();
    assert_eq!(frames.engine::<CullingEngine>().unwrap().visible_count(), 0);
}

#[test]
fn services_release_the_database_last_in_first_out() {
    struct Clock;

    let mut services = ServiceRegistry::new();
    services.register(Clock);
    let frames = stock_loop(
        SceneConfig {
            mesh_count: 4,
            light_count: 1,
            ..Default::default()
        },
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
    );
    services.register(frames.into_database());

    assert!(services.contains::<Clock>());
    assert_eq!(services.get::<EntityDatabase>().unwrap().issued_entities(), 0);
    services.shutdown();
    assert!(!services.contains::<EntityDatabase>());
}

#[test]
fn config_drives_a_full_run() {
    let config = EngineConfig::from_json_str(
        r#"{
            "database": { "bucket_byte_budget": 256 },
            "random_seed": 3,
            "mesh_count": 12,
            "light_count": 2,
            "frame_count": 3
        }"#,
    )
    .unwrap();

    let half = config.cull_half_extent;
    let mut frames = FrameLoop::new(EntityDatabase::with_config(config.database));
    frames.add_engine(DebugSceneEngine::new(config.scene()));
    frames.add_engine(TransformEngine::new());
    frames.add_engine(CullingEngine::new(Aabb::new(Vec3::splat(-half), Vec3::splat(half))));
    frames.run_frames(config.frame_count).unwrap();

    assert_eq!(frames.frame_count(), 3);
    assert_eq!(frames.database().config().bucket_byte_budget, 256);
    // Small buckets mean many of them, and nothing moved.
    assert!(frames.database().bucket_count::<Transform>() > 1);
    // Ground and column, rocks, light spheres, and the sun.
    assert_eq!(frames.database().issued_entities(), 2 + 12 + 2 + 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After a transform pass every mesh's world bounds contain its position,
    /// and a region enclosing the whole scene sees every mesh.
    #[test]
    fn world_bounds_enclose_positions(
        seed in any::<u64>(),
        mesh_count in 0..60u32,
        light_count in 0..8u32,
    ) {
        let mut frames = stock_loop(
            SceneConfig { seed, mesh_count, light_count },
            Aabb::new(Vec3::splat(-1_000.0), Vec3::splat(1_000.0)),
        );
        frames.frame().unwrap();

        let db = frames.database();
        let views = db.query_group::<TransformView>(groups::ACTIVE).unwrap();
        prop_assert_eq!(views.len() as u32, 2 + mesh_count + light_count);
        for view in views {
            let transform = db.implementer(view.transform.unwrap()).unwrap();
            let world = db.implementer(view.world_bounds.unwrap()).unwrap().0;
            let grown =
                Aabb::from_center_extents(world.center(), world.extents() + Vec3::splat(1e-3));
            prop_assert!(grown.contains_point(transform.position), "{:?} {:?}", world, transform.position);
        }
        prop_assert_eq!(
            frames.engine::<CullingEngine>().unwrap().visible_count() as u32,
            2 + mesh_count + light_count
        );
    }
}
