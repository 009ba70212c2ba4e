use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use stratum_ecs::prelude::*;

use crate::builders::{
    build_light_entity, build_light_sphere_entity, build_mesh_renderable_entity, LightDesc,
    LightSphereDesc, MeshRenderableDesc,
};
use crate::components::{rotation_from_euler, Aabb, LightKind};
use crate::engines::Engine;
use crate::views::LightSphereView;
use crate::EngineError;

// Opaque asset handles the debug scene draws with.
pub const PLANE_MESH: u32 = 0;
pub const COLUMN_MESH: u32 = 1;
pub const ROCKS_MESH: u32 = 2;
pub const SPHERE_MESH: u32 = 3;
pub const ROCK_SUBMESHES: u32 = 8;

pub const SAND_MATERIAL: u32 = 0;
pub const ASPHALT_MATERIAL: u32 = 1;
pub const MARBLE_MATERIAL: u32 = 2;
pub const PLASTER_MATERIAL: u32 = 3;
pub const EMISSIVE_MATERIAL: u32 = 4;

const SCATTER_MIN: Vec3 = Vec3::new(-70.0, -6.0, -70.0);
const SCATTER_MAX: Vec3 = Vec3::new(70.0, -4.0, 70.0);
/// Warm sunlight, `#6D563D`.
const SUN_RGB: [u8; 3] = [0x6D, 0x56, 0x3D];
const SUN_INTENSITY: f32 = 8.0;
const SPIN_PER_FRAME: f32 = 1.0 / 60.0;

/// Size and seed of the generated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub seed: u64,
    /// Scattered rocks, half marble and half plaster.
    pub mesh_count: u32,
    pub light_count: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 512,
            mesh_count: 256,
            light_count: 32,
        }
    }
}

/// Builds a deterministic test scene on its first step, then spins every
/// light sphere around its vertical axis.
///
/// The scene is a ground plane, one column, `mesh_count` rocks scattered over
/// the ground, `light_count` light spheres alternating spot and point, and a
/// directional sun.
#[derive(Debug)]
pub struct DebugSceneEngine {
    config: SceneConfig,
    entities: Vec<Egid>,
    seeded: bool,
    frame: u64,
}

impl DebugSceneEngine {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            entities: Vec::new(),
            seeded: false,
            frame: 0,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Every entity the scene created, in creation order.
    pub fn entities(&self) -> &[Egid] {
        &self.entities
    }

    fn seed_scene(&mut self, db: &mut EntityDatabase) -> Result<(), EngineError> {
        let mut rng = Pcg64Mcg::seed_from_u64(self.config.seed);

        let ground = MeshRenderableDesc {
            mesh: PLANE_MESH,
            material: SAND_MATERIAL,
            position: Vec3::new(0.0, -5.0, 0.0),
            euler: Vec3::new(90.0, 0.0, 0.0),
            size: 80.0,
            local_bounds: Aabb::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
            ..Default::default()
        };
        self.entities.push(build_mesh_renderable_entity(db, &ground)?);

        let column = MeshRenderableDesc {
            mesh: COLUMN_MESH,
            material: ASPHALT_MATERIAL,
            position: Vec3::new(-20.0, 5.0, -20.0),
            size: 3.0,
            local_bounds: Aabb::new(Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
            ..Default::default()
        };
        self.entities.push(build_mesh_renderable_entity(db, &column)?);

        let half = self.config.mesh_count / 2;
        for i in 0..self.config.mesh_count {
            let rock = MeshRenderableDesc {
                mesh: ROCKS_MESH,
                submesh: rng.gen_range(0..ROCK_SUBMESHES),
                material: if i < half {
                    MARBLE_MATERIAL
                } else {
                    PLASTER_MATERIAL
                },
                position: random_point(&mut rng),
                euler: Vec3::new(
                    rng.gen_range(0.0..360.0),
                    rng.gen_range(0.0..360.0),
                    rng.gen_range(0.0..360.0),
                ),
                size: rng.gen_range(1.0..3.0),
                ..Default::default()
            };
            self.entities.push(build_mesh_renderable_entity(db, &rock)?);
        }

        for i in 0..self.config.light_count {
            let position = random_point(&mut rng) + Vec3::Y;
            let hue: f32 = rng.gen_range(0.0..1.0);
            let intensity: f32 = rng.gen_range(2.0..7.0);
            let light = LightSphereDesc {
                position,
                kind: if i % 2 == 0 {
                    LightKind::Spot
                } else {
                    LightKind::Point
                },
                color: hue_to_rgb(hue) * intensity,
                sphere_mesh: SPHERE_MESH,
                material: EMISSIVE_MATERIAL,
                ..Default::default()
            };
            self.entities.push(build_light_sphere_entity(db, &light)?);
        }

        let sun = LightDesc {
            euler: Vec3::new(25.0, -35.0, 0.0),
            kind: LightKind::Directional,
            color: Vec3::from_array(SUN_RGB.map(|c| f32::from(c) / 255.0)) * SUN_INTENSITY,
            radius: 1000.0,
            ..Default::default()
        };
        self.entities.push(build_light_entity(db, &sun)?);

        self.seeded = true;
        tracing::info!(
            seed = self.config.seed,
            entities = self.entities.len(),
            lights = self.config.light_count,
            "debug scene seeded"
        );
        Ok(())
    }

    fn spin_lights(&self, db: &mut EntityDatabase) -> Result<(), EngineError> {
        let time = self.frame as f32 * SPIN_PER_FRAME;
        let spheres: Vec<LightSphereView> =
            db.query_group::<LightSphereView>(groups::ACTIVE)?.to_vec();

        for (i, sphere) in spheres.iter().enumerate() {
            let rotation = rotation_from_euler(Vec3::new(0.0, time + i as f32, 0.0));
            if let Some(light) = sphere.transform_light {
                db.implementer_mut(light)?.rotation = rotation;
            }
            if let Some(mesh) = sphere.transform_mesh {
                db.implementer_mut(mesh)?.rotation = rotation;
            }
        }
        Ok(())
    }
}

impl Engine for DebugSceneEngine {
    fn name(&self) -> &str {
        "debug_scene"
    }

    fn step(&mut self, db: &mut EntityDatabase) -> Result<(), EngineError> {
        if !self.seeded {
            self.seed_scene(db)?;
        }
        self.frame += 1;
        self.spin_lights(db)
    }
}

fn random_point(rng: &mut Pcg64Mcg) -> Vec3 {
    Vec3::new(
        rng.gen_range(SCATTER_MIN.x..SCATTER_MAX.x),
        rng.gen_range(SCATTER_MIN.y..SCATTER_MAX.y),
        rng.gen_range(SCATTER_MIN.z..SCATTER_MAX.z),
    )
}

/// Fully saturated color for `hue` in `[0, 1)`.
fn hue_to_rgb(hue: f32) -> Vec3 {
    let h = hue * 6.0;
    Vec3::new(
        (h - 3.0).abs() - 1.0,
        2.0 - (h - 2.0).abs(),
        2.0 - (h - 4.0).abs(),
    )
    .clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Light, Transform};
    use glam::Quat;
    use crate::views::{LightView, MeshRenderableView};

    fn small_scene(seed: u64) -> SceneConfig {
        SceneConfig {
            seed,
            mesh_count: 10,
            light_count: 4,
        }
    }

    fn positions(db: &EntityDatabase) -> Vec<Vec3> {
        db.query_group::<MeshRenderableView>(groups::ACTIVE)
            .unwrap()
            .iter()
            .map(|v| db.implementer(v.transform.unwrap()).unwrap().position)
            .collect()
    }

    #[test]
    fn first_step_seeds_once() {
        let mut db = EntityDatabase::new();
        let mut engine = DebugSceneEngine::new(small_scene(1));
        engine.step(&mut db).unwrap();
        engine.step(&mut db).unwrap();

        assert!(engine.is_seeded());
        assert_eq!(engine.entities().len(), 2 + 10 + 4 + 1);
        assert_eq!(db.view_count::<MeshRenderableView>(groups::ACTIVE), 16);
        assert_eq!(db.view_count::<LightSphereView>(groups::ACTIVE), 4);
        assert_eq!(db.view_count::<LightView>(groups::ACTIVE), 5);
        assert_eq!(db.issued_entities(), 17);
    }

    #[test]
    fn same_seed_same_scene() {
        let mut a = EntityDatabase::new();
        let mut b = EntityDatabase::new();
        DebugSceneEngine::new(small_scene(99)).step(&mut a).unwrap();
        DebugSceneEngine::new(small_scene(99)).step(&mut b).unwrap();
        assert_eq!(positions(&a), positions(&b));

        let mut c = EntityDatabase::new();
        DebugSceneEngine::new(small_scene(100)).step(&mut c).unwrap();
        assert_ne!(positions(&a), positions(&c));
    }

    #[test]
    fn rocks_land_inside_the_scatter_box() {
        let mut db = EntityDatabase::new();
        DebugSceneEngine::new(small_scene(5)).step(&mut db).unwrap();
        // Skip the ground plane and the column.
        for position in &positions(&db)[2..12] {
            assert!(position.cmpge(SCATTER_MIN).all(), "{position:?}");
            assert!(position.cmplt(SCATTER_MAX).all(), "{position:?}");
        }
    }

    #[test]
    fn lights_alternate_spot_and_point() {
        let mut db = EntityDatabase::new();
        DebugSceneEngine::new(small_scene(3)).step(&mut db).unwrap();
        let kinds: Vec<LightKind> = db
            .query_group::<LightView>(groups::ACTIVE)
            .unwrap()
            .iter()
            .map(|v| {
                let light: &Light = db.implementer(v.light.unwrap()).unwrap();
                light.kind
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                LightKind::Spot,
                LightKind::Point,
                LightKind::Spot,
                LightKind::Point,
                LightKind::Directional,
            ]
        );
    }

    #[test]
    fn spinning_moves_mesh_and_light_together() {
        let mut db = EntityDatabase::new();
        let mut engine = DebugSceneEngine::new(small_scene(8));
        engine.step(&mut db).unwrap();
        engine.step(&mut db).unwrap();

        for sphere in db.query_group::<LightSphereView>(groups::ACTIVE).unwrap() {
            let mesh: &Transform = db.implementer(sphere.transform_mesh.unwrap()).unwrap();
            let light: &Transform = db.implementer(sphere.transform_light.unwrap()).unwrap();
            assert_eq!(mesh.rotation, light.rotation);
            assert_ne!(light.rotation, Quat::IDENTITY);
        }
    }

    #[test]
    fn hue_wheel_primaries() {
        assert_eq!(hue_to_rgb(0.0), Vec3::X);
        assert!(hue_to_rgb(1.0 / 3.0).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(hue_to_rgb(2.0 / 3.0).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn sun_is_seeded_last() {
        let mut db = EntityDatabase::new();
        let mut engine = DebugSceneEngine::new(small_scene(2));
        engine.step(&mut db).unwrap();

        let sun = *engine.entities().last().unwrap();
        let view = *db.query_one::<LightView>(sun).unwrap();
        let light: &Light = db.implementer(view.light.unwrap()).unwrap();
        assert_eq!(light.kind, LightKind::Directional);
        assert!(light.color.abs_diff_eq(Vec3::new(109.0, 86.0, 61.0) / 255.0 * 8.0, 1e-5));
        assert!(db.query_one::<LightSphereView>(sun).is_err());

        // Spinning only touches light spheres.
        let rotation = db.implementer(view.transform.unwrap()).unwrap().rotation;
        engine.step(&mut db).unwrap();
        assert_eq!(db.implementer(view.transform.unwrap()).unwrap().rotation, rotation);
        assert_ne!(rotation, Quat::IDENTITY);
    }
}
