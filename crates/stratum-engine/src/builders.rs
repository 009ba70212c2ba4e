//! Entity builders: reserve an id in the active group, the implementers an
//! entity needs, and publish it into every matching view.

use glam::Vec3;
use stratum_ecs::prelude::*;

use crate::components::{
    Aabb, Light, LightKind, LocalBounds, MeshRenderable, Transform, Visibility, WorldBounds,
};
use crate::views::{
    LightSphereFields, LightSphereView, LightView, LightViewFields, MeshRenderableFields,
    MeshRenderableView, TransformFields, TransformView,
};

/// Everything needed to place one mesh in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshRenderableDesc {
    pub mesh: u32,
    pub submesh: u32,
    pub material: u32,
    pub position: Vec3,
    /// Pitch, yaw, roll in degrees.
    pub euler: Vec3,
    pub size: f32,
    pub local_bounds: Aabb,
}

impl Default for MeshRenderableDesc {
    fn default() -> Self {
        Self {
            mesh: 0,
            submesh: 0,
            material: 0,
            position: Vec3::ZERO,
            euler: Vec3::ZERO,
            size: 1.0,
            local_bounds: Aabb::unit_cube(),
        }
    }
}

/// A light with a visible sphere at its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSphereDesc {
    pub position: Vec3,
    pub kind: LightKind,
    pub color: Vec3,
    pub radius: f32,
    pub sphere_mesh: u32,
    pub material: u32,
    /// Radius of the drawn sphere.
    pub sphere_size: f32,
}

impl Default for LightSphereDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            kind: LightKind::Point,
            color: Vec3::ONE,
            radius: 10.0,
            sphere_mesh: 0,
            material: 0,
            sphere_size: 0.2,
        }
    }
}

/// A light with no mesh, such as the sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub position: Vec3,
    /// Pitch, yaw, roll in degrees; a directional light shines along the
    /// rotated -z axis.
    pub euler: Vec3,
    pub kind: LightKind,
    pub color: Vec3,
    pub radius: f32,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            euler: Vec3::ZERO,
            kind: LightKind::Directional,
            color: Vec3::ONE,
            radius: 1000.0,
        }
    }
}

/// Mesh implementers shared by the mesh builders. Returns the mesh transform.
fn publish_mesh(
    db: &mut EntityDatabase,
    egid: Egid,
    transform: Transform,
    local_bounds: Aabb,
    renderable: MeshRenderable,
) -> Result<ImplementerPtr<Transform>, DbError> {
    let transform_ptr = db.reserve_implementer::<Transform>();
    let local_ptr = db.reserve_implementer::<LocalBounds>();
    let world_ptr = db.reserve_implementer::<WorldBounds>();
    let renderable_ptr = db.reserve_implementer::<MeshRenderable>();
    let visibility_ptr = db.reserve_implementer::<Visibility>();

    *db.implementer_mut(transform_ptr)? = transform;
    *db.implementer_mut(local_ptr)? = LocalBounds(local_bounds);
    *db.implementer_mut(world_ptr)? = WorldBounds(local_bounds.transformed(&transform));
    *db.implementer_mut(renderable_ptr)? = renderable;

    db.bind_view::<TransformView>(
        egid,
        TransformFields {
            transform: transform_ptr,
            local_bounds: local_ptr,
            world_bounds: world_ptr,
        },
    )?;
    db.bind_view::<MeshRenderableView>(
        egid,
        MeshRenderableFields {
            transform: transform_ptr,
            bounds: world_ptr,
            renderable: renderable_ptr,
            visibility: visibility_ptr,
        },
    )?;
    Ok(transform_ptr)
}

/// Create an active mesh entity, published into [`TransformView`] and
/// [`MeshRenderableView`].
pub fn build_mesh_renderable_entity(
    db: &mut EntityDatabase,
    desc: &MeshRenderableDesc,
) -> Result<Egid, DbError> {
    let egid = db.new_entity_id_in(groups::ACTIVE)?;
    let transform = Transform::from_euler_degrees(desc.position, desc.euler, desc.size);
    let renderable = MeshRenderable {
        mesh: desc.mesh,
        submesh: desc.submesh,
        material: desc.material,
    };
    publish_mesh(db, egid, transform, desc.local_bounds, renderable)?;

    tracing::trace!(egid = %egid, mesh = desc.mesh, "built mesh renderable");
    Ok(egid)
}

/// Create an active light entity with a sphere mesh, published into the mesh
/// views plus [`LightView`] and [`LightSphereView`].
pub fn build_light_sphere_entity(
    db: &mut EntityDatabase,
    desc: &LightSphereDesc,
) -> Result<Egid, DbError> {
    let egid = db.new_entity_id_in(groups::ACTIVE)?;
    let mesh_transform = Transform {
        position: desc.position,
        scale: Vec3::splat(desc.sphere_size),
        ..Default::default()
    };
    let renderable = MeshRenderable {
        mesh: desc.sphere_mesh,
        submesh: 0,
        material: desc.material,
    };
    let transform_mesh = publish_mesh(
        db,
        egid,
        mesh_transform,
        Aabb::unit_cube(),
        renderable,
    )?;

    let transform_light = db.reserve_implementer::<Transform>();
    let light = db.reserve_implementer::<Light>();
    db.implementer_mut(transform_light)?.position = desc.position;
    *db.implementer_mut(light)? = Light {
        color: desc.color,
        radius: desc.radius,
        kind: desc.kind,
    };

    db.bind_view::<LightView>(
        egid,
        LightViewFields {
            transform: transform_light,
            light,
        },
    )?;
    db.bind_view::<LightSphereView>(
        egid,
        LightSphereFields {
            transform_mesh,
            transform_light,
        },
    )?;

    tracing::trace!(egid = %egid, kind = ?desc.kind, "built light sphere");
    Ok(egid)
}

/// Create an active light entity without a mesh, published into
/// [`LightView`] only.
pub fn build_light_entity(db: &mut EntityDatabase, desc: &LightDesc) -> Result<Egid, DbError> {
    let egid = db.new_entity_id_in(groups::ACTIVE)?;
    let transform = db.reserve_implementer::<Transform>();
    let light = db.reserve_implementer::<Light>();
    *db.implementer_mut(transform)? = Transform::from_euler_degrees(desc.position, desc.euler, 1.0);
    *db.implementer_mut(light)? = Light {
        color: desc.color,
        radius: desc.radius,
        kind: desc.kind,
    };
    db.bind_view::<LightView>(egid, LightViewFields { transform, light })?;

    tracing::trace!(egid = %egid, kind = ?desc.kind, "built light");
    Ok(egid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_entity_is_published_into_both_views() {
        let mut db = EntityDatabase::new();
        let egid = build_mesh_renderable_entity(
            &mut db,
            &MeshRenderableDesc {
                mesh: 4,
                material: 9,
                position: Vec3::new(1.0, 2.0, 3.0),
                size: 2.0,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(egid, Egid::new(1, groups::ACTIVE));
        let transform_view = *db.query_one::<TransformView>(egid).unwrap();
        let mesh_view = *db.query_one::<MeshRenderableView>(egid).unwrap();
        assert_eq!(transform_view.transform, mesh_view.transform);
        assert_eq!(transform_view.world_bounds, mesh_view.bounds);

        let renderable = db.implementer(mesh_view.renderable.unwrap()).unwrap();
        assert_eq!((renderable.mesh, renderable.material), (4, 9));
        let bounds = db.implementer(mesh_view.bounds.unwrap()).unwrap().0;
        assert_eq!(bounds, Aabb::new(Vec3::new(-1.0, 0.0, 1.0), Vec3::new(3.0, 4.0, 5.0)));
        assert!(!db.implementer(mesh_view.visibility.unwrap()).unwrap().visible);
    }

    #[test]
    fn light_sphere_keeps_mesh_and_light_transforms_apart() {
        let mut db = EntityDatabase::new();
        let egid = build_light_sphere_entity(
            &mut db,
            &LightSphereDesc {
                position: Vec3::new(5.0, 1.0, -5.0),
                kind: LightKind::Spot,
                color: Vec3::new(2.0, 1.0, 0.5),
                ..Default::default()
            },
        )
        .unwrap();

        let sphere = *db.query_one::<LightSphereView>(egid).unwrap();
        let mesh = sphere.transform_mesh.unwrap();
        let light = sphere.transform_light.unwrap();
        assert_ne!(mesh, light);
        assert_eq!(db.implementer(mesh).unwrap().position, Vec3::new(5.0, 1.0, -5.0));
        assert_eq!(db.implementer(light).unwrap().position, Vec3::new(5.0, 1.0, -5.0));
        assert_eq!(db.implementer(mesh).unwrap().scale, Vec3::splat(0.2));

        let light_view = *db.query_one::<LightView>(egid).unwrap();
        assert_eq!(light_view.transform, Some(light));
        let light = db.implementer(light_view.light.unwrap()).unwrap();
        assert_eq!(light.kind, LightKind::Spot);

        // The sphere is a mesh too.
        assert_eq!(db.query_group::<MeshRenderableView>(groups::ACTIVE).unwrap().len(), 1);
        assert_eq!(db.query_group::<TransformView>(groups::ACTIVE).unwrap().len(), 1);
    }

    #[test]
    fn sun_is_a_light_without_a_mesh() {
        let mut db = EntityDatabase::new();
        let egid = build_light_entity(
            &mut db,
            &LightDesc {
                euler: Vec3::new(0.0, 90.0, 0.0),
                color: Vec3::new(3.0, 2.0, 1.0),
                ..Default::default()
            },
        )
        .unwrap();

        let view = *db.query_one::<LightView>(egid).unwrap();
        let light = *db.implementer(view.light.unwrap()).unwrap();
        assert_eq!(light.kind, LightKind::Directional);
        assert_eq!(light.radius, 1000.0);
        let forward = db.implementer(view.transform.unwrap()).unwrap().rotation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::NEG_X, 1e-5), "{forward:?}");

        assert_eq!(db.view_count::<MeshRenderableView>(groups::ACTIVE), 0);
        assert_eq!(db.view_count::<LightSphereView>(groups::ACTIVE), 0);
        assert!(db.query_one::<TransformView>(egid).is_err());
    }

    #[test]
    fn builders_issue_consecutive_ids() {
        let mut db = EntityDatabase::new();
        let a = build_mesh_renderable_entity(&mut db, &MeshRenderableDesc::default()).unwrap();
        let b = build_light_sphere_entity(&mut db, &LightSphereDesc::default()).unwrap();
        let c = build_mesh_renderable_entity(&mut db, &MeshRenderableDesc::default()).unwrap();
        assert_eq!([a.entity(), b.entity(), c.entity()], [1, 2, 3]);
        assert_eq!(db.view_count::<MeshRenderableView>(groups::ACTIVE), 3);
        assert_eq!(db.view_count::<LightSphereView>(groups::ACTIVE), 1);
    }
}
