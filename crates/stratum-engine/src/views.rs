//! Stock entity views. Each view is a per-engine window onto an entity's
//! implementers; an entity is published into every view an engine needs.

use stratum_ecs::prelude::*;

use crate::components::{Light, LocalBounds, MeshRenderable, Transform, Visibility, WorldBounds};

macro_rules! entity_view {
    ($view:ty) => {
        impl EntityView for $view {
            fn gid(&self) -> Egid {
                self.gid
            }
            fn set_gid(&mut self, gid: Egid) {
                self.gid = gid;
            }
        }
    };
}

// ---------------------------------------------------------------------------
// TransformView
// ---------------------------------------------------------------------------

/// What the transform engine needs to refresh world bounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformView {
    pub gid: Egid,
    pub transform: Option<ImplementerPtr<Transform>>,
    pub local_bounds: Option<ImplementerPtr<LocalBounds>>,
    pub world_bounds: Option<ImplementerPtr<WorldBounds>>,
}
entity_view!(TransformView);

pub struct TransformFields {
    pub transform: ImplementerPtr<Transform>,
    pub local_bounds: ImplementerPtr<LocalBounds>,
    pub world_bounds: ImplementerPtr<WorldBounds>,
}

impl BindView for TransformView {
    type Fields = TransformFields;
    fn bind(&mut self, fields: TransformFields) {
        self.transform = Some(fields.transform);
        self.local_bounds = Some(fields.local_bounds);
        self.world_bounds = Some(fields.world_bounds);
    }
}

// ---------------------------------------------------------------------------
// MeshRenderableView
// ---------------------------------------------------------------------------

/// What culling and drawing need for one mesh.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshRenderableView {
    pub gid: Egid,
    pub transform: Option<ImplementerPtr<Transform>>,
    pub bounds: Option<ImplementerPtr<WorldBounds>>,
    pub renderable: Option<ImplementerPtr<MeshRenderable>>,
    pub visibility: Option<ImplementerPtr<Visibility>>,
}
entity_view!(MeshRenderableView);

pub struct MeshRenderableFields {
    pub transform: ImplementerPtr<Transform>,
    pub bounds: ImplementerPtr<WorldBounds>,
    pub renderable: ImplementerPtr<MeshRenderable>,
    pub visibility: ImplementerPtr<Visibility>,
}

impl BindView for MeshRenderableView {
    type Fields = MeshRenderableFields;
    fn bind(&mut self, fields: MeshRenderableFields) {
        self.transform = Some(fields.transform);
        self.bounds = Some(fields.bounds);
        self.renderable = Some(fields.renderable);
        self.visibility = Some(fields.visibility);
    }
}

// ---------------------------------------------------------------------------
// LightView / LightSphereView
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct LightView {
    pub gid: Egid,
    pub transform: Option<ImplementerPtr<Transform>>,
    pub light: Option<ImplementerPtr<Light>>,
}
entity_view!(LightView);

pub struct LightViewFields {
    pub transform: ImplementerPtr<Transform>,
    pub light: ImplementerPtr<Light>,
}

impl BindView for LightView {
    type Fields = LightViewFields;
    fn bind(&mut self, fields: LightViewFields) {
        self.transform = Some(fields.transform);
        self.light = Some(fields.light);
    }
}

/// A light drawn as a small emissive sphere. The sphere mesh and the light
/// keep separate transforms so they can be animated together.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightSphereView {
    pub gid: Egid,
    pub transform_mesh: Option<ImplementerPtr<Transform>>,
    pub transform_light: Option<ImplementerPtr<Transform>>,
}
entity_view!(LightSphereView);

pub struct LightSphereFields {
    pub transform_mesh: ImplementerPtr<Transform>,
    pub transform_light: ImplementerPtr<Transform>,
}

impl BindView for LightSphereView {
    type Fields = LightSphereFields;
    fn bind(&mut self, fields: LightSphereFields) {
        self.transform_mesh = Some(fields.transform_mesh);
        self.transform_light = Some(fields.transform_light);
    }
}
