//! Stock implementer types used by the built-in engines.
//!
//! Math types come from `glam`; rotations are unit quaternions.

use glam::{EulerRot, Mat3, Quat, Vec3};
use stratum_ecs::implementer::Implementer;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Position, rotation, and per-axis scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Implementer for Transform {}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Build a transform from a position, Euler angles in degrees
    /// (pitch, yaw, roll), and a uniform scale.
    pub fn from_euler_degrees(position: Vec3, euler: Vec3, size: f32) -> Self {
        let euler = euler * std::f32::consts::PI / 180.0;
        Self {
            position,
            rotation: rotation_from_euler(euler),
            scale: Vec3::splat(size),
        }
    }
}

/// Rotation for Euler angles in radians, composed as roll * yaw * pitch
/// (the convention of glm's `quat(vec3)`).
pub fn rotation_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, euler.z, euler.y, euler.x)
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The box from -1 to 1 on every axis.
    pub fn unit_cube() -> Self {
        Self::new(Vec3::NEG_ONE, Vec3::ONE)
    }

    /// Box centered at `center` with half-size `extents`.
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Whether the boxes overlap. Touching faces count as overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && point.cmple(self.max).all()
    }

    /// The tightest axis-aligned box around `self` after scaling, rotating,
    /// and translating it by `transform`.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let rotation = Mat3::from_quat(transform.rotation);
        let center = transform.position + rotation * (self.center() * transform.scale);
        let half = self.extents() * transform.scale.abs();
        let extents = rotation.x_axis.abs() * half.x
            + rotation.y_axis.abs() * half.y
            + rotation.z_axis.abs() * half.z;
        Aabb::from_center_extents(center, extents)
    }
}

/// Object-space bounds of an entity's mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalBounds(pub Aabb);
impl Implementer for LocalBounds {}

/// World-space bounds, recomputed each frame by the transform engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldBounds(pub Aabb);
impl Implementer for WorldBounds {}

// ---------------------------------------------------------------------------
// Renderables
// ---------------------------------------------------------------------------

/// Which mesh, submesh, and material an entity draws with. Handles are opaque
/// ids owned by whatever asset layer the caller uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshRenderable {
    pub mesh: u32,
    pub submesh: u32,
    pub material: u32,
}
impl Implementer for MeshRenderable {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    #[default]
    Point,
    Spot,
    Directional,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Light {
    /// Linear RGB, pre-multiplied by intensity.
    pub color: Vec3,
    pub radius: f32,
    pub kind: LightKind,
}
impl Implementer for Light {}

/// Culling result for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub visible: bool,
    /// Last frame the culling engine evaluated this entity.
    pub last_frame: u64,
}
impl Implementer for Visibility {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
