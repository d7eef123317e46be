//! Placement poses.

use glam::{Quat, Vec3};

/// Position and orientation of a mesh chunk relative to a space origin.
///
/// Stored verbatim in each chunk and reapplied verbatim on load; nothing in
/// the codec renormalizes the rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    /// Origin position with no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Number of `f32` values in the wire representation.
    pub const FLOAT_COUNT: usize = 7;

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Wire order: position x, y, z then rotation x, y, z, w.
    pub fn to_array(&self) -> [f32; Self::FLOAT_COUNT] {
        let p = self.position;
        let r = self.rotation;
        [p.x, p.y, p.z, r.x, r.y, r.z, r.w]
    }

    pub fn from_array(v: [f32; Self::FLOAT_COUNT]) -> Self {
        Self {
            position: Vec3::new(v[0], v[1], v[2]),
            rotation: Quat::from_xyzw(v[3], v[4], v[5], v[6]),
        }
    }

    /// Apply `self` after `local`: the result places `local` inside `self`'s frame.
    pub fn mul_pose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * local.position,
            rotation: self.rotation * local.rotation,
        }
    }

    /// Inverse transform. Assumes a unit rotation.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.conjugate();
        Pose {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// Pose of `world` expressed relative to `self` as the origin frame.
    pub fn relative(&self, world: &Pose) -> Pose {
        self.inverse().mul_pose(world)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
