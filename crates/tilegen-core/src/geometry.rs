//! Geometry primitives shared by tiles, sockets and the spatial index.
//!
//! The level is laid out with +Y as up. Every rotation in tile placement is a
//! turn about the up axis, so poses carry a single yaw angle in degrees.

use serde::{Deserialize, Serialize};

/// 3D position vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn min(&self, other: &Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Rotate about the up axis. Positive yaw turns +Z towards +X.
    pub fn rotate_yaw(&self, yaw_degrees: f32) -> Self {
        let (sin, cos) = yaw_degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos + self.z * sin,
            y: self.y,
            z: -self.x * sin + self.z * cos,
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Position plus a rotation about the up axis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Degrees, normalized to `[0, 360)`
    #[serde(default)]
    pub yaw: f32,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        yaw: 0.0,
    };

    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw: normalize_yaw(yaw),
        }
    }

    /// Map a point from this pose's local space into the parent space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + local.rotate_yaw(self.yaw)
    }

    /// Chain a child pose expressed in this pose's local space.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose::new(self.transform_point(local.position), self.yaw + local.yaw)
    }

    /// Unit vector this pose is facing.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, 1.0).rotate_yaw(self.yaw)
    }

    /// Same position, facing the opposite way.
    pub fn turned_around(&self) -> Pose {
        Pose::new(self.position, self.yaw + 180.0)
    }

    /// Find the pose an owner must take so that its child at `local`
    /// ends up exactly at `target` in world space.
    pub fn align_child(local: &Pose, target: &Pose) -> Pose {
        let yaw = normalize_yaw(target.yaw - local.yaw);
        let position = target.position - local.position.rotate_yaw(yaw);
        Pose { position, yaw }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(&max),
            max: min.max(&max),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> f32 {
        self.max.z - self.min.z
    }

    pub fn contains(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// World-space box enclosing this local box after it is moved by `pose`.
    pub fn transformed(&self, pose: &Pose) -> Aabb {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
        ];
        let mut min = pose.transform_point(corners[0]);
        let mut max = min;
        for corner in &corners[1..] {
            let p = pose.transform_point(*corner);
            min = min.min(&p);
            max = max.max(&p);
        }
        min.y = pose.position.y + self.min.y;
        max.y = pose.position.y + self.max.y;
        Aabb { min, max }
    }

    /// True when the boxes interpenetrate by more than `tolerance` on every
    /// axis. Boxes that only share a face do not overlap.
    pub fn overlaps(&self, other: &Aabb, tolerance: f32) -> bool {
        let depth_x = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let depth_y = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        let depth_z = self.max.z.min(other.max.z) - self.min.z.max(other.min.z);
        depth_x > tolerance && depth_y > tolerance && depth_z > tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(&b) < 1e-4
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));

        let diff = b - a;
        assert_eq!(diff.x, 3.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.y, 4.0);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let forward = Vec3::new(0.0, 0.0, 1.0);
        assert!(approx(forward.rotate_yaw(90.0), Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx(forward.rotate_yaw(180.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(approx(forward.rotate_yaw(270.0), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_normalize_yaw() {
        assert_eq!(normalize_yaw(360.0), 0.0);
        assert_eq!(normalize_yaw(450.0), 90.0);
        assert_eq!(normalize_yaw(-90.0), 270.0);
    }

    #[test]
    fn test_align_child_lands_on_target() {
        let local = Pose::new(Vec3::new(0.0, 0.0, -8.0), 180.0);
        let target = Pose::new(Vec3::new(3.0, 0.0, 8.0), 90.0);

        let owner = Pose::align_child(&local, &target);
        let landed = owner.compose(&local);

        assert!(approx(landed.position, target.position));
        assert!((landed.yaw - target.yaw).abs() < 1e-3);
    }

    #[test]
    fn test_transformed_box_quarter_turn() {
        let local = Aabb::new(Vec3::new(-2.0, 0.0, -6.0), Vec3::new(2.0, 3.0, 6.0));
        let pose = Pose::new(Vec3::new(10.0, 1.0, 0.0), 90.0);
        let world = local.transformed(&pose);

        assert!((world.width() - 12.0).abs() < 1e-4);
        assert!((world.depth() - 4.0).abs() < 1e-4);
        assert!(approx(world.center(), Vec3::new(10.0, 2.5, 0.0)));
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        let b = Aabb::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(8.0, 4.0, 4.0));
        let c = Aabb::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(7.0, 4.0, 4.0));

        assert!(!a.overlaps(&b, 0.01));
        assert!(a.overlaps(&c, 0.01));
        assert!(a.contains(&Vec3::new(1.0, 1.0, 1.0)));
    }
}
