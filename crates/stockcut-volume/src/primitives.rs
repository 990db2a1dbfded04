//! Convex cutting primitives.

use serde::{Deserialize, Serialize};
use stockcut_math::{Aabb3, Point3, Vec3};

use crate::{Result, Volume, VolumeError};

fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(VolumeError::InvalidRadius(radius))
    }
}

/// A solid ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    /// Create a sphere from its center and radius.
    pub fn new(center: Point3, radius: f64) -> Result<Self> {
        check_radius(radius)?;
        Ok(Self { center, radius })
    }

    /// Sphere center.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Sphere radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Volume for Sphere {
    fn bounding_box(&self) -> Aabb3 {
        Aabb3::from_center_half_extent(&self.center, self.radius)
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.center).norm() - self.radius
    }
}

/// An axis-aligned solid box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    bounds: Aabb3,
}

impl Cuboid {
    /// Create a box from its bounds.
    pub fn new(bounds: Aabb3) -> Result<Self> {
        let d = bounds.max - bounds.min;
        if !(d.x > 0.0 && d.y > 0.0 && d.z > 0.0) || !d.iter().all(|v| v.is_finite()) {
            return Err(VolumeError::InvalidBounds(format!(
                "min {:?} must be strictly below max {:?}",
                bounds.min, bounds.max
            )));
        }
        Ok(Self { bounds })
    }

    /// Create a box from `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub fn from_bounds(bounds: [f64; 6]) -> Result<Self> {
        Self::new(Aabb3::new(
            Point3::new(bounds[0], bounds[1], bounds[2]),
            Point3::new(bounds[3], bounds[4], bounds[5]),
        ))
    }
}

impl Volume for Cuboid {
    fn bounding_box(&self) -> Aabb3 {
        self.bounds
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        let c = self.bounds.center();
        let h = self.bounds.half_extents();
        let q = Vec3::new(
            (p.x - c.x).abs() - h.x,
            (p.y - c.y).abs() - h.y,
            (p.z - c.z).abs() - h.z,
        );
        let outside = q.map(|v| v.max(0.0)).norm();
        let inside = q.x.max(q.y).max(q.z).min(0.0);
        outside + inside
    }
}

/// A vertical cylinder with flat ends, the envelope of a flat end mill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    /// Center of the bottom face.
    base: Point3,
    radius: f64,
    height: f64,
}

impl Cylinder {
    /// Create a cylinder standing on `base`, extending `height` along +Z.
    pub fn new(base: Point3, radius: f64, height: f64) -> Result<Self> {
        check_radius(radius)?;
        if !(height.is_finite() && height > 0.0) {
            return Err(VolumeError::InvalidHeight(height));
        }
        Ok(Self {
            base,
            radius,
            height,
        })
    }
}

impl Volume for Cylinder {
    fn bounding_box(&self) -> Aabb3 {
        Aabb3::new(
            Point3::new(
                self.base.x - self.radius,
                self.base.y - self.radius,
                self.base.z,
            ),
            Point3::new(
                self.base.x + self.radius,
                self.base.y + self.radius,
                self.base.z + self.height,
            ),
        )
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        let half = self.height / 2.0;
        let dr = ((p.x - self.base.x).powi(2) + (p.y - self.base.y).powi(2)).sqrt() - self.radius;
        let dz = (p.z - self.base.z - half).abs() - half;
        let outside = (dr.max(0.0).powi(2) + dz.max(0.0).powi(2)).sqrt();
        outside + dr.max(dz).min(0.0)
    }
}

/// A line segment swept by a ball, the envelope of a ball end mill move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    from: Point3,
    to: Point3,
    radius: f64,
}

impl Capsule {
    /// Create a capsule between two points.
    pub fn new(from: Point3, to: Point3, radius: f64) -> Result<Self> {
        check_radius(radius)?;
        Ok(Self { from, to, radius })
    }
}

impl Volume for Capsule {
    fn bounding_box(&self) -> Aabb3 {
        let mut bb = Aabb3::empty();
        bb.include_point(&self.from);
        bb.include_point(&self.to);
        bb.expand(self.radius);
        bb
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        let pa = p - self.from;
        let ba = self.to - self.from;
        let len_sq = ba.norm_squared();
        let h = if len_sq < 1e-10 {
            0.0
        } else {
            (pa.dot(&ba) / len_sq).clamp(0.0, 1.0)
        };
        (pa - ba * h).norm() - self.radius
    }
}
