#![warn(missing_docs)]

//! Math types for the stockcut octree.
//!
//! Thin wrappers around nalgebra providing the geometric vocabulary shared
//! by the volume predicates and the octree: points, vectors, axis-aligned
//! boxes and triangles.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Box spanning `min` to `max`.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Cube centered on `center` reaching `half` along each axis.
    pub fn from_center_half_extent(center: &Point3, half: f64) -> Self {
        let h = Vec3::repeat(half);
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// Inverted box that any [`Aabb3::include_point`] call replaces.
    pub fn empty() -> Self {
        Self {
            min: Point3::from(Vec3::repeat(f64::INFINITY)),
            max: Point3::from(Vec3::repeat(f64::NEG_INFINITY)),
        }
    }

    /// Grow to cover `p`.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// True if the boxes share at least one point. Touching faces count.
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// True if the boxes share a region of positive volume.
    pub fn overlaps_interior(&self, other: &Aabb3) -> bool {
        (0..3).all(|axis| self.min[axis] < other.max[axis] && other.min[axis] < self.max[axis])
    }

    /// True if `p` lies inside the box or on its boundary.
    pub fn contains_point(&self, p: &Point3) -> bool {
        (0..3).all(|axis| (self.min[axis]..=self.max[axis]).contains(&p[axis]))
    }

    /// True if `other` fits entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb3) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Half of the box extent along each axis.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Distance from the center to any corner.
    pub fn half_diagonal(&self) -> f64 {
        self.half_extents().norm()
    }

    /// Enclosed volume. Zero for empty or degenerate boxes.
    pub fn volume(&self) -> f64 {
        let d = self.max - self.min;
        if d.x <= 0.0 || d.y <= 0.0 || d.z <= 0.0 {
            return 0.0;
        }
        d.x * d.y * d.z
    }

    /// The eight corners in Morton order: bit 0 selects max x, bit 1 max y,
    /// bit 2 max z.
    pub fn corners(&self) -> [Point3; 8] {
        std::array::from_fn(|i| {
            Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Grow by `margin` on every side.
    pub fn expand(&mut self, margin: f64) {
        let d = Vec3::repeat(margin);
        self.min -= d;
        self.max += d;
    }
}

/// A triangle in 3D space.
///
/// Vertices are wound counter-clockwise when viewed from the side the
/// normal points to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// The three corner points.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three points.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unnormalized face normal (cross product of the two leading edges).
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Surface area.
    pub fn area(&self) -> f64 {
        self.normal().norm() * 0.5
    }

    /// Centroid of the three vertices.
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = &self.vertices;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// The same triangle with opposite winding.
    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.vertices;
        Self::new(a, c, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_overlap_touching() {
        let a = Aabb3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb3::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let c = Aabb3::new(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));

        // Touching boxes share no interior.
        assert!(!a.overlaps_interior(&b));
        let d = Aabb3::new(Point3::new(0.5, 0.5, 0.5), Point3::new(2.0, 2.0, 2.0));
        assert!(a.overlaps_interior(&d));
    }

    #[test]
    fn test_cube_from_center() {
        let bb = Aabb3::from_center_half_extent(&Point3::new(1.0, 2.0, 3.0), 0.5);
        assert_relative_eq!(bb.min.x, 0.5);
        assert_relative_eq!(bb.max.z, 3.5);
        assert_relative_eq!(bb.volume(), 1.0);
        assert_relative_eq!(bb.half_diagonal(), 0.75f64.sqrt());
        assert_eq!(bb.center(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_corners_morton_order() {
        let bb = Aabb3::new(Point3::origin(), Point3::new(1.0, 2.0, 3.0));
        let corners = bb.corners();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(corners[2], Point3::new(0.0, 2.0, 0.0));
        assert_eq!(corners[4], Point3::new(0.0, 0.0, 3.0));
        assert_eq!(corners[7], Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains() {
        let outer = Aabb3::from_center_half_extent(&Point3::origin(), 2.0);
        let inner = Aabb3::from_center_half_extent(&Point3::new(1.0, 1.0, 1.0), 1.0);
        let straddling = Aabb3::from_center_half_extent(&Point3::new(2.0, 0.0, 0.0), 1.0);
        assert!(outer.contains_aabb(&inner));
        assert!(!outer.contains_aabb(&straddling));
        assert!(outer.contains_point(&Point3::new(2.0, -2.0, 0.0)));
    }

    #[test]
    fn test_empty_expands() {
        let mut bb = Aabb3::empty();
        assert_eq!(bb.volume(), 0.0);
        bb.include_point(&Point3::new(-1.0, 0.0, 0.0));
        bb.include_point(&Point3::new(1.0, 2.0, 3.0));
        bb.expand(0.5);
        assert_relative_eq!(bb.min.x, -1.5);
        assert_relative_eq!(bb.max.z, 3.5);
    }

    #[test]
    fn test_triangle_normal_and_area() {
        let t = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(t.normal().z, 1.0);
        assert_relative_eq!(t.area(), 0.5);
        assert_relative_eq!(t.flipped().normal().z, -1.0);
        assert_relative_eq!(t.centroid().x, 1.0 / 3.0);
    }
}
