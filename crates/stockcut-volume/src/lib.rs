#![warn(missing_docs)]

//! Cutting volumes for stock material removal.
//!
//! A [`Volume`] is anything the octree can subtract: it reports a bounding
//! box for broadphase pruning, a signed distance for sampling, and a
//! three-way [`Classification`] of axis-aligned cells.
//!
//! # Example
//!
//! ```
//! use stockcut_math::{Aabb3, Point3};
//! use stockcut_volume::{Classification, Sphere, Volume};
//!
//! let ball = Sphere::new(Point3::origin(), 5.0).unwrap();
//! let cell = Aabb3::from_center_half_extent(&Point3::origin(), 1.0);
//! assert_eq!(ball.classify(&cell), Classification::Inside);
//! ```

mod primitives;

pub use primitives::{Capsule, Cuboid, Cylinder, Sphere};

use serde::{Deserialize, Serialize};
use stockcut_math::{Aabb3, Point3};
use thiserror::Error;

/// Errors from constructing cutting volumes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VolumeError {
    /// Radius is zero, negative or not finite.
    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    /// Height is zero, negative or not finite.
    #[error("invalid height: {0}")]
    InvalidHeight(f64),

    /// Box bounds are inverted or degenerate.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
}

/// Result type for volume construction.
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Relation of a cell to a cutting volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    /// Cell lies entirely within the volume.
    Inside,
    /// Cell lies entirely outside the volume.
    Outside,
    /// Cell straddles the volume surface, or has not been classified yet.
    #[default]
    Boundary,
}

impl Classification {
    /// True for [`Classification::Inside`].
    pub fn is_inside(self) -> bool {
        self == Classification::Inside
    }

    /// True for [`Classification::Outside`].
    pub fn is_outside(self) -> bool {
        self == Classification::Outside
    }
}

/// A volumetric predicate that can be subtracted from stock.
///
/// `signed_distance` must be negative inside the volume and must never
/// overestimate the true distance to the surface, so that a cell whose
/// center is further away than its half-diagonal can be rejected safely.
pub trait Volume {
    /// Axis-aligned bounding box enclosing the whole volume.
    fn bounding_box(&self) -> Aabb3;

    /// Signed distance from `p` to the volume surface (negative inside).
    fn signed_distance(&self, p: &Point3) -> f64;

    /// Whether `p` lies inside the volume or on its surface.
    fn contains(&self, p: &Point3) -> bool {
        self.signed_distance(p) <= 0.0
    }

    /// Whether the volume's bounding box overlaps `other`.
    fn overlaps(&self, other: &Aabb3) -> bool {
        self.bounding_box().overlaps(other)
    }

    /// Classify an axis-aligned cell against this volume.
    ///
    /// The default samples the eight cell corners, which is exact for
    /// convex volumes. `Inside` is monotone under subdivision: if all eight
    /// octants of a cell are `Inside`, so is the cell. A cell that only
    /// touches the volume along a face, edge or corner is `Outside`.
    fn classify(&self, cell: &Aabb3) -> Classification {
        if !self.bounding_box().overlaps_interior(cell) {
            return Classification::Outside;
        }
        let distances = cell.corners().map(|c| self.signed_distance(&c));
        if distances.iter().all(|&d| d <= 0.0) {
            return Classification::Inside;
        }
        let strictly_inside = distances.iter().any(|&d| d < 0.0);
        if !strictly_inside && self.signed_distance(&cell.center()) >= cell.half_diagonal() {
            return Classification::Outside;
        }
        Classification::Boundary
    }
}

impl<V: Volume + ?Sized> Volume for &V {
    fn bounding_box(&self) -> Aabb3 {
        (**self).bounding_box()
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        (**self).signed_distance(p)
    }

    fn contains(&self, p: &Point3) -> bool {
        (**self).contains(p)
    }

    fn overlaps(&self, other: &Aabb3) -> bool {
        (**self).overlaps(other)
    }

    fn classify(&self, cell: &Aabb3) -> Classification {
        (**self).classify(cell)
    }
}

impl<V: Volume + ?Sized> Volume for Box<V> {
    fn bounding_box(&self) -> Aabb3 {
        (**self).bounding_box()
    }

    fn signed_distance(&self, p: &Point3) -> f64 {
        (**self).signed_distance(p)
    }

    fn contains(&self, p: &Point3) -> bool {
        (**self).contains(p)
    }

    fn overlaps(&self, other: &Aabb3) -> bool {
        (**self).overlaps(other)
    }

    fn classify(&self, cell: &Aabb3) -> Classification {
        (**self).classify(cell)
    }
}
