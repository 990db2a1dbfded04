//! Swept tool subtraction for toolpath simulation.
//!
//! A ball end mill moving along a straight segment sweeps a capsule, so a
//! toolpath is simulated as one capsule subtraction per segment. Arcs are
//! split into short segments first.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use stockcut_math::Point3;
use stockcut_volume::Capsule;
use tracing::debug_span;

use crate::{DiffStats, Octree, Result};

/// Angular step used when splitting arcs, about five degrees.
const ARC_STEP: f64 = 0.087;

/// Arc direction seen from +Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcDir {
    /// Clockwise.
    Cw,
    /// Counter-clockwise.
    Ccw,
}

/// One tool motion starting where the previous one ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ToolMove {
    /// Straight move.
    Linear {
        /// End point.
        to: Point3,
    },
    /// Helical arc around an axis parallel to Z.
    Arc {
        /// End point.
        to: Point3,
        /// Arc center; only its XY position is used.
        center: Point3,
        /// Turning direction.
        dir: ArcDir,
    },
}

impl ToolMove {
    /// End point of the move.
    pub fn end(&self) -> Point3 {
        match self {
            ToolMove::Linear { to } | ToolMove::Arc { to, .. } => *to,
        }
    }
}

impl Octree {
    /// Sweep a ball of `radius` along a polyline.
    ///
    /// A single point removes one ball; an empty slice does nothing.
    pub fn subtract_polyline(&mut self, points: &[Point3], radius: f64) -> Result<DiffStats> {
        let _span = debug_span!("octree::subtract_polyline", points = points.len()).entered();
        let mut stats = DiffStats::default();
        match points {
            [] => {}
            [only] => stats += self.subtract(&Capsule::new(*only, *only, radius)?)?,
            _ => {
                for pair in points.windows(2) {
                    stats += self.subtract(&Capsule::new(pair[0], pair[1], radius)?)?;
                }
            }
        }
        Ok(stats)
    }

    /// Sweep a ball of `radius` through a sequence of moves from `start`.
    pub fn subtract_moves(
        &mut self,
        start: Point3,
        moves: &[ToolMove],
        radius: f64,
    ) -> Result<DiffStats> {
        let mut points = vec![start];
        let mut current = start;
        for motion in moves {
            match *motion {
                ToolMove::Linear { to } => points.push(to),
                ToolMove::Arc { to, center, dir } => {
                    points.extend(linearize_arc(&current, &to, &center, dir));
                }
            }
            current = motion.end();
        }
        self.subtract_polyline(&points, radius)
    }
}

/// Split an arc into points spaced about five degrees apart.
///
/// The start point is not included; the last point is `to`. Z is
/// interpolated linearly, which makes helical moves.
pub fn linearize_arc(from: &Point3, to: &Point3, center: &Point3, dir: ArcDir) -> Vec<Point3> {
    let r = (from.x - center.x).hypot(from.y - center.y);
    let start_angle = (from.y - center.y).atan2(from.x - center.x);
    let end_angle = (to.y - center.y).atan2(to.x - center.x);

    let delta = match dir {
        ArcDir::Ccw => {
            let d = end_angle - start_angle;
            if d <= 0.0 {
                d + TAU
            } else {
                d
            }
        }
        ArcDir::Cw => {
            let d = start_angle - end_angle;
            if d <= 0.0 {
                -(d + TAU)
            } else {
                -d
            }
        }
    };

    let segments = ((delta.abs() / ARC_STEP).ceil() as usize).max(1);
    let angle_step = delta / segments as f64;
    let z_step = (to.z - from.z) / segments as f64;

    let mut points: Vec<Point3> = (1..segments)
        .map(|i| {
            let angle = start_angle + angle_step * i as f64;
            Point3::new(
                center.x + r * angle.cos(),
                center.y + r * angle.sin(),
                from.z + z_step * i as f64,
            )
        })
        .collect();
    points.push(*to);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OctreeError;
    use approx::assert_abs_diff_eq;
    use stockcut_volume::VolumeError;

    #[test]
    fn test_linearize_arc_ccw() {
        let from = Point3::new(10.0, 0.0, 0.0);
        let to = Point3::new(0.0, 10.0, 0.0);
        let points = linearize_arc(&from, &to, &Point3::origin(), ArcDir::Ccw);

        assert_eq!(points.len(), 19);
        assert_eq!(points.last(), Some(&to));
        for p in &points {
            assert_abs_diff_eq!(p.coords.norm(), 10.0, epsilon = 1e-9);
            assert!(p.x >= -1e-9 && p.y >= -1e-9);
        }
    }

    #[test]
    fn test_linearize_arc_cw_goes_the_long_way() {
        let from = Point3::new(10.0, 0.0, 0.0);
        let to = Point3::new(0.0, 10.0, 4.0);
        let points = linearize_arc(&from, &to, &Point3::origin(), ArcDir::Cw);

        // Three quarters of a turn through negative y.
        assert!(points.len() > 50);
        assert!(points.iter().any(|p| p.y < -9.0));
        assert_abs_diff_eq!(points[points.len() - 2].z, 4.0, epsilon = 0.1);
    }

    #[test]
    fn test_polyline_cuts_groove() {
        let mut t = Octree::new(10.0, 4, Point3::origin()).unwrap();
        let path = [Point3::new(-15.0, 0.0, 10.0), Point3::new(15.0, 0.0, 10.0)];
        let stats = t.subtract_polyline(&path, 3.0).unwrap();

        assert!(stats.removed > 0);
        assert!(t.sdf_at(&Point3::new(0.0, 0.0, 9.0)) > 0.0);
        assert!(t.sdf_at(&Point3::new(0.0, 5.0, 9.0)) < 0.0);
        assert!(t.sdf_at(&Point3::new(0.0, 0.0, -5.0)) < 0.0);
    }

    #[test]
    fn test_polyline_edge_cases() {
        let mut t = Octree::new(10.0, 3, Point3::origin()).unwrap();
        assert_eq!(t.subtract_polyline(&[], 1.0).unwrap(), DiffStats::default());

        let stats = t
            .subtract_polyline(&[Point3::new(10.0, 10.0, 10.0)], 4.0)
            .unwrap();
        assert!(stats.visited > 0);

        let err = t
            .subtract_polyline(&[Point3::origin(), Point3::new(1.0, 0.0, 0.0)], 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            OctreeError::Volume(VolumeError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_moves_follow_arc() {
        let mut t = Octree::new(10.0, 4, Point3::origin()).unwrap();
        let moves = [ToolMove::Arc {
            to: Point3::new(-8.0, 0.0, 10.0),
            center: Point3::new(0.0, 0.0, 10.0),
            dir: ArcDir::Ccw,
        }];
        t.subtract_moves(Point3::new(8.0, 0.0, 10.0), &moves, 2.0)
            .unwrap();

        // The counter-clockwise half circle passes through +y, not -y.
        assert!(t.sdf_at(&Point3::new(0.0, 8.0, 9.5)) > 0.0);
        assert!(t.sdf_at(&Point3::new(0.0, -8.0, 9.5)) < 0.0);
    }
}
