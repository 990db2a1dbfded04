//! Octree cells.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use stockcut_math::{Aabb3, Point3, Triangle, Vec3};
use stockcut_volume::{Classification, Volume};

use crate::field;
use crate::marching_cubes::MarchingCubes;

new_key_type! {
    /// Handle to a node stored in an [`Octree`](crate::Octree).
    pub struct NodeId;
}

/// One cube-shaped cell of the octree.
///
/// Children are indexed by octant: bit 0 selects +x, bit 1 +y, bit 2 +z.
/// Faces are indexed -x, +x, -y, +y, -z, +z.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub(crate) octant: u8,
    pub(crate) depth: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; 8],
    pub(crate) child_count: u8,
    pub(crate) center: Point3,
    pub(crate) scale: f64,
    pub(crate) bbox: Aabb3,
    pub(crate) state: Classification,
    /// Which faces lie on the outer boundary of the whole octree.
    pub(crate) surface: [bool; 6],
    /// Stock signed distance at the corners (Morton order, negative = material).
    pub(crate) field: [f64; 8],
}

impl Node {
    /// Root cell: all faces on the outer boundary, solid material everywhere.
    pub(crate) fn root(center: Point3, scale: f64) -> Self {
        let bbox = Aabb3::from_center_half_extent(&center, scale);
        let solid = -bbox.half_diagonal();
        Self {
            octant: 0,
            depth: 0,
            parent: None,
            children: [None; 8],
            child_count: 0,
            center,
            scale,
            bbox,
            state: Classification::Boundary,
            surface: [true; 6],
            field: [solid; 8],
        }
    }

    /// Build the child cell occupying `octant` of this cell.
    ///
    /// The child inherits the boundary flags of the three faces it shares
    /// with this cell, and its corner samples are interpolated from this
    /// cell's.
    pub(crate) fn spawn_child(&self, octant: u8, parent: NodeId) -> Self {
        assert!(octant < 8, "octant {octant} out of range");
        let bit = |axis: u8| (octant >> axis) & 1 == 1;
        let half = self.scale / 2.0;
        let offset = Vec3::new(
            if bit(0) { half } else { -half },
            if bit(1) { half } else { -half },
            if bit(2) { half } else { -half },
        );
        let center = self.center + offset;

        let mut surface = [false; 6];
        for axis in 0..3u8 {
            let face = usize::from(2 * axis + u8::from(bit(axis)));
            surface[face] = self.surface[face];
        }

        let field = std::array::from_fn(|corner: usize| {
            let u: [f64; 3] = std::array::from_fn(|axis| {
                let from_child = (octant >> axis) & 1;
                let from_corner = u8::from((corner >> axis) & 1 == 1);
                f64::from(from_child + from_corner) / 2.0
            });
            field::trilinear(&self.field, &u)
        });

        Self {
            octant,
            depth: self.depth + 1,
            parent: Some(parent),
            children: [None; 8],
            child_count: 0,
            center,
            scale: half,
            bbox: Aabb3::from_center_half_extent(&center, half),
            state: Classification::Boundary,
            surface,
            field,
        }
    }

    /// Octant index among siblings (0 for the root).
    pub fn octant(&self) -> u8 {
        self.octant
    }

    /// Depth below the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child slots by octant.
    pub fn children(&self) -> &[Option<NodeId>; 8] {
        &self.children
    }

    /// Number of occupied child slots.
    pub fn child_count(&self) -> u8 {
        self.child_count
    }

    /// True if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Cell center.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Half-width of the cell.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Cell bounds.
    pub fn bbox(&self) -> &Aabb3 {
        &self.bbox
    }

    /// Classification from the most recent evaluation.
    ///
    /// Only meaningful for leaves.
    pub fn classification(&self) -> Classification {
        self.state
    }

    /// Faces lying on the outer boundary of the octree.
    pub fn surface(&self) -> &[bool; 6] {
        &self.surface
    }

    /// Stock signed distance at the eight corners.
    pub fn field(&self) -> &[f64; 8] {
        &self.field
    }

    /// Classify this cell against `volume`.
    ///
    /// Overwrites the previous classification.
    pub fn evaluate(&mut self, volume: &dyn Volume) -> Classification {
        self.state = volume.classify(&self.bbox);
        self.state
    }

    /// Remove `volume` from the corner samples.
    pub(crate) fn carve(&mut self, volume: &dyn Volume) {
        for (sample, corner) in self.field.iter_mut().zip(self.bbox.corners()) {
            *sample = sample.max(-volume.signed_distance(&corner));
        }
    }

    /// Mark a cell whose whole region has been cut away.
    pub(crate) fn mark_consumed(&mut self) {
        self.state = Classification::Inside;
        let air = self.scale * f64::EPSILON;
        for sample in &mut self.field {
            *sample = sample.abs().max(air);
        }
    }

    /// Octant of this cell containing `p`.
    pub(crate) fn octant_of(&self, p: &Point3) -> usize {
        usize::from(p.x >= self.center.x)
            | usize::from(p.y >= self.center.y) << 1
            | usize::from(p.z >= self.center.z) << 2
    }

    /// Interpolated stock signed distance at `p`, clamped to the cell.
    pub fn sample(&self, p: &Point3) -> f64 {
        field::trilinear(&self.field, &field::local_coords(&self.bbox, p))
    }

    /// Marching cubes triangles of the stock surface inside this cell.
    pub fn mc_triangles(&self) -> Vec<Triangle> {
        MarchingCubes::polygonize(&self.bbox, &self.field)
    }

    /// Flat caps on this cell's faces that lie on the octree boundary.
    pub fn side_triangles(&self) -> Vec<Triangle> {
        self.surface
            .iter()
            .enumerate()
            .filter(|(_, on_boundary)| **on_boundary)
            .flat_map(|(face, _)| MarchingCubes::face_cap(&self.bbox, &self.field, face))
            .collect()
    }
}
