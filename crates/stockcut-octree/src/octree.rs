//! Adaptive octree representation of stock material.

use std::collections::HashMap;
use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use stockcut_math::{Aabb3, Point3, Triangle};
use stockcut_volume::{Classification, Volume};
use tracing::{debug, debug_span, trace};

use crate::config::OctreeConfig;
use crate::node::{Node, NodeId};
use crate::{OctreeError, Result};

/// Counters describing the work done by one subtraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Nodes visited by the recursion.
    pub visited: usize,
    /// Leaves split into eight children.
    pub subdivided: usize,
    /// Leaves removed for lying inside the cutting volume.
    pub removed: usize,
    /// Parents that became leaves after losing their last child.
    pub collapsed: usize,
}

impl AddAssign for DiffStats {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.subdivided += other.subdivided;
        self.removed += other.removed;
        self.collapsed += other.collapsed;
    }
}

/// Stock material as an adaptive octree.
///
/// The solid is the union of the leaf cells, each carrying signed distance
/// samples at its corners. Cutting volumes are subtracted with
/// [`Octree::subtract`], which refines the tree only where the volume
/// surface passes and deletes cells swallowed by the volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Octree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    root_scale: f64,
    max_depth: u32,
    center: Point3,
}

impl Octree {
    /// Create a tree holding one solid cube of half-width `root_scale`.
    pub fn new(root_scale: f64, max_depth: u32, center: Point3) -> Result<Self> {
        OctreeConfig {
            root_scale,
            max_depth,
            center: [center.x, center.y, center.z],
        }
        .build()
    }

    /// Create a tree from an already validated configuration.
    pub(crate) fn from_parts(root_scale: f64, max_depth: u32, center: Point3) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::root(center, root_scale));
        Self {
            nodes,
            root,
            root_scale,
            max_depth,
            center,
        }
    }

    /// Drop every node and start over from a single solid root.
    pub fn clear(&mut self) {
        *self = Self::from_parts(self.root_scale, self.max_depth, self.center);
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Half-width of the root cube.
    pub fn root_scale(&self) -> f64 {
        self.root_scale
    }

    /// Maximum subdivision depth.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Edge length of a cell at the maximum depth.
    pub fn leaf_scale(&self) -> f64 {
        self.root_scale / 2f64.powi(self.max_depth as i32 - 1)
    }

    /// Center of the root cube.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Bounds of the root cube.
    pub fn bounds(&self) -> Aabb3 {
        self.nodes[self.root].bbox
    }

    /// Total number of nodes, internal ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_nodes(self.root).len()
    }

    /// Split the leaf `id` into eight children.
    pub fn subdivide(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get(id).ok_or(OctreeError::UnknownNode)?;
        if !node.is_leaf() {
            return Err(OctreeError::AlreadySubdivided { depth: node.depth });
        }
        if node.depth >= self.max_depth {
            return Err(OctreeError::DepthExceeded {
                depth: node.depth + 1,
                max_depth: self.max_depth,
            });
        }

        let children: [Node; 8] = std::array::from_fn(|i| node.spawn_child(i as u8, id));
        trace!(depth = node.depth, "subdivide");
        for (octant, child) in children.into_iter().enumerate() {
            let child_id = self.nodes.insert(child);
            self.nodes[id].children[octant] = Some(child_id);
        }
        self.nodes[id].child_count = 8;
        Ok(())
    }

    /// Subdivide every leaf, `rounds` times over.
    ///
    /// Fails without touching the tree if any leaf would end up deeper than
    /// the maximum depth.
    pub fn init(&mut self, rounds: u32) -> Result<()> {
        let _span = debug_span!("octree::init", rounds).entered();
        let deepest = self
            .leaf_nodes(self.root)
            .iter()
            .map(|&id| self.nodes[id].depth)
            .max()
            .unwrap_or(0);
        let target = deepest.saturating_add(rounds);
        if target > self.max_depth {
            return Err(OctreeError::DepthExceeded {
                depth: target,
                max_depth: self.max_depth,
            });
        }

        for _ in 0..rounds {
            for leaf in self.leaf_nodes(self.root) {
                self.subdivide(leaf)?;
            }
        }
        debug!(leaves = self.leaf_count(), "uniform subdivision done");
        Ok(())
    }

    /// Leaves below `start` in depth-first order over octants 0..7.
    pub fn leaf_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(start, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if node.is_leaf() {
            out.push(id);
        } else {
            for child in node.children.iter().flatten() {
                self.collect_leaves(*child, out);
            }
        }
    }

    /// Every node below `start`, each node before its children.
    pub fn all_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_all(start, &mut out);
        out
    }

    fn collect_all(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        out.push(id);
        for child in node.children.iter().flatten() {
            self.collect_all(*child, out);
        }
    }

    /// Subtract `volume` from the stock.
    pub fn subtract(&mut self, volume: &dyn Volume) -> Result<DiffStats> {
        let _span = debug_span!("octree::subtract").entered();
        let mut stats = DiffStats::default();
        if volume.overlaps(&self.nodes[self.root].bbox) {
            self.diff_negative(self.root, volume, &mut stats)?;
        }
        debug!(
            visited = stats.visited,
            subdivided = stats.subdivided,
            removed = stats.removed,
            collapsed = stats.collapsed,
            "subtract done"
        );
        Ok(stats)
    }

    fn diff_negative(
        &mut self,
        id: NodeId,
        volume: &dyn Volume,
        stats: &mut DiffStats,
    ) -> Result<()> {
        stats.visited += 1;
        if !self.nodes[id].is_leaf() {
            return self.diff_children(id, volume, stats);
        }

        match self.nodes[id].evaluate(volume) {
            Classification::Inside => self.remove_leaf(id, volume, stats),
            Classification::Outside => {
                // Flush against the volume: contact corners turn to air.
                let node = &mut self.nodes[id];
                if node.bbox.corners().iter().any(|c| volume.contains(c)) {
                    node.carve(volume);
                }
            }
            Classification::Boundary if self.nodes[id].depth < self.max_depth => {
                self.subdivide(id)?;
                stats.subdivided += 1;
                self.diff_children(id, volume, stats)?;
            }
            Classification::Boundary => {
                // Out of resolution: keep the cell, cut its samples.
                self.nodes[id].carve(volume);
            }
        }
        Ok(())
    }

    fn diff_children(
        &mut self,
        id: NodeId,
        volume: &dyn Volume,
        stats: &mut DiffStats,
    ) -> Result<()> {
        for octant in 0..8 {
            let Some(child) = self.nodes[id].children[octant] else {
                continue;
            };
            if volume.overlaps(&self.nodes[child].bbox) {
                self.diff_negative(child, volume, stats)?;
            }
        }
        Ok(())
    }

    /// Detach a leaf swallowed by `volume`. A parent left without children
    /// becomes a leaf and is re-evaluated against the same volume.
    fn remove_leaf(&mut self, id: NodeId, volume: &dyn Volume, stats: &mut DiffStats) {
        let node = &mut self.nodes[id];
        let Some(parent_id) = node.parent else {
            // The root stays as a single empty leaf.
            node.carve(volume);
            return;
        };
        let octant = node.octant as usize;
        assert!(octant < 8, "octant {octant} out of range");

        self.remove_subtree(id);
        stats.removed += 1;

        let parent = &mut self.nodes[parent_id];
        assert_eq!(parent.children[octant], Some(id), "parent does not own child");
        assert!(parent.child_count > 0, "child count underflow");
        parent.children[octant] = None;
        parent.child_count -= 1;
        trace!(depth = parent.depth + 1, octant, "removed leaf");

        if parent.child_count == 0 {
            stats.collapsed += 1;
            if parent.evaluate(volume).is_inside() {
                parent.carve(volume);
            } else {
                // Emptied by several cuts rather than this one alone.
                parent.mark_consumed();
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().flatten());
            }
        }
    }

    /// Marching cubes surface of the whole stock.
    pub fn surface_mesh(&self) -> Vec<Triangle> {
        self.leaf_nodes(self.root)
            .into_iter()
            .flat_map(|id| self.nodes[id].mc_triangles())
            .collect()
    }

    /// Flat caps where the stock touches the faces of the root cube.
    pub fn boundary_cap_mesh(&self) -> Vec<Triangle> {
        self.leaf_nodes(self.root)
            .into_iter()
            .flat_map(|id| self.nodes[id].side_triangles())
            .collect()
    }

    /// Welded indexed mesh of the surface and the boundary caps.
    pub fn to_mesh(&self) -> (Vec<[f64; 3]>, Vec<u32>) {
        let quantum = self.leaf_scale() * 1e-6;
        let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for tri in self.surface_mesh().iter().chain(&self.boundary_cap_mesh()) {
            for v in &tri.vertices {
                let key = [
                    (v.x / quantum).round() as i64,
                    (v.y / quantum).round() as i64,
                    (v.z / quantum).round() as i64,
                ];
                let index = *lookup.entry(key).or_insert_with(|| {
                    vertices.push([v.x, v.y, v.z]);
                    (vertices.len() - 1) as u32
                });
                indices.push(index);
            }
        }
        (vertices, indices)
    }

    /// Sample the stock signed distance at a point (negative = material).
    pub fn sdf_at(&self, p: &Point3) -> f64 {
        let bounds = self.bounds();
        if !bounds.contains_point(p) {
            let dx = (bounds.min.x - p.x).max(p.x - bounds.max.x).max(0.0);
            let dy = (bounds.min.y - p.y).max(p.y - bounds.max.y).max(0.0);
            let dz = (bounds.min.z - p.z).max(p.z - bounds.max.z).max(0.0);
            return (dx * dx + dy * dy + dz * dz).sqrt();
        }

        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            if node.is_leaf() {
                return node.sample(p);
            }
            match node.children[node.octant_of(p)] {
                Some(child) => id = child,
                // Removed octant: air.
                None => return node.scale / 2.0,
            }
        }
    }

    /// Leaf count at each depth from 0 to the maximum depth.
    pub fn leaf_counts_by_depth(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_depth as usize + 1];
        for id in self.leaf_nodes(self.root) {
            counts[self.nodes[id].depth as usize] += 1;
        }
        counts
    }

    /// Human-readable summary of leaves per depth.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Serialize the whole tree to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a tree written by [`Octree::to_json`].
    ///
    /// The configuration and the parent/child links are checked before the
    /// tree is returned.
    pub fn from_json(json: &str) -> Result<Self> {
        let tree: Self = serde_json::from_str(json)?;
        tree.check_structure()?;
        Ok(tree)
    }

    fn check_structure(&self) -> Result<()> {
        OctreeConfig {
            root_scale: self.root_scale,
            max_depth: self.max_depth,
            center: [self.center.x, self.center.y, self.center.z],
        }
        .validate()?;

        let corrupt = |msg: String| OctreeError::InvalidSnapshot(msg);
        let root = self
            .nodes
            .get(self.root)
            .ok_or_else(|| corrupt("root node missing".into()))?;
        if root.parent.is_some() || root.depth != 0 {
            return Err(corrupt("root has a parent or nonzero depth".into()));
        }

        // Depth grows by one per link, so the walk ends even on bad input.
        let mut stack = vec![self.root];
        let mut reached = 0;
        while let Some(id) = stack.pop() {
            reached += 1;
            let node = &self.nodes[id];
            if node.depth > self.max_depth {
                return Err(corrupt(format!(
                    "node at depth {} deeper than max depth {}",
                    node.depth, self.max_depth
                )));
            }
            let occupied = node.children.iter().flatten().count();
            if usize::from(node.child_count) != occupied {
                return Err(corrupt(format!(
                    "child count {} but {occupied} occupied slots",
                    node.child_count
                )));
            }
            for (octant, child) in node.children.iter().enumerate() {
                let Some(child) = *child else { continue };
                match self.nodes.get(child) {
                    Some(c)
                        if c.parent == Some(id)
                            && usize::from(c.octant) == octant
                            && c.depth == node.depth + 1 =>
                    {
                        stack.push(child)
                    }
                    _ => return Err(corrupt(format!("broken link in octant {octant}"))),
                }
            }
        }
        if reached != self.nodes.len() {
            return Err(corrupt("nodes unreachable from the root".into()));
        }
        Ok(())
    }
}

impl fmt::Display for Octree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.leaf_counts_by_depth();
        writeln!(f, "Octree:")?;
        writeln!(f, "  {} leaf-nodes:", counts.iter().sum::<usize>())?;
        for (depth, count) in counts.iter().enumerate() {
            writeln!(f, "  depth={depth} has {count} nodes")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use stockcut_volume::{Cuboid, Sphere};

    fn tree(scale: f64, depth: u32) -> Octree {
        Octree::new(scale, depth, Point3::origin()).unwrap()
    }

    fn check_invariants(tree: &Octree) {
        for id in tree.all_nodes(tree.root()) {
            let node = tree.node(id).unwrap();
            let occupied = node.children().iter().flatten().count();
            assert_eq!(node.child_count() as usize, occupied);
            assert!(node.child_count() <= 8);
            assert!(node.depth() <= tree.max_depth());
            for (octant, child) in node.children().iter().enumerate() {
                if let Some(child) = child {
                    let child = tree.node(*child).expect("dangling child id");
                    assert_eq!(child.parent(), Some(id));
                    assert_eq!(child.octant() as usize, octant);
                    assert_eq!(child.depth(), node.depth() + 1);
                }
            }
        }
        assert_eq!(tree.all_nodes(tree.root()).len(), tree.node_count());
    }

    /// Snapshot of the leaves below `start`: bounds and classification.
    fn leaf_snapshot(tree: &Octree, start: NodeId) -> Vec<(Aabb3, Classification)> {
        tree.leaf_nodes(start)
            .iter()
            .map(|&id| {
                let node = tree.node(id).unwrap();
                (*node.bbox(), node.classification())
            })
            .collect()
    }

    #[test]
    fn test_new_tree_is_single_leaf() {
        let t = tree(10.0, 3);
        assert_eq!(t.leaf_count(), 1);
        assert_eq!(t.node_count(), 1);
        let root = t.node(t.root()).unwrap();
        assert_eq!(root.surface(), &[true; 6]);
        assert_eq!(root.classification(), Classification::Boundary);
        assert_abs_diff_eq!(t.leaf_scale(), 10.0 / 4.0);
    }

    #[test]
    fn test_init_one_round() {
        let mut t = tree(10.0, 3);
        t.init(1).unwrap();
        let leaves = t.leaf_nodes(t.root());
        assert_eq!(leaves.len(), 8);
        for id in leaves {
            assert_abs_diff_eq!(t.node(id).unwrap().scale(), 5.0);
        }
        check_invariants(&t);
    }

    #[test]
    fn test_init_rejects_depth_overrun() {
        let mut t = tree(10.0, 2);
        t.init(2).unwrap();
        assert_eq!(t.leaf_count(), 64);
        let err = t.init(1).unwrap_err();
        assert!(matches!(
            err,
            OctreeError::DepthExceeded {
                depth: 3,
                max_depth: 2
            }
        ));
        // Nothing changed.
        assert_eq!(t.leaf_count(), 64);
    }

    #[test]
    fn test_subdivide_twice_fails() {
        let mut t = tree(1.0, 4);
        let root = t.root();
        t.subdivide(root).unwrap();
        assert!(matches!(
            t.subdivide(root),
            Err(OctreeError::AlreadySubdivided { depth: 0 })
        ));
        assert_eq!(t.node_count(), 9);
    }

    #[test]
    fn test_subdivide_at_max_depth_fails() {
        let mut t = tree(1.0, 1);
        t.init(1).unwrap();
        let leaf = t.leaf_nodes(t.root())[0];
        assert!(matches!(
            t.subdivide(leaf),
            Err(OctreeError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_traversal_order() {
        let mut t = tree(1.0, 3);
        t.init(1).unwrap();
        let first = t.leaf_nodes(t.root())[0];
        t.subdivide(first).unwrap();

        let all = t.all_nodes(t.root());
        assert_eq!(all.len(), 1 + 8 + 8);
        assert_eq!(all[0], t.root());
        assert_eq!(all[1], first);
        assert_eq!(t.node(all[2]).unwrap().parent(), Some(first));

        let leaves = t.leaf_nodes(t.root());
        assert_eq!(leaves.len(), 15);
        let depths: Vec<u32> = leaves.iter().map(|&id| t.node(id).unwrap().depth()).collect();
        assert_eq!(&depths[..8], &[2; 8]);
        assert_eq!(&depths[8..], &[1; 7]);

        // Traversal can start below the root.
        assert_eq!(t.leaf_nodes(first).len(), 8);
        assert_eq!(t.all_nodes(first).len(), 9);
    }

    #[test]
    fn test_subtract_containing_volume_empties_tree() {
        let mut t = tree(10.0, 3);
        let big = Cuboid::from_bounds([-20.0, -20.0, -20.0, 20.0, 20.0, 20.0]).unwrap();
        t.subtract(&big).unwrap();

        assert_eq!(t.leaf_count(), 1);
        let root = t.node(t.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.classification(), Classification::Inside);
        assert!(t.surface_mesh().is_empty());
        assert!(t.boundary_cap_mesh().is_empty());
        assert!(t.sdf_at(&Point3::origin()) > 0.0);
    }

    #[test]
    fn test_subtract_containing_volume_collapses_subdivided_tree() {
        let mut t = tree(10.0, 3);
        t.init(1).unwrap();
        let big = Sphere::new(Point3::origin(), 100.0).unwrap();
        let stats = t.subtract(&big).unwrap();

        assert_eq!(stats.removed, 8);
        assert_eq!(stats.collapsed, 1);
        assert_eq!(t.node_count(), 1);
        let root = t.node(t.root()).unwrap();
        assert!(root.is_leaf());
        assert!(root.classification().is_inside());
        check_invariants(&t);
    }

    #[test]
    fn test_subtract_disjoint_volume_is_noop() {
        let mut t = tree(10.0, 3);
        let far = Sphere::new(Point3::new(50.0, 0.0, 0.0), 5.0).unwrap();
        let stats = t.subtract(&far).unwrap();

        assert_eq!(stats, DiffStats::default());
        assert_eq!(t.node_count(), 1);
        let root = t.node(t.root()).unwrap();
        assert_eq!(root.classification(), Classification::Boundary);
        assert_eq!(t.boundary_cap_mesh().len(), 12);
    }

    #[test]
    fn test_subtract_in_one_octant_refines_one_branch() {
        let mut t = tree(10.0, 2);
        let pocket = Cuboid::from_bounds([2.0, 2.0, 2.0, 4.0, 4.0, 4.0]).unwrap();
        let stats = t.subtract(&pocket).unwrap();
        assert_eq!(stats.subdivided, 2);

        let counts = t.leaf_counts_by_depth();
        assert_eq!(counts, vec![0, 7, 8]);

        let leaves = t.leaf_nodes(t.root());
        assert_eq!(leaves.len(), 15);
        let mut by_depth = vec![0; 3];
        for id in &leaves {
            by_depth[t.node(*id).unwrap().depth() as usize] += 1;
        }
        assert_eq!(by_depth, counts);

        let deep_parents: Vec<u8> = leaves
            .iter()
            .map(|&id| t.node(id).unwrap())
            .filter(|n| n.depth() == 2)
            .map(|n| t.node(n.parent().unwrap()).unwrap().octant())
            .collect();
        assert!(deep_parents.iter().all(|&o| o == 7));

        // Out of resolution: the leaf holding the pocket stays ambiguous.
        let pocket_box = pocket.bounding_box();
        let holder = leaves
            .iter()
            .map(|&id| t.node(id).unwrap())
            .find(|n| n.bbox().contains_aabb(&pocket_box))
            .unwrap();
        assert_eq!(holder.depth(), 2);
        assert_eq!(holder.classification(), Classification::Boundary);

        let report = t.describe();
        assert!(report.contains("15 leaf-nodes"));
        assert!(report.contains("depth=0 has 0 nodes"));
        assert!(report.contains("depth=1 has 7 nodes"));
        assert!(report.contains("depth=2 has 8 nodes"));
        check_invariants(&t);
    }

    #[test]
    fn test_subtract_leaves_untouched_subtrees_alone() {
        let mut t = tree(10.0, 4);
        t.init(1).unwrap();
        let leaves = t.leaf_nodes(t.root());
        // Octant 0 spans [-10, 0]^3; cut well away from it.
        let before = leaf_snapshot(&t, leaves[0]);
        let cut = Sphere::new(Point3::new(5.0, 5.0, 5.0), 3.0).unwrap();
        t.subtract(&cut).unwrap();
        assert_eq!(leaf_snapshot(&t, leaves[0]), before);
        assert!(t.leaf_count() > 8);
        check_invariants(&t);
    }

    #[test]
    fn test_sphere_cut_removes_material() {
        let mut t = tree(10.0, 5);
        let ball = Sphere::new(Point3::new(10.0, 10.0, 10.0), 8.0).unwrap();
        let stats = t.subtract(&ball).unwrap();
        assert!(stats.removed > 0);
        check_invariants(&t);

        assert!(t.sdf_at(&Point3::new(9.0, 9.0, 9.0)) > 0.0);
        assert!(t.sdf_at(&Point3::new(-5.0, -5.0, -5.0)) < 0.0);
        assert!(t.sdf_at(&Point3::new(30.0, 0.0, 0.0)) > 0.0);

        let surface = t.surface_mesh();
        assert!(!surface.is_empty());
        // Every surface vertex lies close to the sphere.
        let tol = t.leaf_scale();
        for tri in &surface {
            for v in &tri.vertices {
                let r = (v - Point3::new(10.0, 10.0, 10.0)).norm();
                assert!((r - 8.0).abs() < tol, "vertex at radius {r}");
            }
        }
        for leaf in t.leaf_nodes(t.root()) {
            let node = t.node(leaf).unwrap();
            assert!(node.depth() <= 5);
        }
    }

    #[test]
    fn test_collapse_after_cuts_from_two_volumes() {
        let mut t = tree(1.0, 2);
        t.init(2).unwrap();
        // Empty the low-x half of octant 0, then the high-x half.
        let a = Cuboid::from_bounds([-2.0, -2.0, -2.0, -0.5, 0.0, 0.0]).unwrap();
        let b = Cuboid::from_bounds([-0.5, -2.0, -2.0, 0.0, 0.0, 0.0]).unwrap();
        t.subtract(&a).unwrap();
        let stats = t.subtract(&b).unwrap();
        assert_eq!(stats.collapsed, 1);

        let first = t.leaf_nodes(t.root())[0];
        let node = t.node(first).unwrap();
        assert_eq!(node.depth(), 1);
        assert!(node.classification().is_inside());
        assert!(node.mc_triangles().is_empty());
        check_invariants(&t);
    }

    fn area(triangles: &[Triangle]) -> f64 {
        triangles.iter().map(Triangle::area).sum()
    }

    #[test]
    fn test_pocket_mesh_areas() {
        // Pocket walls lie on grid planes of depth 2 (edge 4).
        let mut t = tree(8.0, 3);
        let pocket = Cuboid::from_bounds([-4.0, -4.0, 4.0, 4.0, 4.0, 20.0]).unwrap();
        let stats = t.subtract(&pocket).unwrap();
        check_invariants(&t);

        // Cells flush with the pocket are not refined.
        assert_eq!(t.leaf_counts_by_depth(), vec![0, 4, 28, 0]);
        assert_eq!(stats.removed, 4);

        // Floor 8 x 8 plus four walls 8 wide and 4 deep.
        assert_abs_diff_eq!(area(&t.surface_mesh()), 64.0 + 4.0 * 32.0, epsilon = 1e-6);
        // Five untouched faces plus the top face minus the opening.
        assert_abs_diff_eq!(
            area(&t.boundary_cap_mesh()),
            5.0 * 256.0 + 192.0,
            epsilon = 1e-6
        );

        let (vertices, indices) = t.to_mesh();
        assert!(!vertices.is_empty());
        assert_eq!(indices.len() % 3, 0);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        // Welding shares corners between neighbouring triangles.
        assert!(vertices.len() < indices.len());
    }

    #[test]
    fn test_subtract_exact_octant() {
        let mut t = tree(10.0, 4);
        let octant = Cuboid::from_bounds([0.0, 0.0, 0.0, 10.0, 10.0, 10.0]).unwrap();
        let stats = t.subtract(&octant).unwrap();

        assert_eq!(stats.subdivided, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(t.leaf_counts_by_depth(), vec![0, 7, 0, 0, 0]);
        for id in t.leaf_nodes(t.root()) {
            let node = t.node(id).unwrap();
            assert_eq!(node.classification(), Classification::Outside);
            assert_ne!(node.octant(), 7);
        }
        check_invariants(&t);

        // The three faces left behind by the removed octant.
        assert_abs_diff_eq!(area(&t.surface_mesh()), 300.0, epsilon = 1e-6);
        assert_abs_diff_eq!(area(&t.boundary_cap_mesh()), 2400.0 - 300.0, epsilon = 1e-6);
        assert!(t.sdf_at(&Point3::new(5.0, 5.0, 5.0)) > 0.0);
        assert!(t.sdf_at(&Point3::new(-5.0, 5.0, 5.0)) < 0.0);
    }

    #[test]
    fn test_clear_and_snapshot() {
        let mut t = tree(4.0, 3);
        let ball = Sphere::new(Point3::new(4.0, 0.0, 0.0), 2.0).unwrap();
        t.subtract(&ball).unwrap();

        let json = t.to_json().unwrap();
        let restored = Octree::from_json(&json).unwrap();
        assert_eq!(restored.node_count(), t.node_count());
        assert_eq!(restored.leaf_counts_by_depth(), t.leaf_counts_by_depth());
        assert_eq!(restored.surface_mesh().len(), t.surface_mesh().len());

        t.clear();
        assert_eq!(t.node_count(), 1);
        assert_eq!(t.max_depth(), 3);
    }

    #[test]
    fn test_snapshot_rejects_bad_config() {
        let mut t = tree(4.0, 3);
        t.init(2).unwrap();
        let json = t.to_json().unwrap();
        assert!(json.contains("\"max_depth\":3"));

        let zero = json.replace("\"max_depth\":3", "\"max_depth\":0");
        assert!(matches!(
            Octree::from_json(&zero),
            Err(OctreeError::InvalidDepth { depth: 0, .. })
        ));

        let shallow = json.replace("\"max_depth\":3", "\"max_depth\":1");
        assert!(matches!(
            Octree::from_json(&shallow),
            Err(OctreeError::InvalidSnapshot(_))
        ));

        let scale = json.replace("\"root_scale\":4.0", "\"root_scale\":-4.0");
        assert!(matches!(
            Octree::from_json(&scale),
            Err(OctreeError::InvalidScale(_))
        ));

        assert!(matches!(
            Octree::from_json("{"),
            Err(OctreeError::Snapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_broken_links() {
        let mut t = tree(4.0, 3);
        t.init(1).unwrap();
        let root = t.root();
        let first = t.leaf_nodes(root)[0];
        t.nodes[first].depth = 3;
        let json = serde_json::to_string(&t).unwrap();
        assert!(matches!(
            Octree::from_json(&json),
            Err(OctreeError::InvalidSnapshot(_))
        ));

        t.nodes[first].depth = 1;
        t.nodes[root].child_count = 7;
        let json = serde_json::to_string(&t).unwrap();
        assert!(matches!(
            Octree::from_json(&json),
            Err(OctreeError::InvalidSnapshot(_))
        ));

        t.nodes[root].child_count = 8;
        let json = serde_json::to_string(&t).unwrap();
        assert!(Octree::from_json(&json).is_ok());
    }
}
