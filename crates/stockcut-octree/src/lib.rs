#![warn(missing_docs)]

//! Adaptive octree stock model with Boolean subtraction.
//!
//! The stock starts as one solid cube. Cutting volumes are subtracted with
//! [`Octree::subtract`]: cells swallowed by a volume are deleted, cells its
//! surface passes through are refined down to the maximum depth, and the
//! rest of the tree is never visited. The remaining material is turned into
//! triangles with marching cubes plus flat caps on the faces of the root
//! cube.
//!
//! # Example
//!
//! ```
//! use stockcut_math::Point3;
//! use stockcut_octree::Octree;
//! use stockcut_volume::Sphere;
//!
//! let mut stock = Octree::new(10.0, 5, Point3::origin()).unwrap();
//! let ball = Sphere::new(Point3::new(10.0, 10.0, 10.0), 6.0).unwrap();
//! let stats = stock.subtract(&ball).unwrap();
//! assert!(stats.removed > 0);
//!
//! let surface = stock.surface_mesh();
//! let caps = stock.boundary_cap_mesh();
//! assert!(!surface.is_empty() && !caps.is_empty());
//! ```

mod config;
mod field;
mod marching_cubes;
mod node;
mod octree;
mod subtract;

pub use config::{OctreeConfig, MAX_DEPTH_LIMIT};
pub use marching_cubes::MarchingCubes;
pub use node::{Node, NodeId};
pub use octree::{DiffStats, Octree};
pub use subtract::{linearize_arc, ArcDir, ToolMove};

use stockcut_volume::VolumeError;
use thiserror::Error;

/// Errors from octree operations.
#[derive(Debug, Error)]
pub enum OctreeError {
    /// Root half-width is not a positive finite number.
    #[error("invalid root scale: {0}")]
    InvalidScale(f64),

    /// Maximum depth outside the supported range.
    #[error("max depth {depth} outside 1..={limit}")]
    InvalidDepth {
        /// Requested depth.
        depth: u32,
        /// Largest supported depth.
        limit: u32,
    },

    /// The node already has children.
    #[error("node at depth {depth} is already subdivided")]
    AlreadySubdivided {
        /// Depth of the node.
        depth: u32,
    },

    /// Subdividing would go below the maximum depth.
    #[error("depth {depth} exceeds max depth {max_depth}")]
    DepthExceeded {
        /// Depth that would have been reached.
        depth: u32,
        /// Configured maximum depth.
        max_depth: u32,
    },

    /// The node id does not belong to this tree.
    #[error("unknown node")]
    UnknownNode,

    /// A cutting volume could not be built.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Snapshot could not be written or read.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot parsed but describes an inconsistent tree.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for octree operations.
pub type Result<T> = std::result::Result<T, OctreeError>;
