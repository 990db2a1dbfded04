//! Octree configuration.

use serde::{Deserialize, Serialize};
use stockcut_math::Point3;

use crate::{Octree, OctreeError, Result};

/// Deepest supported subdivision level.
pub const MAX_DEPTH_LIMIT: u32 = 16;

/// Parameters of a new octree.
///
/// Missing TOML keys fall back to [`OctreeConfig::default`].
///
/// ```
/// use stockcut_octree::OctreeConfig;
///
/// let config = OctreeConfig::from_toml_str("root_scale = 25.0\nmax_depth = 4").unwrap();
/// let tree = config.build().unwrap();
/// assert_eq!(tree.max_depth(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Half-width of the root cube.
    pub root_scale: f64,
    /// Maximum subdivision depth, the root being depth 0.
    pub max_depth: u32,
    /// Center of the root cube.
    pub center: [f64; 3],
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            root_scale: 50.0,
            max_depth: 6,
            center: [0.0; 3],
        }
    }
}

impl OctreeConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.root_scale.is_finite() && self.root_scale > 0.0) {
            return Err(OctreeError::InvalidScale(self.root_scale));
        }
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(OctreeError::InvalidDepth {
                depth: self.max_depth,
                limit: MAX_DEPTH_LIMIT,
            });
        }
        Ok(())
    }

    /// Validate and build a tree holding one solid root cube.
    pub fn build(&self) -> Result<Octree> {
        self.validate()?;
        let [x, y, z] = self.center;
        Ok(Octree::from_parts(
            self.root_scale,
            self.max_depth,
            Point3::new(x, y, z),
        ))
    }
}
