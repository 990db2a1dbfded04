//! Trilinear interpolation of corner samples.
//!
//! Corner values are stored in Morton order: bit 0 of the index selects the
//! max-x corner, bit 1 max-y, bit 2 max-z.

use stockcut_math::{Aabb3, Point3, Vec3};

/// Position of `p` inside `cell` as fractions of the cell extent, clamped to
/// `[0, 1]`.
pub(crate) fn local_coords(cell: &Aabb3, p: &Point3) -> [f64; 3] {
    let size = cell.max - cell.min;
    std::array::from_fn(|axis| {
        if size[axis] <= 0.0 {
            0.0
        } else {
            ((p[axis] - cell.min[axis]) / size[axis]).clamp(0.0, 1.0)
        }
    })
}

/// Weight of corner `corner` at local coordinates `u`.
fn weight(corner: usize, u: &[f64; 3]) -> f64 {
    (0..3)
        .map(|axis| if corner >> axis & 1 == 1 { u[axis] } else { 1.0 - u[axis] })
        .product()
}

/// Interpolate corner `values` at local coordinates `u`.
pub(crate) fn trilinear(values: &[f64; 8], u: &[f64; 3]) -> f64 {
    (0..8).map(|k| values[k] * weight(k, u)).sum()
}

/// World-space gradient of the trilinear field over `cell` at `p`.
pub(crate) fn gradient(cell: &Aabb3, values: &[f64; 8], p: &Point3) -> Vec3 {
    let u = local_coords(cell, p);
    let size = cell.max - cell.min;
    let mut g = Vec3::zeros();
    for axis in 0..3 {
        if size[axis] <= 0.0 {
            continue;
        }
        let mut d = 0.0;
        for (k, v) in values.iter().enumerate() {
            let sign = if k >> axis & 1 == 1 { 1.0 } else { -1.0 };
            let rest: f64 = (0..3)
                .filter(|&a| a != axis)
                .map(|a| if k >> a & 1 == 1 { u[a] } else { 1.0 - u[a] })
                .product();
            d += sign * v * rest;
        }
        g[axis] = d / size[axis];
    }
    g
}
