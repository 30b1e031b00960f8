//! Geometric helper functions for footprints, collision and containment.
//!
//! Items rotate only about the vertical axis, so a rotation swaps width
//! and depth while the height stays fixed. Collision checks reuse the
//! strict AABB overlap from [`crate::types`]: touching faces never count
//! as a collision.

use crate::types::{Aabb, Vec3};

/// Returns the effective footprint `(width, depth)` of an item.
///
/// # Parameters
/// * `width` - Item width in its original orientation
/// * `depth` - Item depth in its original orientation
/// * `rotated` - Whether the item is rotated 90° about the vertical axis
#[inline]
pub fn footprint(width: f64, depth: f64, rotated: bool) -> (f64, f64) {
    if rotated {
        (depth, width)
    } else {
        (width, depth)
    }
}

/// Builds the AABB of an item footprint placed at `(x, y, z)`.
#[inline]
pub fn placed_aabb(x: f64, y: f64, z: f64, width: f64, depth: f64, height: f64) -> Aabb {
    Aabb::from_position_and_dims(Vec3::new(x, y, z), Vec3::new(width, depth, height))
}

/// Checks whether a footprint placed at `(x, y, z)` stays inside the
/// container box `[0..w] × [0..d] × [0..h]`.
///
/// # Parameters
/// * `container_dims` - Container dimensions (width, depth, height)
/// * `position` - Minimum corner of the candidate placement
/// * `item_dims` - Effective item dimensions after rotation
/// * `epsilon` - Numerical tolerance for the boundary comparison
#[inline]
pub fn contains(container_dims: Vec3, position: Vec3, item_dims: Vec3, epsilon: f64) -> bool {
    position.x >= -epsilon
        && position.y >= -epsilon
        && position.z >= -epsilon
        && position.x + item_dims.x <= container_dims.x + epsilon
        && position.y + item_dims.y <= container_dims.y + epsilon
        && position.z + item_dims.z <= container_dims.z + epsilon
}

/// Checks if two placed boxes collide.
///
/// Thin wrapper over the strict AABB test, kept as a free function so the
/// validators read naturally.
#[inline]
pub fn collides(a: &Aabb, b: &Aabb) -> bool {
    a.overlaps(b)
}
