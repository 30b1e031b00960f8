//! Common types for 3D geometry in container space.
//!
//! All lengths are centimetres, all masses kilograms. The coordinate
//! convention follows the container: `x` runs along the width, `y` along
//! the depth (with the open face at `y = 0`), `z` along the height.

use std::ops::{Add, Mul, Sub};

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in space.
///
/// Used for positions, dimensions, and calculations in 3D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Calculates the volume (product of all components).
    ///
    /// Useful for dimension vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.x > 0.0
            && self.y > 0.0
            && self.z > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max_component(&self) -> f64 {
        self.x.max(self.y).max(self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// The overlap test is strict: two boxes that merely share a face do not
/// overlap, so items may sit flush against each other and the container
/// walls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl Aabb {
    /// Creates a new bounding box.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if two bounding boxes overlap with positive volume.
    ///
    /// Implements the Separating Axis Theorem for AABBs: two boxes do NOT
    /// overlap if they are separated (or touching) in at least one axis.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if two bounding boxes touch or overlap (inclusive bounds).
    ///
    /// Used for coverage tests where a conservative superset is wanted,
    /// e.g. deciding which octants an item belongs to.
    #[inline]
    pub fn touches(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Checks if a point is inside the bounding box (inclusive).
    #[inline]
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Clamps this box to another box.
    ///
    /// The result may be degenerate (zero extent in one or more axes) when
    /// the boxes only touch; `None` when they are fully disjoint.
    pub fn clip_to(&self, bounds: &Self) -> Option<Self> {
        let min = Vec3::new(
            self.min.x.max(bounds.min.x),
            self.min.y.max(bounds.min.y),
            self.min.z.max(bounds.min.z),
        );
        let max = Vec3::new(
            self.max.x.min(bounds.max.x),
            self.max.y.min(bounds.max.y),
            self.max.z.min(bounds.max.z),
        );
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return None;
        }
        Some(Self { min, max })
    }

    /// Returns the dimensions (width, depth, height).
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the enclosed volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Input validation helpers shared by the model constructors.
pub mod validation {

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a mass in kilograms.
    pub fn validate_mass(value: f64) -> Result<(), String> {
        if value.is_nan() {
            return Err("mass must not be NaN".to_string());
        }
        if value.is_infinite() {
            return Err("mass must not be infinite".to_string());
        }
        if value <= 0.0 {
            return Err(format!("mass must be positive, got: {}", value));
        }
        Ok(())
    }

    /// Validates all three dimensions of a 3D object.
    pub fn validate_dimensions_3d(width: f64, depth: f64, height: f64) -> Result<(), String> {
        validate_dimension(width, "width")?;
        validate_dimension(depth, "depth")?;
        validate_dimension(height, "height")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_vec3_volume() {
        let dims = Vec3::new(10.0, 20.0, 30.0);
        assert!((dims.volume() - 6000.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_aabb_overlaps() {
        let a = Aabb::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b =
            Aabb::from_position_and_dims(Vec3::new(5.0, 5.0, 5.0), Vec3::new(10.0, 10.0, 10.0));
        let c =
            Aabb::from_position_and_dims(Vec3::new(20.0, 20.0, 20.0), Vec3::new(10.0, 10.0, 10.0));

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn touching_faces_do_not_overlap() {
        let a = Aabb::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let stacked =
            Aabb::from_position_and_dims(Vec3::new(0.0, 0.0, 10.0), Vec3::new(10.0, 10.0, 10.0));
        let beside =
            Aabb::from_position_and_dims(Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));

        assert!(!a.overlaps(&stacked));
        assert!(!a.overlaps(&beside));
        assert!(a.touches(&stacked));
        assert!(a.touches(&beside));
    }

    #[test]
    fn test_contains_point() {
        let a = Aabb::from_position_and_dims(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        assert!(a.contains_point(&Vec3::new(5.0, 5.0, 5.0)));
        assert!(a.contains_point(&Vec3::new(10.0, 10.0, 10.0)));
        assert!(!a.contains_point(&Vec3::new(11.0, 5.0, 5.0)));
    }

    #[test]
    fn clip_to_container_bounds() {
        let bounds = Aabb::from_position_and_dims(Vec3::zero(), Vec3::new(100.0, 100.0, 100.0));
        let oversized = Aabb::new(Vec3::new(-20.0, 50.0, 90.0), Vec3::new(40.0, 120.0, 140.0));

        let clipped = oversized.clip_to(&bounds).unwrap();
        assert_eq!(clipped.min, Vec3::new(0.0, 50.0, 90.0));
        assert_eq!(clipped.max, Vec3::new(40.0, 100.0, 100.0));

        let disjoint = Aabb::new(Vec3::new(200.0, 0.0, 0.0), Vec3::new(220.0, 10.0, 10.0));
        assert!(disjoint.clip_to(&bounds).is_none());
    }

    #[test]
    fn test_validation_dimension() {
        assert!(validation::validate_dimension(10.0, "width").is_ok());
        assert!(validation::validate_dimension(0.0, "width").is_err());
        assert!(validation::validate_dimension(-1.0, "width").is_err());
        assert!(validation::validate_dimension(f64::NAN, "width").is_err());
        assert!(validation::validate_dimension(f64::INFINITY, "width").is_err());
    }

    #[test]
    fn test_validation_mass() {
        assert!(validation::validate_mass(10.0).is_ok());
        assert!(validation::validate_mass(0.0).is_err());
        assert!(validation::validate_mass(-1.0).is_err());
    }
}
