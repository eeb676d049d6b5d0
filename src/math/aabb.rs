//! Axis-aligned bounding box on the terrain plane

use crate::core::types::Vec2;

/// Axis-aligned rectangle defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and full size
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Get center point
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Closest point of the box to `p`
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Squared distance from `p` to the box; zero inside
    pub fn sqr_distance(&self, p: Vec2) -> f32 {
        (p - self.closest_point(p)).length_squared()
    }

    /// Distance from `p` to the nearest edge of the box; zero inside
    pub fn distance(&self, p: Vec2) -> f32 {
        self.sqr_distance(p).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec2::ZERO, Vec2::ONE);
        assert_eq!(aabb.center(), Vec2::splat(0.5));
        assert_eq!(aabb.size(), Vec2::ONE);
    }

    #[test]
    fn test_from_center_size() {
        let aabb = Aabb::from_center_size(Vec2::new(10.0, -10.0), Vec2::splat(4.0));
        assert_eq!(aabb.min, Vec2::new(8.0, -12.0));
        assert_eq!(aabb.max, Vec2::new(12.0, -8.0));
    }

    #[test]
    fn test_sqr_distance() {
        let aabb = Aabb::from_center_size(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(aabb.sqr_distance(Vec2::new(1.0, 2.0)), 0.0);
        assert_eq!(aabb.sqr_distance(Vec2::new(8.0, 0.0)), 9.0);
        assert_eq!(aabb.sqr_distance(Vec2::new(8.0, 9.0)), 25.0);
        assert_eq!(aabb.distance(Vec2::new(-5.0, -11.0)), 6.0);
    }
}
