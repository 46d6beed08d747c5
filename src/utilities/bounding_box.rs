use glam::Vec3;

/// Padding added around every shape's world bounds. Absorbs float slop so the
/// (external) broad phase never culls a pair the narrow phase would report.
pub const AABB_PADDING: f32 = 1.0 / 16.0;

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline(always)]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point of the iterator. Empty input
    /// yields an inverted box that unions as the identity.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    #[inline(always)]
    pub fn inflate(&self, amount: f32) -> Self {
        let pad = Vec3::splat(amount);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    #[inline(always)]
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.min.y <= other.max.y
            && self.min.z <= other.max.z
            && self.max.x >= other.min.x
            && self.max.y >= other.min.y
            && self.max.z >= other.min.z
    }

    #[inline(always)]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_and_containment() {
        let a = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = BoundingBox::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = BoundingBox::new(Vec3::splat(1.5), Vec3::splat(2.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&c));
        assert!(a.contains_point(Vec3::ZERO));
        assert!(!a.contains_point(Vec3::splat(1.01)));
    }

    #[test]
    fn from_points_bounds() {
        let aabb = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 4.0, 0.0),
        ]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 0.5));
    }
}
