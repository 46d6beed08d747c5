use glam::Vec3;

/// Sentinel fraction reported when a ray misses. Deliberately outside the
/// valid [0, 1] range so callers can clamp against their current best hit
/// without a separate flag.
pub const RAY_CAST_MISS: f32 = 1.2;

/// Result of a shape ray cast: hit fraction along the segment and the outward
/// surface normal at the hit.
#[derive(Debug, Clone, Copy)]
pub struct RayCastResult {
    pub t: f32,
    pub normal: Vec3,
}

impl RayCastResult {
    #[inline(always)]
    pub fn miss() -> Self {
        Self {
            t: RAY_CAST_MISS,
            normal: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn hit(t: f32, normal: Vec3) -> Self {
        Self { t, normal }
    }

    #[inline(always)]
    pub fn is_hit(&self) -> bool {
        self.t <= 1.0
    }
}

impl Default for RayCastResult {
    fn default() -> Self {
        Self::miss()
    }
}
