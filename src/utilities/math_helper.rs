use glam::Vec3;

/// Guard added to squared denominators before dividing. Keeps degenerate
/// segments and zero-area cross products from producing NaN; the quotient
/// collapses toward zero instead.
pub const DENOMINATOR_GUARD: f32 = 1.0e-24;

/// Squared length below which a vector is treated as having no direction.
pub const DEGENERATE_LENGTH_SQUARED: f32 = 1.0e-12;

/// Returns -1 if the value is negative and 1 otherwise.
#[inline(always)]
pub fn binary_sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Clamps a value between a minimum and maximum value.
#[inline(always)]
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Closest point on the segment [p0, p1] to the given point.
#[inline]
pub fn point_to_segment(point: Vec3, p0: Vec3, p1: Vec3) -> Vec3 {
    let dp = p1 - p0;
    let t = (point - p0).dot(dp) / (dp.dot(dp) + DENOMINATOR_GUARD);
    p0 + dp * clamp(t, 0.0, 1.0)
}

/// Closest points between the segments [p0, p1] and [q0, q1]. Returns the
/// point on the first segment followed by the point on the second.
pub fn segment_to_segment(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> (Vec3, Vec3) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= DEGENERATE_LENGTH_SQUARED && e <= DEGENERATE_LENGTH_SQUARED {
        return (p0, q0);
    }

    let (s, t);
    if a <= DEGENERATE_LENGTH_SQUARED {
        s = 0.0;
        t = clamp(f / e, 0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= DEGENERATE_LENGTH_SQUARED {
            t = 0.0;
            s = clamp(-c / a, 0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s0 = if denom > DENOMINATOR_GUARD {
                clamp((b * f - c * e) / denom, 0.0, 1.0)
            } else {
                0.0
            };
            let mut t0 = (b * s0 + f) / e;
            if t0 < 0.0 {
                t0 = 0.0;
                s0 = clamp(-c / a, 0.0, 1.0);
            } else if t0 > 1.0 {
                t0 = 1.0;
                s0 = clamp((b - c) / a, 0.0, 1.0);
            }
            s = s0;
            t = t0;
        }
    }
    (p0 + d1 * s, q0 + d2 * t)
}

/// Closest point on the triangle (p0, p1, p2) to the given point.
pub fn point_to_triangle(point: Vec3, p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    let ab = p1 - p0;
    let ac = p2 - p0;
    let ap = point - p0;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return p0;
    }

    let bp = point - p1;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return p1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3 + DENOMINATOR_GUARD);
        return p0 + ab * t;
    }

    let cp = point - p2;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return p2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6 + DENOMINATOR_GUARD);
        return p0 + ac * t;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6) + DENOMINATOR_GUARD);
        return p1 + (p2 - p1) * t;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    p0 + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_to_segment_clamps_to_endpoints() {
        let p0 = Vec3::new(-1.0, 0.0, 0.0);
        let p1 = Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(point_to_segment(Vec3::new(-5.0, 2.0, 0.0), p0, p1), p0);
        assert_relative_eq!(point_to_segment(Vec3::new(5.0, 2.0, 0.0), p0, p1), p1);
        assert_relative_eq!(
            point_to_segment(Vec3::new(0.25, 2.0, 0.0), p0, p1),
            Vec3::new(0.25, 0.0, 0.0)
        );
    }

    #[test]
    fn segment_to_segment_crossing() {
        let (c0, c1) = segment_to_segment(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(c0, Vec3::ZERO, epsilon = 1.0e-6);
        assert_relative_eq!(c1, Vec3::new(0.0, 0.0, 1.0), epsilon = 1.0e-6);
    }

    #[test]
    fn segment_to_segment_degenerate_segments() {
        let p = Vec3::new(0.5, 0.5, 0.5);
        let (c0, c1) = segment_to_segment(p, p, p, p);
        assert_relative_eq!(c0, p);
        assert_relative_eq!(c1, p);
    }

    #[test]
    fn point_to_triangle_regions() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(1.0, 0.0, 0.0);
        let p2 = Vec3::new(0.0, 1.0, 0.0);
        // Interior projection.
        assert_relative_eq!(
            point_to_triangle(Vec3::new(0.25, 0.25, 3.0), p0, p1, p2),
            Vec3::new(0.25, 0.25, 0.0),
            epsilon = 1.0e-6
        );
        // Vertex region.
        assert_relative_eq!(
            point_to_triangle(Vec3::new(-1.0, -1.0, 0.0), p0, p1, p2),
            p0
        );
        // Edge region.
        assert_relative_eq!(
            point_to_triangle(Vec3::new(0.5, -1.0, 0.0), p0, p1, p2),
            Vec3::new(0.5, 0.0, 0.0),
            epsilon = 1.0e-6
        );
    }
}
