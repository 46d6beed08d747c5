use glam::Vec3;

use crate::utilities::plane::Plane;

use super::{
    ContactSolver, GjkResult, MinkError, CALCULATE_SEPARATING_PLANE_ERROR,
    CALCULATE_SEPARATING_PLANE_ERROR1, DISTANCE_TOLERANCE, DISTANCE_TOLERANCE_ZERO,
    FALLBACK_SEPARATING_DIST_TOLERANCE, FALLBACK_SEPARATING_PLANE_ITERATIONS,
    UPDATE_SEPARATING_PLANE_DISTANCE_TOLERANCE, UPDATE_SEPARATING_PLANE_MAX_ITERATION,
};

impl<'a> ContactSolver<'a> {
    /// Seeds a non-degenerate tetrahedron in Minkowski space from the probe
    /// direction table and hands it to the separating-plane descent. Probes
    /// are tried in order; when every straightforward attempt degenerates,
    /// the pass is repeated keeping whichever probe produced the largest
    /// length/area/volume metric.
    pub(crate) fn calc_separating_plane(&mut self) -> Result<GjkResult, MinkError> {
        let dirs = self.tables.probe_directions;
        let count = dirs.len();

        self.calc_support_vertex(dirs[0], 0);
        let mut e1 = Vec3::ZERO;
        let mut i = 1;
        while i < count {
            self.calc_support_vertex(dirs[i], 1);
            e1 = self.hull[1] - self.hull[0];
            if e1.length_squared() > CALCULATE_SEPARATING_PLANE_ERROR {
                break;
            }
            i += 1;
        }

        let mut normal = Vec3::ZERO;
        i += 1;
        while i < count {
            self.calc_support_vertex(dirs[i], 2);
            let e2 = self.hull[2] - self.hull[0];
            normal = e1.cross(e2);
            if normal.length_squared() > CALCULATE_SEPARATING_PLANE_ERROR1 {
                break;
            }
            i += 1;
        }

        let mut error2 = 0.0;
        i += 1;
        while i < count {
            self.calc_support_vertex(dirs[i], 3);
            let e3 = self.hull[3] - self.hull[0];
            error2 = normal.dot(e3);
            if error2.abs() > CALCULATE_SEPARATING_PLANE_ERROR1 {
                break;
            }
            i += 1;
        }

        if i >= count {
            // The simple pass degenerated; rebuild each vertex with the best
            // probe found over the whole table.
            let mut best = 0;
            let mut max_err = 0.0;
            for (j, dir) in dirs.iter().enumerate().skip(1) {
                self.calc_support_vertex(*dir, 1);
                let e = self.hull[1] - self.hull[0];
                let err = e.length_squared();
                if err > max_err {
                    best = j;
                    max_err = err;
                }
            }
            if max_err < DISTANCE_TOLERANCE_ZERO {
                // The whole difference collapses to a point.
                return Err(MinkError);
            }
            self.calc_support_vertex(dirs[best], 1);
            e1 = self.hull[1] - self.hull[0];

            let mut best = 0;
            let mut max_err = 0.0;
            for (j, dir) in dirs.iter().enumerate().skip(1) {
                self.calc_support_vertex(*dir, 2);
                let e2 = self.hull[2] - self.hull[0];
                let err = e1.cross(e2).length_squared();
                if err > max_err {
                    best = j;
                    max_err = err;
                }
            }
            if max_err < DISTANCE_TOLERANCE_ZERO {
                return Err(MinkError);
            }
            self.calc_support_vertex(dirs[best], 2);
            normal = e1.cross(self.hull[2] - self.hull[0]);

            let mut best = 0;
            let mut max_err = 0.0f32;
            for (j, dir) in dirs.iter().enumerate().skip(1) {
                self.calc_support_vertex(*dir, 3);
                let e3 = self.hull[3] - self.hull[0];
                let err = normal.dot(e3);
                if err.abs() > max_err.abs() {
                    best = j;
                    max_err = err;
                }
            }
            error2 = max_err;
            self.calc_support_vertex(dirs[best], 3);
        }

        self.vertex_index = 4;
        if error2 > 0.0 {
            self.swap_vertices(1, 2);
        }
        debug_assert!(self.check_tetra_volume());

        self.update_separating_plane(Vec3::ZERO)
    }

    /// The separating-plane descent: repeatedly replaces the simplex face the
    /// origin violates the most with a fresh support point. Detects cycling
    /// with a best-simplex restore and falls through to the perturbation
    /// fallback for ill-conditioned pairs.
    pub(crate) fn update_separating_plane(
        &mut self,
        origin: Vec3,
    ) -> Result<GjkResult, MinkError> {
        let face_index = self.tables.face_index;
        let mut saved_hull = [Vec3::ZERO; 4];
        let mut saved_aver = [Vec3::ZERO; 4];
        let mut last_descend_face = 0usize;
        let mut cycling: i32 = -1;
        let mut min_dist = f32::MAX;

        for _ in 0..UPDATE_SEPARATING_PLANE_MAX_ITERATION {
            // The face farthest on the wrong side of the origin.
            let mut face: Option<usize> = None;
            let mut max_dist = 0.0f32;
            let mut normal = Vec3::ZERO;
            for (row, indices) in face_index.iter().enumerate() {
                let p0 = self.hull[indices[0]];
                let p1 = self.hull[indices[1]];
                let p2 = self.hull[indices[2]];
                let n = (p1 - p0).cross(p2 - p0);
                let mag2 = n.length_squared();
                if mag2 > DISTANCE_TOLERANCE_ZERO {
                    let n = n * (1.0 / mag2.sqrt());
                    let dist = n.dot(origin - p0);
                    if dist > max_dist {
                        max_dist = dist;
                        normal = n;
                        face = Some(row);
                    }
                }
            }

            // No violated face: the origin is enclosed.
            let Some(face) = face else {
                return Ok(GjkResult::Intersecting);
            };

            self.calc_support_vertex(normal, 4);
            let i0 = face_index[face][0];
            let dist = normal.dot(self.hull[4] - self.hull[i0]);

            // The hull does not extend past this face: certified separation.
            if dist < UPDATE_SEPARATING_PLANE_DISTANCE_TOLERANCE {
                return Ok(GjkResult::Disjoint(face));
            }

            if dist < min_dist {
                min_dist = dist;
                last_descend_face = face;
                cycling = -1;
                saved_hull.copy_from_slice(&self.hull[..4]);
                saved_aver.copy_from_slice(&self.aver[..4]);
            }
            cycling += 1;
            if cycling > 4 {
                // Round-off is revisiting the same supports; restore the best
                // simplex seen and accept it as the separating face.
                self.hull[..4].copy_from_slice(&saved_hull);
                self.aver[..4].copy_from_slice(&saved_aver);
                return Ok(GjkResult::Disjoint(last_descend_face));
            }

            if dist < DISTANCE_TOLERANCE {
                // Progress fell under tolerance; if the new support revisits
                // a simplex vertex the plain descent cannot make progress.
                let revisit = (0..4).any(|i| {
                    (self.hull[i] - self.hull[4]).length_squared()
                        < DISTANCE_TOLERANCE * DISTANCE_TOLERANCE
                });
                if revisit {
                    log::debug!("separating-plane descent stalled, using fallback search");
                    return self.fallback_solution(origin);
                }
            }

            let i1 = face_index[face][1];
            let i2 = face_index[face][3];
            self.swap_vertices(i0, i1);
            self.hull[i2] = self.hull[4];
            self.aver[i2] = self.aver[4];
            if !self.check_tetra_volume() {
                self.swap_vertices(1, 2);
                debug_assert!(self.check_tetra_volume());
            }
        }

        log::debug!("separating-plane descent hit the iteration cap, using fallback search");
        self.fallback_solution(origin)
    }

    /// Robust direction-perturbation search for pairs the plain descent
    /// cannot handle (skewed proportions where float round-off cycles).
    /// Rebuilds the simplex explicitly by size: first a second distinct
    /// support, then a spanning third, then the opposing fourth.
    pub(crate) fn fallback_solution(&mut self, origin: Vec3) -> Result<GjkResult, MinkError> {
        let mut v = self.reduce_tetrahedron(origin) - origin;
        let mut dir0 = Vec3::ZERO;
        let mut cycling: i32 = -1;
        let mut min_dist = f32::MAX;

        for _ in 0..FALLBACK_SEPARATING_PLANE_ITERATIONS {
            if self.vertex_index >= 4 {
                break;
            }
            let dist2 = v.length_squared();
            if dist2 < 1.0e-9 {
                // The simplex reached the origin: complete it to a full
                // tetrahedron and report the intersection.
                self.complete_simplex_at_origin()?;
                return Ok(GjkResult::Intersecting);
            }

            if dist2 < min_dist {
                min_dist = dist2;
                cycling = -1;
            }

            let dir = v * -(1.0 / dist2.sqrt());
            let mut dist = if dir0.dot(dir) < 0.9995 {
                self.calc_support_vertex(dir, self.vertex_index);
                let w = self.hull[self.vertex_index] - origin;
                dir.dot(w - v)
            } else {
                0.0
            };

            cycling += 1;
            if cycling > 4 {
                dist = 0.0;
            }
            dir0 = dir;

            if dist < 5.0e-4 {
                // No more progress toward the origin: `dir` separates. Build
                // a simplex whose first face hugs the separating plane.
                return self.build_separating_simplex(origin, dir);
            }

            self.vertex_index += 1;
            v = match self.vertex_index {
                2 => self.reduce_line(origin) - origin,
                3 => self.reduce_triangle(origin) - origin,
                _ => self.reduce_tetrahedron(origin) - origin,
            };
        }

        if self.vertex_index >= 4 {
            if !self.check_tetra_volume() {
                self.swap_vertices(1, 2);
            }
            return Ok(GjkResult::Intersecting);
        }
        log::debug!("fallback separating-plane search failed to converge");
        Err(MinkError)
    }

    /// Grows a degenerate simplex (point or segment sitting on the origin)
    /// into a positively oriented tetrahedron. Each step runs once, in
    /// sequence, for whatever the current simplex size is.
    fn complete_simplex_at_origin(&mut self) -> Result<(), MinkError> {
        let dirs = self.tables.probe_directions;

        if self.vertex_index == 1 {
            let mut best = 0;
            let mut max_err = 0.0;
            let mut found = false;
            for (j, dir) in dirs.iter().enumerate() {
                self.calc_support_vertex(*dir, 1);
                let e = self.hull[1] - self.hull[0];
                let err = e.length_squared();
                if err > 1.0e-4 {
                    found = true;
                    break;
                }
                if err > max_err {
                    best = j;
                    max_err = err;
                }
            }
            if !found {
                if max_err < DISTANCE_TOLERANCE_ZERO {
                    return Err(MinkError);
                }
                self.calc_support_vertex(dirs[best], 1);
            }
            self.vertex_index = 2;
        }

        if self.vertex_index == 2 {
            let e0 = self.hull[1] - self.hull[0];
            let mut best = 0;
            let mut max_err = 0.0;
            let mut found = false;
            for (j, dir) in dirs.iter().enumerate() {
                self.calc_support_vertex(*dir, 2);
                let e1 = self.hull[2] - self.hull[0];
                let err = e0.cross(e1).length_squared();
                if err > 1.0e-4 {
                    found = true;
                    break;
                }
                if err > max_err {
                    best = j;
                    max_err = err;
                }
            }
            if !found {
                if max_err < DISTANCE_TOLERANCE_ZERO {
                    return Err(MinkError);
                }
                self.calc_support_vertex(dirs[best], 2);
            }
            self.vertex_index = 3;
        }

        // Fourth vertex: the deeper of the two supports along the triangle
        // normal.
        let p0 = self.hull[0];
        let normal = (self.hull[1] - p0).cross(self.hull[2] - p0);
        let mag2 = normal.length_squared();
        if mag2 < DISTANCE_TOLERANCE_ZERO {
            return Err(MinkError);
        }
        let normal = normal * (1.0 / mag2.sqrt());
        self.calc_support_vertex(normal, 3);
        self.calc_support_vertex(-normal, 4);
        if (self.hull[4] - p0).dot(normal).abs() > (self.hull[3] - p0).dot(normal).abs() {
            self.hull[3] = self.hull[4];
            self.aver[3] = self.aver[4];
        }
        self.vertex_index = 4;

        if !self.check_tetra_volume() {
            self.swap_vertices(1, 2);
            debug_assert!(self.check_tetra_volume());
        }
        Ok(())
    }

    /// Completes the simplex so that face 0 lies against the certified
    /// separating plane, perturbing probe directions in small angular steps
    /// to find distinct supports near the plane.
    fn build_separating_simplex(
        &mut self,
        origin: Vec3,
        dir: Vec3,
    ) -> Result<GjkResult, MinkError> {
        // Positive on the origin side of the supporting plane.
        let separating_plane = Plane::new(-dir, origin.dot(dir));

        if self.vertex_index == 1 {
            // Fan a cone around the separating direction until a support
            // distinct from vertex 0 appears; keep the candidate nearest the
            // plane.
            let mut best: Option<(f32, Vec3, Vec3)> = None;
            'yaw: for j in 1..180 {
                let polar = (j as f32) * 2.0f32.to_radians();
                for k in 0..8 {
                    let azimuth = (k as f32) * 45.0f32.to_radians();
                    let candidate = perturb_direction(dir, polar, azimuth);
                    self.calc_support_vertex(candidate, 2);
                    let err = self.hull[2] - self.hull[0];
                    if err.length_squared() > FALLBACK_SEPARATING_DIST_TOLERANCE {
                        let val = separating_plane.evaluate(self.hull[2]);
                        if best.map_or(true, |(b, _, _)| val < b) {
                            best = Some((val, self.hull[2], self.aver[2]));
                        }
                    }
                }
                if best.is_some() && j > 1 {
                    break 'yaw;
                }
            }
            let Some((_, hull, aver)) = best else {
                // A point-like difference: nothing to build a face from.
                return Ok(GjkResult::Disjoint(0));
            };
            self.hull[1] = hull;
            self.aver[1] = aver;
            self.vertex_index = 2;
        }

        if self.vertex_index == 2 {
            // Sweep the half great-circle on each side of the simplex edge
            // for a third support distinct from both vertices.
            let edge = (self.hull[1] - self.hull[0]).normalize_or_zero();
            if edge == Vec3::ZERO {
                return Ok(GjkResult::Disjoint(0));
            }
            let side = dir.cross(edge);

            let mut found = [None, None];
            for (slot, sweep_sign) in [(0usize, 1.0f32), (1usize, -1.0f32)] {
                for j in 1..90 {
                    let angle = (j as f32) * 2.0f32.to_radians() * sweep_sign;
                    let candidate =
                        (dir * angle.cos() + side * angle.sin()).normalize_or_zero();
                    if candidate == Vec3::ZERO {
                        continue;
                    }
                    self.calc_support_vertex(candidate, 2 + slot);
                    let p = self.hull[2 + slot];
                    if (p - self.hull[0]).length_squared() > FALLBACK_SEPARATING_DIST_TOLERANCE
                        && (p - self.hull[1]).length_squared()
                            > FALLBACK_SEPARATING_DIST_TOLERANCE
                    {
                        found[slot] = Some((
                            separating_plane.evaluate(p),
                            self.hull[2 + slot],
                            self.aver[2 + slot],
                        ));
                        break;
                    }
                }
            }
            // Keep the candidate nearest the separating plane as vertex 2.
            let pick = match (found[0], found[1]) {
                (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
            let Some((_, hull, aver)) = pick else {
                return Ok(GjkResult::Disjoint(0));
            };
            self.hull[2] = hull;
            self.aver[2] = aver;
            self.vertex_index = 3;
        }

        // Fourth vertex: the deepest support away from the separating plane.
        self.calc_support_vertex(-dir, 3);
        self.vertex_index = 4;
        if !self.check_tetra_volume() {
            self.swap_vertices(1, 2);
        }
        Ok(GjkResult::Disjoint(0))
    }
}

/// Rotates `dir` away from itself by `polar` radians, around an azimuth on
/// the perpendicular plane.
fn perturb_direction(dir: Vec3, polar: f32, azimuth: f32) -> Vec3 {
    let t1 = dir.any_orthonormal_vector();
    let t2 = dir.cross(t1);
    let radial = t1 * azimuth.cos() + t2 * azimuth.sin();
    (dir * polar.cos() + radial * polar.sin()).normalize()
}
