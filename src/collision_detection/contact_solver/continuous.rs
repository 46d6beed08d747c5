use glam::Vec3;

use crate::collision_detection::contact::ContactPoint;
use crate::utilities::plane::Plane;

use super::{ClipFace, ContactSolver, GjkResult, MinkError, ROBUST_PLANE_CLIP};

/// Result of a continuous query: the earliest impact time within the
/// timestep, if any, and whether a trigger volume overlap was seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOutcome {
    pub time_of_impact: Option<f32>,
    pub in_trigger: bool,
}

impl<'a> ContactSolver<'a> {
    /// Captures the body velocities for a continuous query. The sweep runs
    /// along the floating body's velocity relative to the reference body,
    /// expressed in the reference local frame.
    pub(crate) fn calculate_velocities(&mut self, reference_veloc: Vec3, floating_veloc: Vec3) {
        self.reference_veloc = reference_veloc;
        self.local_rel_veloc = self
            .reference_matrix
            .unrotate_vector(floating_veloc - reference_veloc);
    }

    /// Conservative advancement along the relative velocity: starting from
    /// the separating plane at time zero, repeatedly advances a candidate
    /// origin to the plane crossing time and re-certifies separation there,
    /// until the time of impact stops moving. Already-overlapping pairs
    /// report contact at time zero.
    pub(crate) fn hull_hull_continue_contacts(
        &mut self,
        timestep: f32,
        contact_id: u32,
        is_trigger: bool,
        max_contacts: usize,
        out: &mut Vec<ContactPoint>,
    ) -> Result<ContinueOutcome, MinkError> {
        out.clear();
        let mut outcome = ContinueOutcome::default();

        match self.calc_separating_plane()? {
            GjkResult::Intersecting => {
                if is_trigger {
                    outcome.time_of_impact = Some(0.0);
                    outcome.in_trigger = true;
                    return Ok(outcome);
                }
                if let Some(face) = self.calculate_clip_plane() {
                    self.calculate_contacts(&face, contact_id, max_contacts, out);
                    outcome.time_of_impact = Some(0.0);
                }
                Ok(outcome)
            }
            GjkResult::Disjoint(row) => {
                let (mut plane_normal, mut i0) = self.face_cross_normal(row);
                let mut proj_veloc = plane_normal.dot(self.local_rel_veloc);
                if proj_veloc >= -1.0e-24 {
                    // The winning face does not oppose the motion; try the
                    // descent again from scratch.
                    match self.update_separating_plane(Vec3::ZERO)? {
                        GjkResult::Disjoint(row) => {
                            (plane_normal, i0) = self.face_cross_normal(row);
                            proj_veloc = plane_normal.dot(self.local_rel_veloc);
                            if proj_veloc >= -1.0e-24 {
                                return Ok(outcome);
                            }
                        }
                        GjkResult::Intersecting => return Ok(outcome),
                    }
                }

                let mut time_of_impact =
                    plane_normal.dot(self.hull[i0]) / (proj_veloc + 1.0e-24);
                if time_of_impact <= 0.0 {
                    return Ok(outcome);
                }

                let mut saved_hull = [Vec3::ZERO; 3];
                let mut saved_aver = [Vec3::ZERO; 3];
                self.save_face(row, &mut saved_hull, &mut saved_aver);
                let mut advanced = self.local_rel_veloc * time_of_impact;

                let mut t0 = 0.0f32;
                for _ in 0..32 {
                    if time_of_impact >= timestep || time_of_impact <= t0 {
                        break;
                    }
                    t0 = time_of_impact;
                    match self.update_separating_plane(advanced)? {
                        GjkResult::Disjoint(row) => {
                            let (normal, i0) = self.face_cross_normal(row);
                            let mut den = normal.dot(self.local_rel_veloc);
                            if den >= -1.0e-24 {
                                // Advance plane faces along the motion; one
                                // more descent decides whether the sweep
                                // escapes entirely.
                                match self.update_separating_plane(advanced)? {
                                    GjkResult::Disjoint(row2) => {
                                        let (normal2, _) = self.face_cross_normal(row2);
                                        den = normal2.dot(self.local_rel_veloc);
                                        if den >= 0.0 {
                                            return Ok(outcome);
                                        }
                                    }
                                    GjkResult::Intersecting => return Ok(outcome),
                                }
                            }
                            self.save_face(row, &mut saved_hull, &mut saved_aver);
                            if den < -1.0e-24 {
                                time_of_impact = normal.dot(self.hull[i0]) / den;
                                if time_of_impact < 0.0 {
                                    return Ok(outcome);
                                }
                                advanced = self.local_rel_veloc * time_of_impact;
                            }
                        }
                        GjkResult::Intersecting => break,
                    }
                }

                if time_of_impact >= 0.0 && time_of_impact <= timestep {
                    if max_contacts > 0 {
                        self.calculate_contacts_continues(
                            contact_id,
                            max_contacts,
                            &saved_hull,
                            &saved_aver,
                            time_of_impact,
                            out,
                        );
                    }
                    if is_trigger {
                        out.clear();
                        outcome.in_trigger = true;
                    }
                    outcome.time_of_impact = Some(time_of_impact);
                    // The reference body also moved during the advance; slide
                    // the contacts with it.
                    let step = self.reference_veloc * time_of_impact;
                    for contact in out.iter_mut() {
                        contact.point += step;
                    }
                }
                Ok(outcome)
            }
        }
    }

    /// Unnormalized winding normal of a simplex face row, plus its first
    /// vertex slot.
    fn face_cross_normal(&self, row: usize) -> (Vec3, usize) {
        let idx = self.tables.face_index[row];
        let p0 = self.hull[idx[0]];
        let n = (self.hull[idx[1]] - p0).cross(self.hull[idx[2]] - p0);
        (n, idx[0])
    }

    fn save_face(&self, row: usize, hull: &mut [Vec3; 3], aver: &mut [Vec3; 3]) {
        let idx = self.tables.face_index[row];
        for i in 0..3 {
            hull[i] = self.hull[idx[i]];
            aver[i] = self.aver[idx[i]];
        }
    }

    /// Contact generation at the impact instant: the saved separating face
    /// is advanced to the touch position and clipped like a resting contact.
    fn calculate_contacts_continues(
        &mut self,
        contact_id: u32,
        max_contacts: usize,
        saved_hull: &[Vec3; 3],
        saved_aver: &[Vec3; 3],
        time_of_impact: f32,
        out: &mut Vec<ContactPoint>,
    ) {
        let speed = self.local_rel_veloc.length();
        if speed < 1.0e-12 {
            return;
        }
        let step = self.local_rel_veloc * (time_of_impact + ROBUST_PLANE_CLIP / speed);
        for i in 0..3 {
            self.hull[i] = saved_hull[i] - step;
            self.aver[i] = saved_aver[i] + step;
        }
        let Some(mut plane) = Plane::try_from_points(self.hull[0], self.hull[1], self.hull[2])
        else {
            return;
        };
        if plane.normal.dot(self.local_rel_veloc) > 0.0 {
            plane = plane.flipped();
        }

        let saved_position = self.matrix.position;
        self.matrix.position += step;
        let face = ClipFace {
            plane,
            vertices: [0, 1, 2],
        };
        self.calculate_contacts(&face, contact_id, max_contacts, out);
        self.matrix.position = saved_position;
    }
}
