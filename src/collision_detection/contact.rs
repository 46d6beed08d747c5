use glam::Vec3;

/// A single contact produced by the narrow phase. By convention the normal
/// points from shape B toward shape A and penetration is non-negative.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// World-space contact position.
    pub point: Vec3,
    /// World-space contact normal, from B toward A.
    pub normal: Vec3,
    /// Penetration depth along the normal. Zero for grazing contacts.
    pub penetration: f32,
    /// Identifier attached by the generating routine; mesh contacts carry
    /// the face id so the solver can look up surface materials.
    pub user_id: u32,
    /// Distinguishes edge-on contacts from face contacts. Downstream seam
    /// handling only blends normals for edge contacts.
    pub is_edge_contact: bool,
}

impl Default for ContactPoint {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration: 0.0,
            user_id: 0,
            is_edge_contact: false,
        }
    }
}

/// Removes near-duplicate contacts, preferring face contacts over the edge
/// contacts a mesh query accumulates along shared triangle edges.
pub fn filter_polygon_edge_contacts(contacts: &mut Vec<ContactPoint>) {
    if contacts.len() < 2 {
        return;
    }

    // Partition: face contacts first.
    contacts.sort_by_key(|c| c.is_edge_contact);
    let face_count = contacts.iter().filter(|c| !c.is_edge_contact).count();

    // Drop edge contacts sitting on top of a face contact.
    let mut i = face_count;
    while i < contacts.len() {
        let near_face = contacts[..face_count]
            .iter()
            .any(|f| (f.point - contacts[i].point).length_squared() < 1.0e-2);
        if near_face {
            contacts.swap_remove(i);
        } else {
            i += 1;
        }
    }

    // Drop exact duplicates regardless of classification.
    let mut i = 0;
    while i < contacts.len() {
        let mut k = i + 1;
        while k < contacts.len() {
            if (contacts[i].point - contacts[k].point).length_squared() < 1.0e-3 {
                contacts.swap_remove(k);
            } else {
                k += 1;
            }
        }
        i += 1;
    }
}

/// Thins a contact set down to at most `max_count` points by repeatedly
/// dropping the contact closest to one of its neighbors.
pub fn reduce_contacts(contacts: &mut Vec<ContactPoint>, max_count: usize) {
    while contacts.len() > max_count.max(1) {
        let mut closest = (0usize, f32::MAX);
        for i in 0..contacts.len() {
            for k in i + 1..contacts.len() {
                let dist = (contacts[i].point - contacts[k].point).length_squared();
                if dist < closest.1 {
                    closest = (k, dist);
                }
            }
        }
        contacts.swap_remove(closest.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_at(x: f32, edge: bool) -> ContactPoint {
        ContactPoint {
            point: Vec3::new(x, 0.0, 0.0),
            normal: Vec3::Y,
            is_edge_contact: edge,
            ..Default::default()
        }
    }

    #[test]
    fn edge_contacts_near_face_contacts_are_dropped() {
        let mut contacts = vec![
            contact_at(0.0, true),
            contact_at(0.01, false),
            contact_at(1.0, true),
        ];
        filter_polygon_edge_contacts(&mut contacts);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().any(|c| !c.is_edge_contact));
        assert!(contacts.iter().any(|c| c.point.x == 1.0));
    }

    #[test]
    fn reduce_contacts_keeps_spread() {
        let mut contacts = vec![
            contact_at(0.0, false),
            contact_at(0.05, false),
            contact_at(1.0, false),
            contact_at(2.0, false),
        ];
        reduce_contacts(&mut contacts, 3);
        assert_eq!(contacts.len(), 3);
        // The clustered pair lost a member, the spread survived.
        assert!(contacts.iter().any(|c| c.point.x == 2.0));
        assert!(contacts.iter().any(|c| c.point.x == 1.0));
    }
}
