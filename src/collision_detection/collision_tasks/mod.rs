// Closed-form pair testers
pub mod capsule_pair_tester;
pub mod sphere_box_tester;
pub mod sphere_pair_tester;

// General convex and soup paths
pub mod convex_pair_tester;
pub mod mesh_tester;
