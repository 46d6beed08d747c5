pub mod bounding_box;
pub mod math_helper;
pub mod matrix;
pub mod plane;
