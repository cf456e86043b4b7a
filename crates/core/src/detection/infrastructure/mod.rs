pub mod cascade_face_detector;
pub mod haar_cascade;
mod integral_image;
pub mod math;
