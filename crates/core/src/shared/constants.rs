/// Cascade file names looked up in the data and bundled dirs, in order.
pub const CASCADE_MODEL_NAMES: &[&str] = &["haarcascade_frontalface_default.xml", "frontalface.json"];

/// Environment variable that overrides cascade model lookup.
pub const CASCADE_ENV_VAR: &str = "SKINTONE_CASCADE";

pub const DEFAULT_SCALE_FACTOR: f64 = 1.05;
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;

/// Smallest face edge (px) the detector evaluates for general uploads.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 25;

/// Size floor for close-up camera captures, where small hits are noise.
pub const CLOSE_UP_MIN_FACE_SIZE: u32 = 100;

/// Masked pixels needed before the skin mask is trusted.
pub const MIN_MASKED_SAMPLES: usize = 50;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
