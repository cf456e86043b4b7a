use std::path::{Path, PathBuf};

use super::constants::{CASCADE_ENV_VAR, CASCADE_MODEL_NAMES};
use super::error::SkinToneError;

/// Resolve the cascade model file, checking locations in order.
///
/// Resolution order:
/// 1. Explicit path (from a CLI flag or config file)
/// 2. `SKINTONE_CASCADE` environment variable
/// 3. User data directory (platform-specific)
/// 4. Bundled path (for development / pre-packaged installs)
///
/// Directories are searched for OpenCV's `haarcascade_frontalface_default.xml`
/// first, then `frontalface.json`.
pub fn resolve(
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, SkinToneError> {
    let from_env = std::env::var_os(CASCADE_ENV_VAR).map(PathBuf::from);
    resolve_from(explicit, from_env, cascade_data_dir(), bundled_dir)
}

/// Platform-specific cascade directory.
///
/// - macOS: `~/Library/Application Support/skintone/cascades/`
/// - Linux: `$XDG_DATA_HOME/skintone/cascades/` or `~/.local/share/skintone/cascades/`
/// - Windows: `%APPDATA%/skintone/cascades/`
pub fn cascade_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("skintone").join("cascades"))
}

fn model_files(dir: PathBuf) -> impl Iterator<Item = PathBuf> {
    CASCADE_MODEL_NAMES.iter().map(move |name| dir.join(name))
}

fn resolve_from(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, SkinToneError> {
    let candidates: Vec<PathBuf> = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(from_env)
        .chain(data_dir.into_iter().flat_map(model_files))
        .chain(bundled_dir.map(Path::to_path_buf).into_iter().flat_map(model_files))
        .collect();

    // An explicit path that doesn't exist is an error, not a reason to fall through.
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(SkinToneError::CascadeNotFound {
                searched: vec![path.to_path_buf()],
            });
        }
    }

    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => {
            log::info!("Using cascade model {}", found.display());
            Ok(found.clone())
        }
        None => Err(SkinToneError::CascadeNotFound {
            searched: candidates,
        }),
    }
}
