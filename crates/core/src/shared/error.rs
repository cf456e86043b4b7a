use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinToneError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image dimensions are zero")]
    ZeroDimensions,
    #[error("malformed cascade model: {0}")]
    CascadeFormat(String),
    #[error("no cascade model found (searched: {})", searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    CascadeNotFound { searched: Vec<PathBuf> },
    #[error("invalid rule table: {0}")]
    RuleTable(String),
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_not_found_lists_paths() {
        let err = SkinToneError::CascadeNotFound {
            searched: vec![PathBuf::from("/a/c.json"), PathBuf::from("/b/c.json")],
        };
        assert_eq!(
            err.to_string(),
            "no cascade model found (searched: /a/c.json, /b/c.json)"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SkinToneError>();
    }
}
