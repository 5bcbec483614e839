use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "image '{name}' ({width}x{height}) does not fit in a {max_width}x{max_height} page"
    )]
    SizeExceeded {
        name: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("frame name '{name}' is used by more than one image")]
    NameCollision { name: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("nothing to pack")]
    Empty,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
