//! Texture file output
//!
//! Saves image datablocks as texture files and splits single color channels
//! out of them.

mod converter;

pub use converter::{FsImageIo, ImageIo};

use std::path::PathBuf;

use thiserror::Error;

/// Texture output errors
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image '{name}' has no data")]
    NoData { name: String },

    #[error("Image '{name}' has no source file")]
    MissingSource { name: String },

    #[error("Source texture {0} does not exist")]
    SourceNotFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

impl From<TextureError> for o3dexport_core::Error {
    fn from(err: TextureError) -> Self {
        match err {
            TextureError::Io(io) => o3dexport_core::Error::Io(io),
            TextureError::SourceNotFound(path) => o3dexport_core::Error::FileNotFound(path),
            other => o3dexport_core::Error::External(other.to_string()),
        }
    }
}
