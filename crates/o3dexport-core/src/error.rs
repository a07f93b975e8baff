//! Unified error handling for o3dexport
//!
//! This module provides the error type shared by the scene model, the
//! exporter and the re-import consumer.

use std::path::PathBuf;
use thiserror::Error;

/// Message attached to [`Error::ImagesNotReady`].
pub const IMAGES_NOT_READY_HINT: &str =
    "Images are not ready to export. Try again in a few seconds.";

/// Unified error type for all o3dexport operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// An output directory could not be created
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==================== Scene Errors ====================

    /// The scene description is malformed
    #[error("Invalid scene: {message}")]
    InvalidScene {
        message: String,
    },

    /// The object uses a rotation mode that cannot be expressed as XYZ eulers
    #[error("Object '{object}' has unsupported rotation mode '{mode}'")]
    UnsupportedRotationMode {
        object: String,
        mode: String,
    },

    // ==================== Image Errors ====================

    /// Image referenced by a texture node is missing from the scene
    #[error("Image not found: {name}")]
    ImageNotFound {
        name: String,
    },

    /// The image declares a file format we cannot export
    #[error("Image '{name}' has unsupported file format '{format}'")]
    UnsupportedImageFormat {
        name: String,
        format: String,
    },

    /// Some images used by the scene are not loaded yet
    #[error("{}", IMAGES_NOT_READY_HINT)]
    ImagesNotReady,

    // ==================== Export Errors ====================

    /// Discovery found no textures, materials, meshes or scene graph
    #[error("There's nothing to export in this scene")]
    NothingToExport,

    /// The output root is neither a project nor a gem directory
    #[error("Not an O3DE project or gem directory: {0}")]
    NotAProjectDirectory(PathBuf),

    /// Export failed
    #[error("Export failed: {message}")]
    ExportFailed {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// External error (from collaborators such as image codecs)
    #[error("{0}")]
    External(String),
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid scene error
    pub fn invalid_scene(message: impl Into<String>) -> Self {
        Error::InvalidScene {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an export failure
    pub fn export_failed(message: impl Into<String>) -> Self {
        Error::ExportFailed {
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) | Error::ImageNotFound { .. } => true,
            Error::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error refuses a run before any asset is written
    pub fn is_precondition_failure(&self) -> bool {
        match self {
            Error::ImagesNotReady
            | Error::NothingToExport
            | Error::NotAProjectDirectory(_)
            | Error::DirectoryCreation { .. } => true,
            Error::WithContext { source, .. } => source.is_precondition_failure(),
            _ => false,
        }
    }

    /// Check if this is an image-related error a tolerant export may skip
    pub fn is_invalid_texture(&self) -> bool {
        match self {
            Error::ImageNotFound { .. } | Error::UnsupportedImageFormat { .. } => true,
            Error::WithContext { source, .. } => source.is_invalid_texture(),
            _ => false,
        }
    }

    /// Suggestion shown to the user when the run can be retried later
    pub fn retry_hint(&self) -> Option<&'static str> {
        match self {
            Error::ImagesNotReady => Some(IMAGES_NOT_READY_HINT),
            Error::WithContext { source, .. } => source.retry_hint(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
