//! Import errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scene graph {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Scene graph not found: {0}")]
    SceneGraphNotFound(PathBuf),

    /// Names identify entities, so they must be unique in the level
    #[error("Found {count} entities named '{name}'")]
    AmbiguousEntity { name: String, count: usize },

    #[error("Editor error: {0}")]
    Editor(String),
}

pub type ImportResult<T> = Result<T, ImportError>;

impl From<ImportError> for o3dexport_core::Error {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Io(io) => o3dexport_core::Error::Io(io),
            ImportError::SceneGraphNotFound(path) => o3dexport_core::Error::FileNotFound(path),
            ImportError::Parse { path, source } => {
                o3dexport_core::Error::Json(source).with_context(format!("scene graph {}", path.display()))
            }
            other => o3dexport_core::Error::External(other.to_string()),
        }
    }
}
