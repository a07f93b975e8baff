//! JSON document output
//!
//! Writes material and scene-graph documents.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use o3dexport_core::document::{MaterialDocument, SceneGraphDocument};
use serde::Serialize;
use thiserror::Error;

/// JSON output errors
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export failed: {0}")]
    ExportFailed(String),
}

pub type JsonResult<T> = Result<T, JsonError>;

impl From<JsonError> for o3dexport_core::Error {
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Io(io) => o3dexport_core::Error::Io(io),
            JsonError::Serialization(json) => o3dexport_core::Error::Json(json),
            JsonError::ExportFailed(message) => o3dexport_core::Error::ExportFailed { message },
        }
    }
}

/// Serializes documents to files
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    pretty: bool,
}

impl DocumentWriter {
    /// Pretty-printing writer
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn write_material(&self, document: &MaterialDocument, output_path: impl AsRef<Path>) -> JsonResult<()> {
        self.write_json(document, output_path)
    }

    pub fn write_scene_graph(&self, document: &SceneGraphDocument, output_path: impl AsRef<Path>) -> JsonResult<()> {
        if document.name.is_empty() {
            return Err(JsonError::ExportFailed("scene graph has no name".to_string()));
        }
        self.write_json(document, output_path)
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: impl AsRef<Path>) -> JsonResult<()> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::new(file);

        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use o3dexport_core::document::{PropertyValue, SceneNodeDoc, TransformDoc};

    #[test]
    fn test_write_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Brick.material");
        let mut doc = MaterialDocument::standard_pbr();
        doc.set("baseColor.color", PropertyValue::Color([0.5, 0.25, 1.0]));

        DocumentWriter::new().write_material(&doc, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let back: MaterialDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_write_scene_graph_compact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Village.sgr");
        let doc = SceneGraphDocument {
            name: "Village".to_string(),
            children: vec![SceneNodeDoc {
                name: "House".to_string(),
                transform: TransformDoc::default(),
                mesh: None,
                materials: None,
                children: None,
            }],
        };

        DocumentWriter::compact().write_scene_graph(&doc, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains('\n'));
        assert!(!text.contains("mesh"));
    }

    #[test]
    fn test_unnamed_scene_graph() {
        let dir = tempfile::tempdir().unwrap();
        let doc = SceneGraphDocument { name: String::new(), children: Vec::new() };
        let err = DocumentWriter::new().write_scene_graph(&doc, dir.path().join("x.sgr")).unwrap_err();
        assert!(matches!(err, JsonError::ExportFailed(_)));
    }
}
