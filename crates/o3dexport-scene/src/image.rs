//! Image datablocks

use std::path::PathBuf;

/// Extensions an exported texture file may carry, leading dot included
pub const SUPPORTED_IMAGE_FILE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".bmp"];

/// Image datablock kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageKind {
    /// A regular (file backed or packed) image
    Image,
    /// Render results, viewer nodes, movies... never exported
    Other(String),
}

/// An image datablock as the authoring tool reports it
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: String,
    pub kind: ImageKind,
    /// Declared file format, e.g. `PNG`, `JPEG`, `BMP`, `OPEN_EXR`
    pub file_format: String,
    /// Whether the pixels are loaded in memory
    pub has_data: bool,
    /// Number of datablocks using this image
    pub users: u32,
    /// Where the pixels can be read from
    pub source_path: Option<PathBuf>,
}

impl Image {
    pub fn new(name: impl Into<String>, file_format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ImageKind::Image,
            file_format: file_format.into(),
            has_data: true,
            users: 1,
            source_path: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn without_data(mut self) -> Self {
        self.has_data = false;
        self
    }

    /// Extension matching the declared file format, if it is exportable
    pub fn declared_extension(&self) -> Option<&'static str> {
        extension_for_format(&self.file_format)
    }

    /// Images in use must have their pixels loaded before an export starts
    pub fn is_ready(&self) -> bool {
        match self.kind {
            ImageKind::Image => self.users == 0 || self.has_data,
            ImageKind::Other(_) => true,
        }
    }
}

/// Extension for a declared image file format
pub fn extension_for_format(format: &str) -> Option<&'static str> {
    match format {
        "BMP" => Some(".bmp"),
        "PNG" => Some(".png"),
        "JPEG" => Some(".jpeg"),
        _ => None,
    }
}

/// True when `name` ends in one of [`SUPPORTED_IMAGE_FILE_EXTENSIONS`]
pub fn has_supported_extension(name: &str) -> bool {
    SUPPORTED_IMAGE_FILE_EXTENSIONS
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext))
}
