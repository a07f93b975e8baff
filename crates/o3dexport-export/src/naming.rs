//! Output file naming
//!
//! [`TextureNameRegistry`] hands out texture file names that are unique for
//! the lifetime of the registry. Names go through three steps: extension
//! normalization, collision versioning, registration.

use std::collections::HashSet;

use o3dexport_core::{Error, Result};
use o3dexport_scene::image::has_supported_extension;
use o3dexport_scene::{Image, SUPPORTED_IMAGE_FILE_EXTENSIONS};

use crate::asset::ColorChannel;

/// Suffix marking normal-map textures
pub const NORMAL_MAP_SUFFIX: &str = "normal";

/// Authority for collision-free texture file names
#[derive(Debug, Clone, Default)]
pub struct TextureNameRegistry {
    taken: HashSet<String>,
    order: Vec<String>,
}

impl TextureNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that treats `names` as already handed out, e.g. the names
    /// of a previous run that shares the output directory
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name.into());
        }
        registry
    }

    /// Names handed out so far, in registration order
    pub fn registered_names(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sanitizes and registers the file name of image `raw_name`.
    ///
    /// `image` is consulted only when the name carries no usable extension.
    pub fn sanitize(&mut self, raw_name: &str, image: Option<&Image>) -> Result<String> {
        let name = normalize_extension(raw_name, image)?;
        Ok(self.register_unique(name))
    }

    /// Like [`sanitize`](Self::sanitize) for an image sampled as a normal map
    pub fn sanitize_normal_map(&mut self, raw_name: &str, image: Option<&Image>) -> Result<String> {
        let name = normalize_extension(raw_name, image)?;
        Ok(self.register_unique(normal_map_name(&name)))
    }

    /// Registers an already well-formed file name, versioning it on collision
    pub fn reserve(&mut self, name: impl Into<String>) -> String {
        self.register_unique(name.into())
    }

    fn register_unique(&mut self, mut name: String) -> String {
        while self.taken.contains(&name) {
            name = next_version(&name);
        }
        self.register(name.clone());
        name
    }

    fn register(&mut self, name: String) {
        if self.taken.insert(name.clone()) {
            self.order.push(name);
        }
    }
}

/// Gives `raw_name` one of the supported image extensions.
///
/// - `wall.png` is kept
/// - `wall.png.001` becomes `wall.001.png`
/// - `wall` takes the extension of the image's declared file format
fn normalize_extension(raw_name: &str, image: Option<&Image>) -> Result<String> {
    if has_supported_extension(raw_name) {
        return Ok(raw_name.to_string());
    }

    for ext in SUPPORTED_IMAGE_FILE_EXTENSIONS {
        let marker = format!("{}.", ext);
        if let Some(pos) = raw_name.rfind(&marker) {
            let version = &raw_name[pos + marker.len()..];
            if pos > 0 && !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(format!("{}.{}{}", &raw_name[..pos], version, ext));
            }
        }
    }

    let image = image.ok_or_else(|| Error::ImageNotFound { name: raw_name.to_string() })?;
    if !image.has_data {
        tracing::warn!(image = %raw_name, "image has no data, keeping its name as is");
        return Ok(raw_name.to_string());
    }
    match image.declared_extension() {
        Some(ext) => Ok(format!("{}{}", raw_name, ext)),
        None => Err(Error::UnsupportedImageFormat {
            name: raw_name.to_string(),
            format: image.file_format.clone(),
        }),
    }
}

/// Next collision-free candidate for `name`.
///
/// The version lives at the end of the stem, before any `_suffix`:
/// `brick_normal.png` becomes `brick.001_normal.png`, then
/// `brick.002_normal.png`.
pub fn next_version(name: &str) -> String {
    let (stem, ext) = split_last(name, '.');
    let (head, suffix) = split_last(stem, '_');

    // At most 18 digits so the run always fits a u64
    let digits = head.bytes().rev().take_while(|b| b.is_ascii_digit()).take(18).count();
    let new_head = if digits == 0 {
        format!("{}.001", head)
    } else {
        let (prefix, number) = head.split_at(head.len() - digits);
        let next = number.parse::<u64>().unwrap_or(0) + 1;
        format!("{}{:0width$}", prefix, next, width = digits.max(3))
    };
    format!("{}{}{}", new_head, suffix, ext)
}

/// Splits at the last `sep`, keeping the separator on the right part.
/// Without a separator the right part is empty.
fn split_last(s: &str, sep: char) -> (&str, &str) {
    match s.rfind(sep) {
        Some(pos) => s.split_at(pos),
        None => (s, ""),
    }
}

/// Adds the `_normal` suffix to a texture name unless it already has it.
/// The suffix goes before the first `.`: `brick.png` becomes `brick_normal.png`.
pub fn normal_map_name(name: &str) -> String {
    let (base, rest) = match name.find('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    };
    let has_suffix = base
        .rsplit_once('_')
        .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case(NORMAL_MAP_SUFFIX));
    if has_suffix {
        name.to_string()
    } else {
        format!("{}_{}{}", base, NORMAL_MAP_SUFFIX, rest)
    }
}

/// File name of the single-channel variant of a texture: `<stem>_<Channel><ext>`
pub fn channel_variant_name(sanitized_name: &str, channel: ColorChannel) -> String {
    let (stem, ext) = split_last(sanitized_name, '.');
    format!("{}_{}{}", stem, channel.name(), ext)
}

/// Mesh file stem: every `.` replaced by `_`
pub fn sanitize_mesh_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Mesh file stems handed out in one run.
///
/// `Cube.001` and `Cube_001` sanitize alike; the later one is versioned to
/// `Cube_001_001`.
#[derive(Debug, Clone, Default)]
pub struct MeshNameRegistry {
    taken: HashSet<String>,
}

impl MeshNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sanitize(&mut self, mesh_name: &str) -> String {
        let mut name = sanitize_mesh_name(mesh_name);
        while self.taken.contains(&name) {
            name = sanitize_mesh_name(&next_version(&name));
        }
        self.taken.insert(name.clone());
        name
    }
}
