//! Material description emitter
//!
//! Maps a [`Translation`] onto the flat `<group>.<field>` properties of the
//! StandardPBR material type.

use o3dexport_core::document::MaterialDocument;

use crate::asset::{ColorChannel, TextureTable};
use crate::settings::{ExportSettings, PROJECT_ROOT_ALIAS};
use crate::translate::{ChannelValue, SemanticChannel, Translation};

/// Alpha above this is exported as an opaque material
pub const OPAQUE_ALPHA_THRESHOLD: f32 = 0.98;

/// A material slot translated for export
#[derive(Debug, Clone, PartialEq)]
pub struct O3Material {
    /// Slot the material was first found in
    pub slot_index: usize,
    pub name: String,
    pub translation: Translation,
}

/// Where an emitter points texture maps and how it flips normals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Texture directory relative to the project root, `/` separated
    pub texture_dir: String,
    pub flip_normal_x: bool,
    pub flip_normal_y: bool,
}

impl EmitOptions {
    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self {
            texture_dir: settings.texture_asset_dir(),
            flip_normal_x: settings.flip_normal_x,
            flip_normal_y: settings.flip_normal_y,
        }
    }
}

/// Builds the material document for `translation`.
///
/// Texture references missing from `textures` were dropped during discovery;
/// their channels are emitted untextured.
pub fn emit(translation: &Translation, textures: &TextureTable, options: &EmitOptions) -> MaterialDocument {
    let mut doc = MaterialDocument::standard_pbr();
    let specular_level_textured = translation
        .get(SemanticChannel::SpecularLevel)
        .and_then(|v| texture_path(v, textures, options))
        .is_some();

    for (channel, value) in &translation.channels {
        let texture = texture_path(value, textures, options);
        match channel {
            SemanticChannel::BaseColor => match texture {
                Some(path) => doc.set("baseColor.textureMap", path),
                None => doc.set("baseColor.color", value.literal.as_vec3()),
            },
            SemanticChannel::Metallic => set_factor_group(&mut doc, "metallic", value, texture),
            SemanticChannel::Roughness => set_factor_group(&mut doc, "roughness", value, texture),
            SemanticChannel::SpecularLevel => set_factor_group(&mut doc, "specularF0", value, texture),
            SemanticChannel::Alpha => {
                let mode = match &texture {
                    Some(_) => "Blended",
                    None if value.literal.as_scalar() > OPAQUE_ALPHA_THRESHOLD => "Opaque",
                    None => "Blended",
                };
                doc.set("opacity.mode", mode);
                set_factor_group(&mut doc, "opacity", value, texture);
            }
            SemanticChannel::SpecularTint => {
                // The tint texture only stands in for a missing specular level map
                if let Some(path) = texture.filter(|_| !specular_level_textured) {
                    doc.set("specularF0.textureMap", path);
                    doc.set("specularF0.useTexture", true);
                }
            }
            SemanticChannel::Normal => {
                if let Some(strength) = value.strength {
                    doc.set("normal.factor", strength);
                }
                match texture {
                    Some(path) => {
                        doc.set("normal.textureMap", path);
                        doc.set("normal.useTexture", true);
                    }
                    None => doc.set("normal.useTexture", false),
                }
                doc.set("normal.flipX", options.flip_normal_x);
                doc.set("normal.flipY", options.flip_normal_y);
            }
            SemanticChannel::MultiscatterCompensation => {
                if value.literal.as_scalar() > 0.5 {
                    doc.set("specularF0.enableMultiScatterCompensation", true);
                }
            }
        }
    }
    doc
}

/// `<group>.factor` for literals, `<group>.textureMap` for textures, and
/// `<group>.useTexture` either way
fn set_factor_group(doc: &mut MaterialDocument, group: &str, value: &ChannelValue, texture: Option<String>) {
    match texture {
        Some(path) => {
            doc.set(format!("{}.textureMap", group), path);
            doc.set(format!("{}.useTexture", group), true);
        }
        None => {
            doc.set(format!("{}.factor", group), value.literal.as_scalar());
            doc.set(format!("{}.useTexture", group), false);
        }
    }
}

/// Project-rooted path of the texture feeding `value`, if it was exported
fn texture_path(value: &ChannelValue, textures: &TextureTable, options: &EmitOptions) -> Option<String> {
    let reference = value.texture.as_ref()?;
    let asset = textures.get(&reference.name)?;
    let file_name = value
        .sampled_channel
        .filter(|channel| *channel != ColorChannel::Red)
        .and_then(|channel| asset.variant_name(channel))
        .unwrap_or_else(|| asset.sanitized_name.clone());
    Some(join_asset_path(&[PROJECT_ROOT_ALIAS, &options.texture_dir, &file_name]))
}

/// Joins path components with `/`, whatever the host separator
pub fn join_asset_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches(|c: char| c == '/' || c == '\\'))
        .filter(|p| !p.is_empty())
        .map(|p| p.replace('\\', "/"))
        .collect::<Vec<_>>()
        .join("/")
}
