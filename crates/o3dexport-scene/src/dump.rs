//! Serde structures of the JSON scene dump
//!
//! The dump mirrors the authoring tool's datablocks closely; [`crate::loader`]
//! turns it into the owned [`crate::Scene`] model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SceneDump {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub objects: Vec<ObjectDump>,
    #[serde(default)]
    pub materials: Vec<MaterialDump>,
    #[serde(default)]
    pub images: Vec<ImageDump>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ObjectDump {
    pub name: String,
    /// `MESH`, `EMPTY`, `LIGHT`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub location: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation: Option<RotationDump>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub material_slots: Vec<Option<String>>,
    #[serde(default)]
    pub selected: bool,
}

/// `mode` selects which of the other fields is read. Angles are radians;
/// `axis_angle` is `[angle, x, y, z]`, `quaternion` is `[w, x, y, z]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RotationDump {
    pub mode: String,
    #[serde(default)]
    pub euler: Option<[f32; 3]>,
    #[serde(default)]
    pub quaternion: Option<[f32; 4]>,
    #[serde(default)]
    pub axis_angle: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MaterialDump {
    pub name: String,
    #[serde(default = "default_true")]
    pub use_nodes: bool,
    #[serde(default)]
    pub nodes: Vec<NodeDump>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NodeDump {
    pub name: String,
    /// Node type identifier, e.g. `ShaderNodeTexImage`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Only meaningful on principled nodes
    #[serde(default)]
    pub distribution: Option<String>,
    #[serde(default)]
    pub inputs: Vec<SocketDump>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SocketDump {
    pub name: String,
    /// `VALUE`, `RGBA`, `VECTOR`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default: Option<DefaultValueDump>,
    #[serde(default)]
    pub link: Option<LinkDump>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum DefaultValueDump {
    Number(f32),
    Components(Vec<f32>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LinkDump {
    pub node: String,
    pub socket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ImageDump {
    pub name: String,
    #[serde(default = "default_image_type", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub file_format: String,
    #[serde(default = "default_true")]
    pub has_data: bool,
    #[serde(default = "default_users")]
    pub users: u32,
    #[serde(default)]
    pub filepath: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_users() -> u32 {
    1
}

fn default_image_type() -> String {
    "IMAGE".to_string()
}
