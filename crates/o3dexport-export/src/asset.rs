//! Asset records collected by discovery

use std::collections::{BTreeMap, BTreeSet, HashMap};

use o3dexport_scene::ObjectId;
use serde::{Deserialize, Serialize};

use crate::naming::{channel_variant_name, TextureNameRegistry};

/// Output socket of a channel-split node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; 4] =
        [ColorChannel::Red, ColorChannel::Green, ColorChannel::Blue, ColorChannel::Alpha];

    /// Socket name, also used in channel-variant file names
    pub fn name(&self) -> &'static str {
        match self {
            ColorChannel::Red => "Red",
            ColorChannel::Green => "Green",
            ColorChannel::Blue => "Blue",
            ColorChannel::Alpha => "Alpha",
        }
    }

    pub fn from_socket_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Component index in an RGBA pixel
    pub fn index(&self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
            ColorChannel::Alpha => 3,
        }
    }
}

impl std::fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A texture to export, shared by every material that samples it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureAsset {
    /// Image datablock name
    pub original_name: String,
    /// Output file name, unique within the run
    pub sanitized_name: String,
    /// Channels that get their own single-channel file. Never contains Red,
    /// which materials read straight from the original image.
    pub sampled_channels: BTreeSet<ColorChannel>,
    /// Registered file names of the channel variants
    #[serde(default)]
    pub variant_files: BTreeMap<ColorChannel, String>,
    pub is_normal_map: bool,
}

impl TextureAsset {
    pub fn new(original_name: impl Into<String>, sanitized_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            sanitized_name: sanitized_name.into(),
            sampled_channels: BTreeSet::new(),
            variant_files: BTreeMap::new(),
            is_normal_map: false,
        }
    }

    /// Unions `channels` into the sampled set, ignoring Red
    pub fn add_channels(&mut self, channels: impl IntoIterator<Item = ColorChannel>) {
        self.sampled_channels
            .extend(channels.into_iter().filter(|c| *c != ColorChannel::Red));
    }

    /// Merges a later discovery of the same image
    pub fn merge(&mut self, channels: impl IntoIterator<Item = ColorChannel>, is_normal_map: bool) {
        self.add_channels(channels);
        self.is_normal_map |= is_normal_map;
    }

    /// Original image plus one file per sampled channel
    pub fn export_count(&self) -> usize {
        1 + self.sampled_channels.len()
    }

    /// Registers a file name for every sampled channel that has none yet
    pub fn reserve_variant_names(&mut self, registry: &mut TextureNameRegistry) {
        for channel in &self.sampled_channels {
            if !self.variant_files.contains_key(channel) {
                let name = registry.reserve(channel_variant_name(&self.sanitized_name, *channel));
                self.variant_files.insert(*channel, name);
            }
        }
    }

    /// File name of the single-channel variant for `channel`, if sampled.
    /// Unregistered variants fall back to `<stem>_<Channel><ext>`.
    pub fn variant_name(&self, channel: ColorChannel) -> Option<String> {
        if !self.sampled_channels.contains(&channel) {
            return None;
        }
        Some(
            self.variant_files
                .get(&channel)
                .cloned()
                .unwrap_or_else(|| channel_variant_name(&self.sanitized_name, channel)),
        )
    }

    /// File names of the single-channel variants, in channel order
    pub fn variant_names(&self) -> Vec<(ColorChannel, String)> {
        self.sampled_channels
            .iter()
            .filter_map(|c| self.variant_name(*c).map(|name| (*c, name)))
            .collect()
    }
}

/// Texture assets keyed by image name, in discovery order
#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    assets: Vec<TextureAsset>,
    index: HashMap<String, usize>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original_name: &str) -> Option<&TextureAsset> {
        self.index.get(original_name).map(|i| &self.assets[*i])
    }

    pub fn get_mut(&mut self, original_name: &str) -> Option<&mut TextureAsset> {
        self.index.get(original_name).map(|i| &mut self.assets[*i])
    }

    pub fn contains(&self, original_name: &str) -> bool {
        self.index.contains_key(original_name)
    }

    /// Adds `asset` unless an asset for the same image exists already
    pub fn insert(&mut self, asset: TextureAsset) -> bool {
        if self.index.contains_key(&asset.original_name) {
            return false;
        }
        self.index.insert(asset.original_name.clone(), self.assets.len());
        self.assets.push(asset);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextureAsset> {
        self.assets.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TextureAsset> {
        self.assets.iter_mut()
    }

    /// Assets in discovery order
    pub fn as_slice(&self) -> &[TextureAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Files the texture phase writes: each original plus its channel variants
    pub fn export_count(&self) -> usize {
        self.assets.iter().map(TextureAsset::export_count).sum()
    }
}

impl<'a> IntoIterator for &'a TextureTable {
    type Item = &'a TextureAsset;
    type IntoIter = std::slice::Iter<'a, TextureAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A mesh to export; `owner` is the first object found using it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshAsset {
    /// Mesh data name
    pub original_name: String,
    pub sanitized_name: String,
    pub owner: ObjectId,
}
