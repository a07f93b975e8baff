//! Shader graph translation
//!
//! Walks the principal shading node of a material and turns each recognized
//! input socket into a [`ChannelValue`]: a literal plus, when the socket is
//! driven by an image, the texture that feeds it.
//!
//! Supported shapes are at most two links deep:
//! - principal ← texture
//! - principal ← normal map ← texture
//! - principal ← channel split ← texture
//!
//! Anything else degrades to the socket's literal value and is logged.

use std::collections::{BTreeMap, BTreeSet};

use o3dexport_scene::{Material, NodeKind, ShaderGraph, ShaderNode, Socket, SocketType};
use serde::Serialize;

use crate::asset::ColorChannel;

/// Input of the normal-map and channel-split nodes that carries the texture
const COLOR_INPUT: &str = "Color";
/// Input of the normal-map node holding its strength
const STRENGTH_INPUT: &str = "Strength";
const DEFAULT_NORMAL_STRENGTH: f32 = 1.0;

/// Material channels the exporter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SemanticChannel {
    BaseColor,
    Metallic,
    Roughness,
    Alpha,
    SpecularLevel,
    SpecularTint,
    Normal,
    /// Read from the principal node's distribution, not from a socket
    MultiscatterCompensation,
}

impl SemanticChannel {
    /// Channels read from principal node sockets, in socket order
    pub const SOCKET_CHANNELS: [SemanticChannel; 7] = [
        SemanticChannel::BaseColor,
        SemanticChannel::Metallic,
        SemanticChannel::Roughness,
        SemanticChannel::Alpha,
        SemanticChannel::SpecularLevel,
        SemanticChannel::SpecularTint,
        SemanticChannel::Normal,
    ];

    /// Name of the principal node input feeding this channel
    pub fn socket_name(&self) -> Option<&'static str> {
        match self {
            SemanticChannel::BaseColor => Some("Base Color"),
            SemanticChannel::Metallic => Some("Metallic"),
            SemanticChannel::Roughness => Some("Roughness"),
            SemanticChannel::Alpha => Some("Alpha"),
            SemanticChannel::SpecularLevel => Some("Specular IOR Level"),
            SemanticChannel::SpecularTint => Some("Specular Tint"),
            SemanticChannel::Normal => Some("Normal"),
            SemanticChannel::MultiscatterCompensation => None,
        }
    }

    pub fn from_socket_name(name: &str) -> Option<Self> {
        Self::SOCKET_CHANNELS
            .into_iter()
            .find(|c| c.socket_name() == Some(name))
    }
}

/// Shape of a channel's literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Scalar,
    Color,
    Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Scalar(f32),
    Vec3([f32; 3]),
}

impl Literal {
    pub fn as_scalar(&self) -> f32 {
        match self {
            Literal::Scalar(v) => *v,
            Literal::Vec3(v) => v[0],
        }
    }

    pub fn as_vec3(&self) -> [f32; 3] {
        match self {
            Literal::Scalar(v) => [*v; 3],
            Literal::Vec3(v) => *v,
        }
    }
}

/// Image feeding a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureRef {
    /// Image datablock name
    pub name: String,
    /// Reached through a normal-map node
    pub is_normal_map: bool,
}

/// Value of one material channel. When `texture` is set, `literal` is
/// informational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelValue {
    pub kind: ValueKind,
    pub literal: Literal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_channel: Option<ColorChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

impl ChannelValue {
    pub fn scalar(value: f32) -> Self {
        Self {
            kind: ValueKind::Scalar,
            literal: Literal::Scalar(value),
            texture: None,
            sampled_channel: None,
            strength: None,
        }
    }

    pub fn is_textured(&self) -> bool {
        self.texture.is_some()
    }
}

/// A texture sampled by a material and the channels it is split into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureUse {
    pub name: String,
    pub is_normal_map: bool,
    /// Non-Red channels read through a channel split
    pub channels: BTreeSet<ColorChannel>,
}

/// Intermediate representation of one material
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Translation {
    pub channels: BTreeMap<SemanticChannel, ChannelValue>,
}

impl Translation {
    pub fn get(&self, channel: SemanticChannel) -> Option<&ChannelValue> {
        self.channels.get(&channel)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Distinct textures referenced by the material, in channel order
    pub fn texture_refs(&self) -> Vec<TextureUse> {
        let mut uses: Vec<TextureUse> = Vec::new();
        for value in self.channels.values() {
            let Some(texture) = &value.texture else { continue };
            let index = match uses.iter().position(|u| u.name == texture.name) {
                Some(index) => index,
                None => {
                    uses.push(TextureUse {
                        name: texture.name.clone(),
                        is_normal_map: false,
                        channels: BTreeSet::new(),
                    });
                    uses.len() - 1
                }
            };
            let entry = &mut uses[index];
            entry.is_normal_map |= texture.is_normal_map;
            if let Some(channel) = value.sampled_channel.filter(|c| *c != ColorChannel::Red) {
                entry.channels.insert(channel);
            }
        }
        uses
    }
}

/// Translates a material; materials without nodes translate to nothing
pub fn translate_material(material: &Material) -> Translation {
    if !material.use_nodes {
        tracing::warn!(material = %material.name, "material does not use nodes, exporting defaults");
        return Translation::default();
    }
    let translation = translate(&material.graph);
    if translation.is_empty() {
        tracing::warn!(material = %material.name, "material has no principal shading node");
    }
    translation
}

/// Translates the principal node of `graph`
pub fn translate(graph: &ShaderGraph) -> Translation {
    let mut translation = Translation::default();
    let Some(principal) = graph.principal() else {
        return translation;
    };

    if let NodeKind::Principled { multiscatter: true } = principal.kind {
        translation
            .channels
            .insert(SemanticChannel::MultiscatterCompensation, ChannelValue::scalar(1.0));
    }

    for socket in &principal.inputs {
        let Some(channel) = SemanticChannel::from_socket_name(&socket.name) else {
            tracing::debug!(socket = %socket.name, "ignoring principal input");
            continue;
        };
        if translation.channels.contains_key(&channel) {
            continue;
        }
        if let Some(value) = translate_socket(graph, socket) {
            translation.channels.insert(channel, value);
        }
    }
    translation
}

fn translate_socket(graph: &ShaderGraph, socket: &Socket) -> Option<ChannelValue> {
    let (kind, literal) = match &socket.socket_type {
        SocketType::Scalar => (ValueKind::Scalar, Literal::Scalar(socket.default_value.as_scalar())),
        SocketType::Color => (ValueKind::Color, Literal::Vec3(socket.default_value.as_vec3())),
        SocketType::Vector => (ValueKind::Vector, Literal::Vec3(socket.default_value.as_vec3())),
        SocketType::Other(type_name) => {
            tracing::warn!(socket = %socket.name, socket_type = %type_name, "unsupported socket type");
            return None;
        }
    };
    tracing::debug!(
        socket = %socket.name,
        socket_type = socket.socket_type.type_name(),
        default = ?socket.default_value,
        linked = socket.is_linked(),
        "principal input"
    );

    let mut value = ChannelValue { kind, literal, texture: None, sampled_channel: None, strength: None };
    let Some((node, output)) = graph.upstream(socket) else {
        return Some(value);
    };

    match &node.kind {
        NodeKind::TextureSample { .. } => {
            value.texture = bound_texture(node, false);
        }
        NodeKind::NormalMapCombine => {
            let strength = node
                .input(STRENGTH_INPUT)
                .map(|s| s.default_value.as_scalar())
                .unwrap_or(DEFAULT_NORMAL_STRENGTH);
            value.strength = Some(strength);
            value.texture = second_hop_texture(graph, node, true);
        }
        NodeKind::ChannelSplit => match ColorChannel::from_socket_name(output) {
            Some(channel) => {
                value.texture = second_hop_texture(graph, node, false);
                if value.texture.is_some() {
                    value.sampled_channel = Some(channel);
                }
            }
            None => {
                tracing::warn!(node = %node.name, output = %output, "unsupported channel split output");
            }
        },
        NodeKind::Principled { .. } | NodeKind::Other(_) => {
            tracing::warn!(
                socket = %socket.name,
                node = %node.name,
                node_type = node.kind.type_name(),
                "unsupported node type, using the literal value"
            );
        }
    }
    Some(value)
}

/// Texture of the node linked to the `Color` input of `node`
fn second_hop_texture(graph: &ShaderGraph, node: &ShaderNode, is_normal_map: bool) -> Option<TextureRef> {
    let Some(color) = node.input(COLOR_INPUT) else {
        tracing::warn!(node = %node.name, "node has no Color input");
        return None;
    };
    let Some((upstream, _)) = graph.upstream(color) else {
        tracing::warn!(node = %node.name, "expected the Color input to be linked to a texture node");
        return None;
    };
    match upstream.kind {
        NodeKind::TextureSample { .. } => bound_texture(upstream, is_normal_map),
        _ => {
            tracing::warn!(
                node = %node.name,
                upstream = %upstream.name,
                upstream_type = upstream.kind.type_name(),
                "node chain too deep or unsupported, using the literal value"
            );
            None
        }
    }
}

fn bound_texture(node: &ShaderNode, is_normal_map: bool) -> Option<TextureRef> {
    match &node.kind {
        NodeKind::TextureSample { image: Some(image) } => {
            Some(TextureRef { name: image.clone(), is_normal_map })
        }
        _ => {
            tracing::warn!(node = %node.name, "texture node has no image");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use o3dexport_scene::{NodeId, PRINCIPAL_NODE_NAME};

    fn texture_node(graph: &mut ShaderGraph, name: &str, image: Option<&str>) -> NodeId {
        graph.add_node(ShaderNode::new(
            name,
            NodeKind::TextureSample { image: image.map(str::to_string) },
        ))
    }

    fn principal(inputs: Vec<Socket>) -> ShaderNode {
        let mut node = ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: false });
        node.inputs = inputs;
        node
    }

    #[test]
    fn test_unlinked_literals() {
        let mut graph = ShaderGraph::new();
        graph.add_node(principal(vec![
            Socket::color("Base Color", [0.8, 0.8, 0.8, 1.0]),
            Socket::scalar("Metallic", 0.25),
            Socket::scalar("IOR", 1.45),
        ]));
        let translation = translate(&graph);
        assert_eq!(translation.channels.len(), 2);
        let base = translation.get(SemanticChannel::BaseColor).unwrap();
        assert_eq!(base.kind, ValueKind::Color);
        assert_eq!(base.literal, Literal::Vec3([0.8, 0.8, 0.8]));
        assert!(!base.is_textured());
        assert_eq!(translation.get(SemanticChannel::Metallic).unwrap().literal, Literal::Scalar(0.25));
    }

    #[test]
    fn test_direct_texture() {
        let mut graph = ShaderGraph::new();
        let tex = texture_node(&mut graph, "Image Texture", Some("wall.png"));
        graph.add_node(principal(vec![Socket::color("Base Color", [1.0; 4]).linked(tex, "Color")]));
        let base = translate(&graph).get(SemanticChannel::BaseColor).cloned().unwrap();
        assert_eq!(base.texture, Some(TextureRef { name: "wall.png".into(), is_normal_map: false }));
    }

    #[test]
    fn test_texture_without_image_falls_back() {
        let mut graph = ShaderGraph::new();
        let tex = texture_node(&mut graph, "Image Texture", None);
        graph.add_node(principal(vec![Socket::scalar("Roughness", 0.4).linked(tex, "Color")]));
        let roughness = translate(&graph).get(SemanticChannel::Roughness).cloned().unwrap();
        assert!(roughness.texture.is_none());
        assert_eq!(roughness.literal, Literal::Scalar(0.4));
    }

    #[test]
    fn test_normal_map_chain() {
        let mut graph = ShaderGraph::new();
        let tex = texture_node(&mut graph, "Normal Texture", Some("brick.png"));
        let normal_map = graph.add_node(
            ShaderNode::new("Normal Map", NodeKind::NormalMapCombine)
                .with_input(Socket::scalar("Strength", 0.7))
                .with_input(Socket::color("Color", [0.5, 0.5, 1.0, 1.0]).linked(tex, "Color")),
        );
        graph.add_node(principal(vec![Socket::vector("Normal", [0.0; 3]).linked(normal_map, "Normal")]));

        let normal = translate(&graph).get(SemanticChannel::Normal).cloned().unwrap();
        assert_eq!(normal.strength, Some(0.7));
        assert_eq!(normal.texture, Some(TextureRef { name: "brick.png".into(), is_normal_map: true }));
    }

    #[test]
    fn test_unlinked_normal_map_keeps_strength() {
        let mut graph = ShaderGraph::new();
        let normal_map = graph.add_node(
            ShaderNode::new("Normal Map", NodeKind::NormalMapCombine)
                .with_input(Socket::color("Color", [0.5, 0.5, 1.0, 1.0])),
        );
        graph.add_node(principal(vec![Socket::vector("Normal", [0.0; 3]).linked(normal_map, "Normal")]));

        let normal = translate(&graph).get(SemanticChannel::Normal).cloned().unwrap();
        assert_eq!(normal.strength, Some(DEFAULT_NORMAL_STRENGTH));
        assert!(normal.texture.is_none());
    }

    #[test]
    fn test_channel_split() {
        let mut graph = ShaderGraph::new();
        let tex = texture_node(&mut graph, "Mask", Some("mask.png"));
        let split = graph.add_node(
            ShaderNode::new("Separate Color", NodeKind::ChannelSplit)
                .with_input(Socket::color("Color", [0.0; 4]).linked(tex, "Color")),
        );
        graph.add_node(principal(vec![
            Socket::scalar("Metallic", 0.0).linked(split, "Blue"),
            Socket::scalar("Roughness", 0.5).linked(split, "Green"),
            Socket::scalar("Alpha", 1.0).linked(split, "Red"),
        ]));

        let translation = translate(&graph);
        assert_eq!(
            translation.get(SemanticChannel::Metallic).unwrap().sampled_channel,
            Some(ColorChannel::Blue)
        );
        let uses = translation.texture_refs();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].name, "mask.png");
        assert_eq!(
            uses[0].channels.iter().copied().collect::<Vec<_>>(),
            vec![ColorChannel::Green, ColorChannel::Blue]
        );
    }

    #[test]
    fn test_chain_too_deep() {
        let mut graph = ShaderGraph::new();
        let tex = texture_node(&mut graph, "Mask", Some("mask.png"));
        let inner = graph.add_node(
            ShaderNode::new("Split A", NodeKind::ChannelSplit)
                .with_input(Socket::color("Color", [0.0; 4]).linked(tex, "Color")),
        );
        let outer = graph.add_node(
            ShaderNode::new("Split B", NodeKind::ChannelSplit)
                .with_input(Socket::color("Color", [0.0; 4]).linked(inner, "Red")),
        );
        graph.add_node(principal(vec![Socket::scalar("Metallic", 0.3).linked(outer, "Green")]));

        let metallic = translate(&graph).get(SemanticChannel::Metallic).cloned().unwrap();
        assert!(metallic.texture.is_none());
        assert!(metallic.sampled_channel.is_none());
        assert_eq!(metallic.literal, Literal::Scalar(0.3));
    }

    #[test]
    fn test_unsupported_upstream_node() {
        let mut graph = ShaderGraph::new();
        let mix = graph.add_node(ShaderNode::new("Mix", NodeKind::Other("ShaderNodeMix".into())));
        graph.add_node(principal(vec![Socket::color("Base Color", [0.2, 0.3, 0.4, 1.0]).linked(mix, "Result")]));
        let base = translate(&graph).get(SemanticChannel::BaseColor).cloned().unwrap();
        assert!(base.texture.is_none());
        assert_eq!(base.literal, Literal::Vec3([0.2, 0.3, 0.4]));
    }

    #[test]
    fn test_unsupported_socket_type_is_omitted() {
        let mut graph = ShaderGraph::new();
        let mut node = principal(vec![]);
        node.inputs.push(Socket {
            name: "Alpha".into(),
            socket_type: SocketType::Other("SHADER".into()),
            default_value: o3dexport_scene::SocketValue::Scalar(1.0),
            link: None,
        });
        graph.add_node(node);
        assert!(translate(&graph).get(SemanticChannel::Alpha).is_none());
    }

    #[test]
    fn test_multiscatter() {
        let mut graph = ShaderGraph::new();
        graph.add_node(ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: true }));
        let translation = translate(&graph);
        assert_eq!(
            translation.get(SemanticChannel::MultiscatterCompensation),
            Some(&ChannelValue::scalar(1.0))
        );
    }

    #[test]
    fn test_material_without_nodes() {
        let mut graph = ShaderGraph::new();
        graph.add_node(principal(vec![Socket::scalar("Metallic", 1.0)]));
        let mut material = Material::new("Legacy", graph);
        material.use_nodes = false;
        assert!(translate_material(&material).is_empty());
    }
}
