//! Shader node graphs
//!
//! A material's appearance is described by a small directed graph of nodes.
//! Node kinds the exporter understands are closed variants of [`NodeKind`];
//! everything else is kept as [`NodeKind::Other`] with its type name so it can
//! be reported.

/// Name the authoring tool gives the principal shading node
pub const PRINCIPAL_NODE_NAME: &str = "Principled BSDF";

/// Index of a node inside its [`ShaderGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Principal shading node aggregating the PBR inputs.
    /// `multiscatter` is set when the node uses the multiscatter GGX distribution.
    Principled { multiscatter: bool },
    /// Samples an image; `image` is the bound image datablock, if any
    TextureSample { image: Option<String> },
    /// Converts a tangent-space normal texture into a normal
    NormalMapCombine,
    /// Splits a color into Red/Green/Blue/Alpha outputs
    ChannelSplit,
    /// Any other node, with its type name
    Other(String),
}

impl NodeKind {
    /// Type identifier as used in scene dumps
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Principled { .. } => "ShaderNodeBsdfPrincipled",
            NodeKind::TextureSample { .. } => "ShaderNodeTexImage",
            NodeKind::NormalMapCombine => "ShaderNodeNormalMap",
            NodeKind::ChannelSplit => "ShaderNodeSeparateColor",
            NodeKind::Other(name) => name,
        }
    }
}

/// Declared type of a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketType {
    Scalar,
    Color,
    Vector,
    /// Shader, string, integer... sockets the exporter cannot read
    Other(String),
}

impl SocketType {
    /// Parses the authoring tool's socket type names (`VALUE`, `RGBA`, `VECTOR`)
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "VALUE" => SocketType::Scalar,
            "RGBA" => SocketType::Color,
            "VECTOR" => SocketType::Vector,
            other => SocketType::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            SocketType::Scalar => "VALUE",
            SocketType::Color => "RGBA",
            SocketType::Vector => "VECTOR",
            SocketType::Other(name) => name,
        }
    }
}

/// Unlinked value of a socket
#[derive(Debug, Clone, PartialEq)]
pub enum SocketValue {
    Scalar(f32),
    /// Colors carry 4 components (RGBA), vectors 3
    Components(Vec<f32>),
}

impl SocketValue {
    /// First component, or the scalar itself
    pub fn as_scalar(&self) -> f32 {
        match self {
            SocketValue::Scalar(v) => *v,
            SocketValue::Components(c) => c.first().copied().unwrap_or(0.0),
        }
    }

    /// First three components; a scalar is splatted
    pub fn as_vec3(&self) -> [f32; 3] {
        match self {
            SocketValue::Scalar(v) => [*v; 3],
            SocketValue::Components(c) => {
                let mut out = [0.0; 3];
                for (dst, src) in out.iter_mut().zip(c.iter()) {
                    *dst = *src;
                }
                out
            }
        }
    }
}

/// Link from another node's output socket
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub from_node: NodeId,
    pub from_socket: String,
}

/// Input socket of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    pub name: String,
    pub socket_type: SocketType,
    pub default_value: SocketValue,
    pub link: Option<Link>,
}

impl Socket {
    pub fn scalar(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            socket_type: SocketType::Scalar,
            default_value: SocketValue::Scalar(value),
            link: None,
        }
    }

    pub fn color(name: impl Into<String>, rgba: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            socket_type: SocketType::Color,
            default_value: SocketValue::Components(rgba.to_vec()),
            link: None,
        }
    }

    pub fn vector(name: impl Into<String>, xyz: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            socket_type: SocketType::Vector,
            default_value: SocketValue::Components(xyz.to_vec()),
            link: None,
        }
    }

    /// Links this socket to output `socket` of `node`
    pub fn linked(mut self, node: NodeId, socket: impl Into<String>) -> Self {
        self.link = Some(Link { from_node: node, from_socket: socket.into() });
        self
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }
}

/// Node of a shader graph
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub name: String,
    pub kind: NodeKind,
    pub inputs: Vec<Socket>,
}

impl ShaderNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self { name: name.into(), kind, inputs: Vec::new() }
    }

    pub fn with_input(mut self, socket: Socket) -> Self {
        self.inputs.push(socket);
        self
    }

    /// First input socket called `name`
    pub fn input(&self, name: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.name == name)
    }
}

/// Node graph of one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderGraph {
    nodes: Vec<ShaderNode>,
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id, to be used by later links
    pub fn add_node(&mut self, node: ShaderNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&ShaderNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[ShaderNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// The principal shading node: the node named [`PRINCIPAL_NODE_NAME`], or
    /// failing that the first principled node.
    pub fn principal(&self) -> Option<&ShaderNode> {
        self.find(PRINCIPAL_NODE_NAME)
            .and_then(|id| self.node(id))
            .filter(|n| matches!(n.kind, NodeKind::Principled { .. }))
            .or_else(|| {
                self.nodes
                    .iter()
                    .find(|n| matches!(n.kind, NodeKind::Principled { .. }))
            })
    }

    /// Node and output socket feeding `socket`, if it is linked
    pub fn upstream<'a>(&'a self, socket: &'a Socket) -> Option<(&'a ShaderNode, &'a str)> {
        let link = socket.link.as_ref()?;
        self.node(link.from_node).map(|node| (node, link.from_socket.as_str()))
    }
}

/// A material datablock
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub use_nodes: bool,
    pub graph: ShaderGraph,
}

impl Material {
    pub fn new(name: impl Into<String>, graph: ShaderGraph) -> Self {
        Self { name: name.into(), use_nodes: true, graph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_follows_link() {
        let mut graph = ShaderGraph::new();
        let tex = graph.add_node(ShaderNode::new(
            "Image Texture",
            NodeKind::TextureSample { image: Some("wall.png".into()) },
        ));
        let socket = Socket::color("Base Color", [0.8, 0.8, 0.8, 1.0]).linked(tex, "Color");
        let (node, output) = graph.upstream(&socket).unwrap();
        assert_eq!(node.name, "Image Texture");
        assert_eq!(output, "Color");
    }

    #[test]
    fn test_principal_prefers_named_node() {
        let mut graph = ShaderGraph::new();
        graph.add_node(ShaderNode::new("Other BSDF", NodeKind::Principled { multiscatter: false }));
        graph.add_node(ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: true }));
        assert_eq!(graph.principal().unwrap().name, PRINCIPAL_NODE_NAME);
    }

    #[test]
    fn test_principal_falls_back_to_kind() {
        let mut graph = ShaderGraph::new();
        graph.add_node(ShaderNode::new("Mix", NodeKind::Other("ShaderNodeMix".into())));
        graph.add_node(ShaderNode::new("BSDF.001", NodeKind::Principled { multiscatter: false }));
        assert_eq!(graph.principal().unwrap().name, "BSDF.001");
    }

    #[test]
    fn test_socket_value_vec3() {
        assert_eq!(SocketValue::Components(vec![0.1, 0.2, 0.3, 1.0]).as_vec3(), [0.1, 0.2, 0.3]);
        assert_eq!(SocketValue::Components(vec![0.5]).as_vec3(), [0.5, 0.0, 0.0]);
        assert_eq!(SocketValue::Scalar(0.4).as_vec3(), [0.4; 3]);
    }
}
