//! Source scene model for o3dexport
//!
//! An owned, in-memory picture of the authoring tool's scene:
//! - [`Scene`]: object hierarchy with local transforms and material slots
//! - [`ShaderGraph`]: per-material shader node graphs
//! - [`Image`]: image datablocks referenced by texture nodes
//!
//! Scenes are built programmatically or loaded from a JSON scene dump with
//! [`SceneLoader`].

pub mod graph;
pub mod image;
pub mod loader;
pub mod object;
pub mod scene;

mod dump;

pub use graph::{
    Link, Material, NodeId, NodeKind, ShaderGraph, ShaderNode, Socket, SocketType, SocketValue,
    PRINCIPAL_NODE_NAME,
};
pub use image::{Image, ImageKind, SUPPORTED_IMAGE_FILE_EXTENSIONS};
pub use loader::SceneLoader;
pub use object::{EulerOrder, MaterialSlot, ObjectKind, Rotation, SceneObject};
pub use scene::{ObjectId, Scene};
