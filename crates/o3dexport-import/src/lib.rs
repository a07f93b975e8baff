//! o3dexport Import
//!
//! Reads the scene graph an export left in a project and rebuilds it in a
//! level: entities named after the nodes, their local transforms, and Mesh
//! and Material components pointing at the built assets.

pub mod editor;
pub mod error;
pub mod importer;
pub mod paths;

pub use editor::{ComponentKind, EntityEditor, EntityId, EntityRecord, InMemoryEditor, LocalTransform};
pub use error::{ImportError, ImportResult};
pub use importer::{load_scene_graph, local_transform, ImportReport, SceneImporter};
pub use paths::AssetPaths;
