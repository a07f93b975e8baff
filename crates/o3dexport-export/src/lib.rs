//! o3dexport Export Pipeline
//!
//! Turns a source [`Scene`](o3dexport_scene::Scene) into an O3DE asset bundle:
//! - texture naming and channel variants
//! - shader graph translation and StandardPBR material documents
//! - asset discovery over the object hierarchy
//! - the pull-based export run writing textures, materials, meshes and the
//!   scene-graph document

pub mod asset;
pub mod discover;
pub mod json;
pub mod log;
pub mod material;
pub mod mesh;
pub mod naming;
pub mod orchestrator;
pub mod settings;
pub mod textures;
pub mod translate;

pub use asset::{ColorChannel, MeshAsset, TextureAsset, TextureTable};
pub use discover::{discover, export_roots, SceneGraph};
pub use json::{DocumentWriter, JsonError};
pub use material::{emit, EmitOptions, O3Material};
pub use mesh::{CommandMeshExporter, CopyMeshExporter, MeshExporter, TransformReset};
pub use naming::{MeshNameRegistry, TextureNameRegistry};
pub use orchestrator::{plan_export, ExportRun, ExportSummary, ProgressEvent, UnitOutcome};
pub use settings::{AssetCategory, ExportSettings, OverwritePolicy};
pub use textures::{FsImageIo, ImageIo, TextureError};
pub use translate::{translate, translate_material, ChannelValue, SemanticChannel, Translation};
