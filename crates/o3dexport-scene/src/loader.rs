//! JSON scene dump loader
//!
//! The dump is produced by a small script inside the authoring tool. Objects
//! reference their parent by name and may appear in any order; shader links
//! reference nodes of the same material by name.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use o3dexport_core::{Error, Quat, Result, ResultExt, Vec3};

use crate::dump::{
    DefaultValueDump, ImageDump, MaterialDump, NodeDump, ObjectDump, RotationDump, SceneDump,
};
use crate::graph::{Link, Material, NodeId, NodeKind, ShaderGraph, ShaderNode, Socket, SocketType, SocketValue};
use crate::image::{Image, ImageKind};
use crate::object::{EulerOrder, ObjectKind, Rotation, SceneObject};
use crate::scene::{ObjectId, Scene};

/// Distribution name that turns on multiscatter compensation
const MULTISCATTER_DISTRIBUTION: &str = "MULTI_GGX";

/// Loads [`Scene`]s from JSON dumps
#[derive(Debug, Clone, Default)]
pub struct SceneLoader {
    /// Directory relative image paths are resolved against
    base_dir: Option<PathBuf>,
    /// Scene name used when the dump carries none
    fallback_name: Option<String>,
}

impl SceneLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = Some(name.into());
        self
    }

    /// Loads a dump file. Image paths resolve against the file's directory and
    /// the file stem names the scene if the dump does not.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Scene> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let mut loader = SceneLoader::new();
        if let Some(dir) = path.parent() {
            loader = loader.with_base_dir(dir);
        }
        if let Some(stem) = path.file_stem() {
            loader = loader.with_fallback_name(stem.to_string_lossy());
        }

        let file = File::open(path)?;
        loader
            .load_reader(BufReader::new(file))
            .with_context(|| format!("loading scene dump {}", path.display()))
    }

    pub fn load_str(&self, json: &str) -> Result<Scene> {
        let dump: SceneDump = serde_json::from_str(json)?;
        self.build(dump)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Scene> {
        let dump: SceneDump = serde_json::from_reader(reader)?;
        self.build(dump)
    }

    fn build(&self, dump: SceneDump) -> Result<Scene> {
        let name = dump
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.fallback_name.clone())
            .unwrap_or_else(|| "Scene".to_string());
        let mut scene = Scene::new(name);

        for image in dump.images {
            scene.add_image(self.convert_image(image));
        }

        let mut material_names = HashSet::new();
        for material in dump.materials {
            if !material_names.insert(material.name.clone()) {
                return Err(Error::invalid_scene(format!("duplicate material '{}'", material.name)));
            }
            scene.add_material(convert_material(material)?);
        }

        add_objects(&mut scene, &dump.objects, &material_names)?;

        tracing::debug!(
            scene = %scene.name,
            objects = scene.len(),
            materials = material_names.len(),
            "loaded scene dump"
        );
        Ok(scene)
    }

    fn convert_image(&self, image: ImageDump) -> Image {
        let source_path = image.filepath.map(|p| {
            let path = PathBuf::from(p);
            match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path,
            }
        });
        let kind = if image.kind == "IMAGE" { ImageKind::Image } else { ImageKind::Other(image.kind) };
        Image {
            name: image.name,
            kind,
            file_format: image.file_format,
            has_data: image.has_data,
            users: image.users,
            source_path,
        }
    }
}

/// Adds every object after its parent, keeping dump order otherwise
fn add_objects(scene: &mut Scene, objects: &[ObjectDump], materials: &HashSet<String>) -> Result<()> {
    let mut index_by_name = HashMap::new();
    for (index, object) in objects.iter().enumerate() {
        if index_by_name.insert(object.name.as_str(), index).is_some() {
            return Err(Error::invalid_scene(format!("duplicate object name '{}'", object.name)));
        }
    }

    let mut ids: Vec<Option<ObjectId>> = vec![None; objects.len()];
    let mut visiting = vec![false; objects.len()];
    for index in 0..objects.len() {
        add_object(scene, objects, &index_by_name, materials, index, &mut ids, &mut visiting)?;
    }
    Ok(())
}

fn add_object(
    scene: &mut Scene,
    objects: &[ObjectDump],
    index_by_name: &HashMap<&str, usize>,
    materials: &HashSet<String>,
    index: usize,
    ids: &mut Vec<Option<ObjectId>>,
    visiting: &mut Vec<bool>,
) -> Result<ObjectId> {
    if let Some(id) = ids[index] {
        return Ok(id);
    }
    let dump = &objects[index];
    if visiting[index] {
        return Err(Error::invalid_scene(format!("parenting cycle through '{}'", dump.name)));
    }
    visiting[index] = true;

    let parent = match &dump.parent {
        Some(parent_name) => {
            let parent_index = index_by_name.get(parent_name.as_str()).copied().ok_or_else(|| {
                Error::invalid_scene(format!(
                    "object '{}' has unknown parent '{}'",
                    dump.name, parent_name
                ))
            })?;
            Some(add_object(scene, objects, index_by_name, materials, parent_index, ids, visiting)?)
        }
        None => None,
    };

    let object = convert_object(dump, materials)?;
    let id = scene.add_object(object, parent)?;
    ids[index] = Some(id);
    Ok(id)
}

fn convert_object(dump: &ObjectDump, materials: &HashSet<String>) -> Result<SceneObject> {
    let kind = match dump.kind.as_str() {
        "MESH" => {
            let mesh = dump.mesh.clone().ok_or_else(|| {
                Error::invalid_scene(format!("mesh object '{}' has no mesh data", dump.name))
            })?;
            ObjectKind::Mesh { mesh }
        }
        "EMPTY" => ObjectKind::Empty,
        other => ObjectKind::Other(other.to_string()),
    };

    for material in dump.material_slots.iter().flatten() {
        if !materials.contains(material) {
            return Err(Error::invalid_scene(format!(
                "object '{}' uses unknown material '{}'",
                dump.name, material
            )));
        }
    }

    let rotation = match &dump.rotation {
        Some(rotation) => convert_rotation(rotation, &dump.name)?,
        None => Rotation::default(),
    };

    let object = SceneObject::new(dump.name.clone(), kind)
        .with_location(dump.location.map(Vec3::from).unwrap_or(Vec3::ZERO))
        .with_rotation(rotation)
        .with_scale(dump.scale.map(Vec3::from).unwrap_or(Vec3::ONE))
        .with_materials(dump.material_slots.iter().cloned())
        .selected(dump.selected);
    Ok(object)
}

fn convert_rotation(dump: &RotationDump, object: &str) -> Result<Rotation> {
    let missing = |field: &str| {
        Error::invalid_scene(format!(
            "object '{}' uses rotation mode {} but has no '{}' values",
            object, dump.mode, field
        ))
    };

    match dump.mode.as_str() {
        "QUATERNION" => {
            let q = dump.quaternion.ok_or_else(|| missing("quaternion"))?;
            Ok(Rotation::Quaternion(Quat::from(q)))
        }
        "AXIS_ANGLE" => {
            let [angle, x, y, z] = dump.axis_angle.ok_or_else(|| missing("axis_angle"))?;
            Ok(Rotation::AxisAngle { axis: Vec3::new(x, y, z), angle })
        }
        mode => {
            let order = EulerOrder::from_mode_name(mode).ok_or_else(|| Error::UnsupportedRotationMode {
                object: object.to_string(),
                mode: mode.to_string(),
            })?;
            let angles = dump.euler.ok_or_else(|| missing("euler"))?;
            Ok(Rotation::Euler { order, angles: Vec3::from(angles) })
        }
    }
}

fn convert_material(dump: MaterialDump) -> Result<Material> {
    let mut node_ids = HashMap::new();
    for (index, node) in dump.nodes.iter().enumerate() {
        if node_ids.insert(node.name.clone(), NodeId(index)).is_some() {
            return Err(Error::invalid_scene(format!(
                "material '{}' has two nodes named '{}'",
                dump.name, node.name
            )));
        }
    }

    let mut graph = ShaderGraph::new();
    for node in &dump.nodes {
        graph.add_node(convert_node(node, &node_ids, &dump.name)?);
    }

    Ok(Material { name: dump.name, use_nodes: dump.use_nodes, graph })
}

fn convert_node(node: &NodeDump, node_ids: &HashMap<String, NodeId>, material: &str) -> Result<ShaderNode> {
    let kind = match node.kind.as_str() {
        "ShaderNodeBsdfPrincipled" => NodeKind::Principled {
            multiscatter: node.distribution.as_deref() == Some(MULTISCATTER_DISTRIBUTION),
        },
        "ShaderNodeTexImage" => NodeKind::TextureSample { image: node.image.clone() },
        "ShaderNodeNormalMap" => NodeKind::NormalMapCombine,
        "ShaderNodeSeparateColor" | "ShaderNodeSeparateRGB" => NodeKind::ChannelSplit,
        other => NodeKind::Other(other.to_string()),
    };

    let mut inputs = Vec::with_capacity(node.inputs.len());
    for input in &node.inputs {
        let socket_type = SocketType::from_type_name(&input.kind);
        let default_value = match &input.default {
            Some(DefaultValueDump::Number(v)) => SocketValue::Scalar(*v),
            Some(DefaultValueDump::Components(c)) => SocketValue::Components(c.clone()),
            None => SocketValue::Scalar(0.0),
        };
        let link = match &input.link {
            Some(link) => {
                let from_node = node_ids.get(&link.node).copied().ok_or_else(|| {
                    Error::invalid_scene(format!(
                        "material '{}': socket '{}' of '{}' links to unknown node '{}'",
                        material, input.name, node.name, link.node
                    ))
                })?;
                Some(Link { from_node, from_socket: link.socket.clone() })
            }
            None => None,
        };
        inputs.push(Socket { name: input.name.clone(), socket_type, default_value, link });
    }

    Ok(ShaderNode { name: node.name.clone(), kind, inputs })
}
