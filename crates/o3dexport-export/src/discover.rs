//! Asset graph discovery
//!
//! Walks the object hierarchy depth-first and collects everything an export
//! writes: unique meshes, unique materials, the textures those materials
//! sample and, for whole-scene exports, the scene tree.

use std::collections::HashMap;

use o3dexport_core::document::{SceneGraphDocument, SceneNodeDoc, TransformDoc};
use o3dexport_core::{Error, Result, ResultExt};
use o3dexport_scene::{ObjectId, Scene};

use crate::asset::{MeshAsset, TextureAsset, TextureTable};
use crate::material::O3Material;
use crate::naming::{MeshNameRegistry, TextureNameRegistry};
use crate::translate::{translate_material, TextureUse};

/// Everything one export run writes
#[derive(Debug, Clone)]
pub struct SceneGraph {
    meshes: Vec<MeshAsset>,
    mesh_index: HashMap<String, usize>,
    materials: Vec<O3Material>,
    material_index: HashMap<String, usize>,
    textures: TextureTable,
    materials_by_object: HashMap<ObjectId, Vec<String>>,
    tree: Option<SceneGraphDocument>,
    recursive: bool,
}

impl SceneGraph {
    fn new(recursive: bool) -> Self {
        Self {
            meshes: Vec::new(),
            mesh_index: HashMap::new(),
            materials: Vec::new(),
            material_index: HashMap::new(),
            textures: TextureTable::new(),
            materials_by_object: HashMap::new(),
            tree: None,
            recursive,
        }
    }

    /// Unique meshes in discovery order
    pub fn meshes(&self) -> &[MeshAsset] {
        &self.meshes
    }

    pub fn mesh(&self, mesh_name: &str) -> Option<&MeshAsset> {
        self.mesh_index.get(mesh_name).map(|i| &self.meshes[*i])
    }

    /// Unique materials in discovery order
    pub fn materials(&self) -> &[O3Material] {
        &self.materials
    }

    pub fn material(&self, name: &str) -> Option<&O3Material> {
        self.material_index.get(name).map(|i| &self.materials[*i])
    }

    pub fn textures(&self) -> &TextureTable {
        &self.textures
    }

    /// Material names of a mesh object, in slot order, empty slots skipped
    pub fn materials_of(&self, object: ObjectId) -> &[String] {
        self.materials_by_object.get(&object).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scene tree; only whole-scene exports have one
    pub fn tree(&self) -> Option<&SceneGraphDocument> {
        self.tree.as_ref()
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Texture files to write: every texture plus its channel variants
    pub fn texture_export_count(&self) -> usize {
        self.textures.export_count()
    }

    /// Number of progress events a run over this graph emits
    pub fn expected_events(&self) -> usize {
        self.texture_export_count()
            + self.materials.len()
            + self.meshes.len()
            + usize::from(self.recursive)
    }

    /// Nothing would be written
    pub fn is_empty(&self) -> bool {
        self.expected_events() == 0
    }
}

/// Objects a run starts from: the roots for a whole-scene export, the
/// selection otherwise. The flag tells whether to recurse.
pub fn export_roots(scene: &Scene, selected_only: bool) -> (Vec<ObjectId>, bool) {
    if selected_only {
        (scene.selected(), false)
    } else {
        (scene.roots(), true)
    }
}

/// Discovers the assets reachable from `roots`.
///
/// Non-recursive discovery only looks at `roots` themselves and builds no
/// scene tree. Unsupported or missing images fail the discovery unless
/// `allow_invalid_textures` is set, in which case they are dropped.
///
/// Texture names are settled once every material has been seen: an image
/// sampled as a normal map by any material gets the `_normal` name, and
/// channel-variant files are registered after all original names.
pub fn discover(
    scene: &Scene,
    roots: &[ObjectId],
    recursive: bool,
    registry: &mut TextureNameRegistry,
    allow_invalid_textures: bool,
) -> Result<SceneGraph> {
    let mut discovery = Discovery {
        scene,
        registry,
        allow_invalid_textures,
        mesh_names: MeshNameRegistry::new(),
        texture_uses: Vec::new(),
        graph: SceneGraph::new(recursive),
    };

    for root in roots {
        discovery.visit(*root)?;
    }
    discovery.settle_textures()?;

    if recursive {
        let children = roots
            .iter()
            .map(|root| discovery.scene_node(*root))
            .collect::<Result<Vec<_>>>()?;
        discovery.graph.tree = Some(SceneGraphDocument { name: scene.name.clone(), children });
    }

    let graph = discovery.graph;
    tracing::info!(
        scene = %scene.name,
        meshes = graph.meshes.len(),
        materials = graph.materials.len(),
        textures = graph.textures.len(),
        recursive,
        "discovered assets"
    );
    Ok(graph)
}

struct Discovery<'a> {
    scene: &'a Scene,
    registry: &'a mut TextureNameRegistry,
    allow_invalid_textures: bool,
    mesh_names: MeshNameRegistry,
    /// Textures seen so far, merged per image, in first-use order
    texture_uses: Vec<TextureUse>,
    graph: SceneGraph,
}

impl Discovery<'_> {
    fn visit(&mut self, id: ObjectId) -> Result<()> {
        let scene = self.scene;
        let object = scene
            .object(id)
            .ok_or_else(|| Error::internal(format!("object id {} out of range", id.0)))?;

        if let Some(mesh_name) = object.kind.mesh_name() {
            if !self.graph.mesh_index.contains_key(mesh_name) {
                self.graph.mesh_index.insert(mesh_name.to_string(), self.graph.meshes.len());
                self.graph.meshes.push(MeshAsset {
                    original_name: mesh_name.to_string(),
                    sanitized_name: self.mesh_names.sanitize(mesh_name),
                    owner: id,
                });
            }

            let mut names: Vec<String> = Vec::new();
            for slot in &object.material_slots {
                let Some(material_name) = &slot.material else { continue };
                if names.contains(material_name) {
                    tracing::warn!(
                        object = %object.name,
                        slot = slot.index,
                        material = %material_name,
                        "material appears in more than one slot"
                    );
                }
                self.add_material(slot.index, material_name)
                    .with_context(|| format!("object '{}'", object.name))?;
                names.push(material_name.clone());
            }
            self.graph.materials_by_object.insert(id, names);
        }

        if self.graph.recursive {
            for child in scene.children(id) {
                self.visit(*child)?;
            }
        }
        Ok(())
    }

    fn add_material(&mut self, slot_index: usize, name: &str) -> Result<()> {
        if self.graph.material_index.contains_key(name) {
            return Ok(());
        }
        let scene = self.scene;
        let material = scene
            .material(name)
            .ok_or_else(|| Error::invalid_scene(format!("unknown material '{}'", name)))?;

        let translation = translate_material(material);
        for texture in translation.texture_refs() {
            self.note_texture(texture);
        }

        self.graph.material_index.insert(name.to_string(), self.graph.materials.len());
        self.graph.materials.push(O3Material { slot_index, name: name.to_string(), translation });
        Ok(())
    }

    fn note_texture(&mut self, texture: TextureUse) {
        match self.texture_uses.iter().position(|u| u.name == texture.name) {
            Some(index) => {
                let seen = &mut self.texture_uses[index];
                seen.is_normal_map |= texture.is_normal_map;
                seen.channels.extend(texture.channels);
            }
            None => self.texture_uses.push(texture),
        }
    }

    fn settle_textures(&mut self) -> Result<()> {
        for texture in std::mem::take(&mut self.texture_uses) {
            match self.sanitize(&texture) {
                Ok(sanitized) => {
                    let mut asset = TextureAsset::new(texture.name, sanitized);
                    asset.merge(texture.channels, texture.is_normal_map);
                    self.graph.textures.insert(asset);
                }
                Err(err) if self.allow_invalid_textures && err.is_invalid_texture() => {
                    tracing::warn!(texture = %texture.name, error = %err, "dropping invalid texture");
                }
                Err(err) => return Err(err.with_context(format!("texture '{}'", texture.name))),
            }
        }
        for asset in self.graph.textures.iter_mut() {
            asset.reserve_variant_names(self.registry);
        }
        Ok(())
    }

    fn sanitize(&mut self, texture: &TextureUse) -> Result<String> {
        let image = self
            .scene
            .image(&texture.name)
            .ok_or_else(|| Error::ImageNotFound { name: texture.name.clone() })?;
        if texture.is_normal_map {
            self.registry.sanitize_normal_map(&texture.name, Some(image))
        } else {
            self.registry.sanitize(&texture.name, Some(image))
        }
    }

    fn scene_node(&self, id: ObjectId) -> Result<SceneNodeDoc> {
        let object = &self.scene[id];
        let rotate = object.rotation.to_euler_xyz_degrees(&object.name)?;

        let mesh = object
            .kind
            .mesh_name()
            .and_then(|name| self.graph.mesh(name))
            .map(|mesh| mesh.sanitized_name.clone());
        let materials = self.graph.materials_by_object.get(&id).cloned();

        let children = self
            .scene
            .children(id)
            .iter()
            .map(|child| self.scene_node(*child))
            .collect::<Result<Vec<_>>>()?;

        Ok(SceneNodeDoc {
            name: object.name.clone(),
            transform: TransformDoc {
                translate: object.location.to_array(),
                rotate: rotate.to_array(),
                scale: object.scale.to_array(),
            },
            mesh,
            materials,
            children: if children.is_empty() { None } else { Some(children) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ColorChannel;
    use o3dexport_scene::{Image, Material, NodeKind, SceneObject, ShaderGraph, ShaderNode, Socket, PRINCIPAL_NODE_NAME};

    fn textured_material(name: &str, image: &str) -> Material {
        let mut graph = ShaderGraph::new();
        let tex = graph.add_node(ShaderNode::new(
            "Image Texture",
            NodeKind::TextureSample { image: Some(image.to_string()) },
        ));
        graph.add_node(
            ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: false })
                .with_input(Socket::color("Base Color", [1.0; 4]).linked(tex, "Color")),
        );
        Material::new(name, graph)
    }

    fn split_material(name: &str, image: &str, output: &str) -> Material {
        let mut graph = ShaderGraph::new();
        let tex = graph.add_node(ShaderNode::new(
            "Image Texture",
            NodeKind::TextureSample { image: Some(image.to_string()) },
        ));
        let split = graph.add_node(
            ShaderNode::new("Separate Color", NodeKind::ChannelSplit)
                .with_input(Socket::color("Color", [0.0; 4]).linked(tex, "Color")),
        );
        graph.add_node(
            ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: false })
                .with_input(Socket::scalar("Roughness", 0.5).linked(split, output)),
        );
        Material::new(name, graph)
    }

    fn normal_material(name: &str, image: &str) -> Material {
        let mut graph = ShaderGraph::new();
        let tex = graph.add_node(ShaderNode::new(
            "Normal Texture",
            NodeKind::TextureSample { image: Some(image.to_string()) },
        ));
        let normal_map = graph.add_node(
            ShaderNode::new("Normal Map", NodeKind::NormalMapCombine)
                .with_input(Socket::color("Color", [0.5, 0.5, 1.0, 1.0]).linked(tex, "Color")),
        );
        graph.add_node(
            ShaderNode::new(PRINCIPAL_NODE_NAME, NodeKind::Principled { multiscatter: false })
                .with_input(Socket::vector("Normal", [0.0; 3]).linked(normal_map, "Normal")),
        );
        Material::new(name, graph)
    }

    fn discover_all(scene: &Scene) -> SceneGraph {
        let (roots, recursive) = export_roots(scene, false);
        discover(scene, &roots, recursive, &mut TextureNameRegistry::new(), false).unwrap()
    }

    #[test]
    fn test_channel_variant_does_not_reuse_image_file_name() {
        let mut scene = Scene::new("Village");
        scene.add_material(split_material("Rough", "mask.png", "Green"));
        scene.add_material(textured_material("Sticker", "mask_Green.png"));
        scene.add_image(Image::new("mask.png", "PNG"));
        scene.add_image(Image::new("mask_Green.png", "PNG"));
        scene
            .add_object(SceneObject::mesh("Crate", "Crate").with_materials([Some("Rough"), Some("Sticker")]), None)
            .unwrap();

        let graph = discover_all(&scene);
        let mask = graph.textures().get("mask.png").unwrap();
        let sticker = graph.textures().get("mask_Green.png").unwrap();
        assert_eq!(mask.sanitized_name, "mask.png");
        assert_eq!(sticker.sanitized_name, "mask_Green.png");
        assert_eq!(
            mask.variant_names(),
            vec![(ColorChannel::Green, "mask.001_Green.png".to_string())]
        );

        let mut files: Vec<String> = graph
            .textures()
            .iter()
            .flat_map(|t| std::iter::once(t.sanitized_name.clone()).chain(t.variant_names().into_iter().map(|(_, n)| n)))
            .collect();
        let count = files.len();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), count);
        assert_eq!(count, graph.texture_export_count());
    }

    #[test]
    fn test_normal_map_name_ignores_material_order() {
        let mut scene = Scene::new("Village");
        scene.add_material(textured_material("Plain", "brick.png"));
        scene.add_material(normal_material("Bumpy", "brick.png"));
        scene.add_image(Image::new("brick.png", "PNG"));
        scene
            .add_object(SceneObject::mesh("WallA", "WallA").with_materials([Some("Plain")]), None)
            .unwrap();
        scene
            .add_object(SceneObject::mesh("WallB", "WallB").with_materials([Some("Bumpy")]), None)
            .unwrap();

        let graph = discover_all(&scene);
        let brick = graph.textures().get("brick.png").unwrap();
        assert!(brick.is_normal_map);
        assert_eq!(brick.sanitized_name, "brick_normal.png");
    }

    #[test]
    fn test_mesh_names_that_sanitize_alike_stay_distinct() {
        let mut scene = Scene::new("Village");
        scene.add_object(SceneObject::mesh("A", "Cube.001"), None).unwrap();
        scene.add_object(SceneObject::mesh("B", "Cube_001"), None).unwrap();

        let graph = discover_all(&scene);
        let names: Vec<&str> = graph.meshes().iter().map(|m| m.sanitized_name.as_str()).collect();
        assert_eq!(names, ["Cube_001", "Cube_001_001"]);
        let tree = graph.tree().unwrap();
        assert_eq!(tree.children[1].mesh.as_deref(), Some("Cube_001_001"));
    }

    #[test]
    fn test_shared_mesh_and_material() {
        let mut scene = Scene::new("Village");
        scene.add_material(textured_material("Brick", "brick.png"));
        scene.add_image(Image::new("brick.png", "PNG"));
        let a = scene
            .add_object(SceneObject::mesh("WallA", "Wall").with_materials([Some("Brick")]), None)
            .unwrap();
        scene
            .add_object(SceneObject::mesh("WallB", "Wall").with_materials([Some("Brick"), None]), None)
            .unwrap();

        let (roots, recursive) = export_roots(&scene, false);
        let mut registry = TextureNameRegistry::new();
        let graph = discover(&scene, &roots, recursive, &mut registry, false).unwrap();

        assert_eq!(graph.meshes().len(), 1);
        assert_eq!(graph.meshes()[0].owner, a);
        assert_eq!(graph.materials().len(), 1);
        assert_eq!(graph.textures().len(), 1);
        assert_eq!(graph.expected_events(), 1 + 1 + 1 + 1);
        assert_eq!(graph.tree().unwrap().children.len(), 2);
    }

    #[test]
    fn test_invalid_texture_policy() {
        let mut scene = Scene::new("Village");
        scene.add_material(textured_material("Sky", "sky"));
        scene.add_image(Image::new("sky", "OPEN_EXR"));
        scene
            .add_object(SceneObject::mesh("Dome", "Dome").with_materials([Some("Sky")]), None)
            .unwrap();
        let roots = scene.roots();

        let strict = discover(&scene, &roots, true, &mut TextureNameRegistry::new(), false);
        assert!(strict.unwrap_err().is_invalid_texture());

        let tolerant = discover(&scene, &roots, true, &mut TextureNameRegistry::new(), true).unwrap();
        assert!(tolerant.textures().is_empty());
        assert_eq!(tolerant.materials().len(), 1);
    }
}
