//! Tests for whole export runs
//!
//! These tests cover:
//! - Event ordering and counts over textures, variants, materials and meshes
//! - Skipping files left by an earlier run
//! - The single mesh end-to-end scenario
//! - Run preconditions

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use o3dexport_core::document::{MaterialDocument, PropertyValue, SceneGraphDocument};
use o3dexport_core::{Axis, Error, Result};
use o3dexport_export::{
    plan_export, AssetCategory, ExportRun, ExportSettings, FsImageIo, MeshExporter, OverwritePolicy,
    TextureNameRegistry, UnitOutcome,
};
use o3dexport_scene::{Image, ObjectId, Scene, SceneLoader, SceneObject};
use tempfile::TempDir;

/// Two meshes under an empty; `Brick` samples one texture directly and two
/// channels of a mask, `Slate` uses a normal map
const VILLAGE_DUMP: &str = r#"{
    "name": "Village",
    "objects": [
        {"name": "House", "type": "EMPTY", "location": [4.0, 0.0, 0.0]},
        {"name": "Wall", "type": "MESH", "mesh": "Wall.001", "parent": "House", "material_slots": ["Brick"]},
        {"name": "Roof", "type": "MESH", "mesh": "Roof", "parent": "House",
         "rotation": {"mode": "AXIS_ANGLE", "axis_angle": [1.5707964, 0.0, 0.0, 1.0]},
         "material_slots": ["Slate", "Brick"]}
    ],
    "materials": [
        {
            "name": "Brick",
            "nodes": [
                {
                    "name": "Principled BSDF",
                    "type": "ShaderNodeBsdfPrincipled",
                    "inputs": [
                        {"name": "Base Color", "type": "RGBA", "default": [1.0, 1.0, 1.0, 1.0],
                         "link": {"node": "Brick Texture", "socket": "Color"}},
                        {"name": "Roughness", "type": "VALUE", "default": 0.5,
                         "link": {"node": "Split", "socket": "Green"}},
                        {"name": "Metallic", "type": "VALUE", "default": 0.0,
                         "link": {"node": "Split", "socket": "Blue"}}
                    ]
                },
                {"name": "Brick Texture", "type": "ShaderNodeTexImage", "image": "brick.png"},
                {"name": "Mask Texture", "type": "ShaderNodeTexImage", "image": "mask.png"},
                {
                    "name": "Split",
                    "type": "ShaderNodeSeparateColor",
                    "inputs": [
                        {"name": "Color", "type": "RGBA", "default": [0.0, 0.0, 0.0, 1.0],
                         "link": {"node": "Mask Texture", "socket": "Color"}}
                    ]
                }
            ]
        },
        {
            "name": "Slate",
            "nodes": [
                {
                    "name": "Principled BSDF",
                    "type": "ShaderNodeBsdfPrincipled",
                    "inputs": [
                        {"name": "Base Color", "type": "RGBA", "default": [0.2, 0.2, 0.25, 1.0]},
                        {"name": "Normal", "type": "VECTOR", "default": [0.0, 0.0, 0.0],
                         "link": {"node": "Normal Map", "socket": "Normal"}}
                    ]
                },
                {"name": "Slate Texture", "type": "ShaderNodeTexImage", "image": "slate.png"},
                {
                    "name": "Normal Map",
                    "type": "ShaderNodeNormalMap",
                    "inputs": [
                        {"name": "Strength", "type": "VALUE", "default": 0.8},
                        {"name": "Color", "type": "RGBA", "default": [0.5, 0.5, 1.0, 1.0],
                         "link": {"node": "Slate Texture", "socket": "Color"}}
                    ]
                }
            ]
        }
    ],
    "images": [
        {"name": "brick.png", "file_format": "PNG", "filepath": "src/brick.png"},
        {"name": "mask.png", "file_format": "PNG", "filepath": "src/mask.png"},
        {"name": "slate.png", "file_format": "PNG", "filepath": "src/slate.png"}
    ]
}"#;

/// One mesh with an untextured material
const SINGLE_DUMP: &str = r#"{
    "name": "Single",
    "objects": [
        {"name": "Crate", "type": "MESH", "mesh": "Crate", "material_slots": ["Wood"]}
    ],
    "materials": [
        {
            "name": "Wood",
            "nodes": [
                {
                    "name": "Principled BSDF",
                    "type": "ShaderNodeBsdfPrincipled",
                    "inputs": [{"name": "Base Color", "type": "RGBA", "default": [0.8, 0.8, 0.8, 1.0]}]
                }
            ]
        }
    ]
}"#;

/// Writes every mesh as a small marker file
#[derive(Default)]
struct MarkerMesh {
    exported: Vec<String>,
}

impl MeshExporter for MarkerMesh {
    fn export_mesh(&mut self, scene: &Scene, object: ObjectId, _axes: (Axis, Axis), target: &Path) -> Result<()> {
        self.exported.push(scene[object].name.clone());
        fs::write(target, b"mesh")?;
        Ok(())
    }
}

/// Writes the dump and its source images, returns the dump path
fn write_village(dir: &TempDir) -> PathBuf {
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    for name in ["brick.png", "mask.png", "slate.png"] {
        RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 255])).save(src.join(name)).unwrap();
    }
    let path = dir.path().join("village.json");
    fs::write(&path, VILLAGE_DUMP).unwrap();
    path
}

fn load(dir: &TempDir, file: &str, contents: &str) -> Scene {
    let path = dir.path().join(file);
    fs::write(&path, contents).unwrap();
    SceneLoader::load_file(&path).unwrap()
}

mod run_tests {
    use super::*;

    #[test]
    fn test_event_order_and_count() {
        let dir = TempDir::new().unwrap();
        let mut scene = SceneLoader::load_file(write_village(&dir)).unwrap();
        let settings = ExportSettings::new(dir.path().join("project"), "Village");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        // brick + mask with Green and Blue + slate, two materials, two meshes, one scene graph
        let textures = 1 + (1 + 2) + 1;
        assert_eq!(graph.texture_export_count(), textures);
        assert_eq!(graph.expected_events(), textures + 2 + 2 + 1);

        let mut meshes = MarkerMesh::default();
        let run = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None).unwrap();
        let events: Vec<_> = run.collect();
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| e.outcome == UnitOutcome::Written), "{:?}", events);
        assert_eq!(events.iter().map(|e| e.index).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());

        let categories: Vec<_> = events.iter().map(|e| e.category).collect();
        assert!(categories.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(categories[9], AssetCategory::SceneGraph);

        let names: Vec<_> = events[..5].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["brick.png", "mask.png", "mask_Green.png", "mask_Blue.png", "slate_normal.png"]);
        assert_eq!(meshes.exported, ["Wall", "Roof"]);

        let textures_dir = settings.textures_dir();
        let green = image::open(textures_dir.join("mask_Green.png")).unwrap().to_luma8();
        assert_eq!(green.get_pixel(0, 0)[0], 100);
        assert!(settings.mesh_path("Wall_001").exists());
    }

    #[test]
    fn test_material_and_scene_graph_documents() {
        let dir = TempDir::new().unwrap();
        let mut scene = SceneLoader::load_file(write_village(&dir)).unwrap();
        let settings = ExportSettings::new(dir.path().join("project"), "Village");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();
        let mut meshes = MarkerMesh::default();
        ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .unwrap()
            .run_to_end();

        let brick: MaterialDocument =
            serde_json::from_str(&fs::read_to_string(settings.material_path("Brick")).unwrap()).unwrap();
        assert_eq!(
            brick.get("baseColor.textureMap"),
            Some(&PropertyValue::Text("@projectroot@/Assets/Scenes/Village/Textures/brick.png".into()))
        );
        assert_eq!(
            brick.get("roughness.textureMap"),
            Some(&PropertyValue::Text("@projectroot@/Assets/Scenes/Village/Textures/mask_Green.png".into()))
        );
        assert_eq!(brick.get("metallic.useTexture"), Some(&PropertyValue::Bool(true)));

        let slate: MaterialDocument =
            serde_json::from_str(&fs::read_to_string(settings.material_path("Slate")).unwrap()).unwrap();
        assert_eq!(
            slate.get("normal.textureMap"),
            Some(&PropertyValue::Text("@projectroot@/Assets/Scenes/Village/Textures/slate_normal.png".into()))
        );
        assert_eq!(slate.get("normal.factor"), Some(&PropertyValue::Float(0.8)));
        assert_eq!(slate.get("normal.flipY"), Some(&PropertyValue::Bool(true)));

        let tree: SceneGraphDocument =
            serde_json::from_str(&fs::read_to_string(settings.scene_graph_path()).unwrap()).unwrap();
        assert_eq!(tree.name, "Village");
        assert_eq!(tree.node_count(), 3);
        let house = &tree.children[0];
        assert_eq!(house.transform.translate, [4.0, 0.0, 0.0]);
        let roof = &house.children()[1];
        assert_eq!(roof.mesh.as_deref(), Some("Roof"));
        assert_eq!(roof.materials(), ["Slate", "Brick"]);
        assert!((roof.transform.rotate[2] - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut scene = SceneLoader::load_file(write_village(&dir)).unwrap();
        let settings = ExportSettings::new(dir.path().join("project"), "Village")
            .with_overwrite(OverwritePolicy { meshes: true, ..OverwritePolicy::default() });
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        fs::create_dir_all(settings.materials_dir()).unwrap();
        fs::write(settings.material_path("Brick"), "hand edited").unwrap();
        fs::create_dir_all(settings.meshes_dir()).unwrap();
        fs::write(settings.mesh_path("Roof"), "old").unwrap();

        let mut meshes = MarkerMesh::default();
        let events: Vec<_> = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .unwrap()
            .collect();
        assert_eq!(events.len(), graph.expected_events());

        let brick = events.iter().find(|e| e.name == "Brick").unwrap();
        assert_eq!(brick.outcome, UnitOutcome::Skipped);
        assert_eq!(fs::read_to_string(settings.material_path("Brick")).unwrap(), "hand edited");

        let roof = events.iter().find(|e| e.name == "Roof").unwrap();
        assert_eq!(roof.outcome, UnitOutcome::Written);
        assert_eq!(fs::read(settings.mesh_path("Roof")).unwrap(), b"mesh");
    }

    #[test]
    fn test_failed_texture_keeps_event_count() {
        let dir = TempDir::new().unwrap();
        let mut scene = SceneLoader::load_file(write_village(&dir)).unwrap();
        fs::remove_file(dir.path().join("src").join("mask.png")).unwrap();
        let settings = ExportSettings::new(dir.path().join("project"), "Village");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut meshes = MarkerMesh::default();
        let run = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, Some(dir.path())).unwrap();
        let summary = run.run_to_end();
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.written, 7);
        assert_eq!(summary.exported() + summary.failed, summary.expected);
    }

    #[test]
    fn test_selected_only_has_no_scene_graph() {
        let dir = TempDir::new().unwrap();
        let mut scene = Scene::new("Yard");
        scene.add_object(SceneObject::mesh("Fence", "Fence.002").selected(true), None).unwrap();
        scene.add_object(SceneObject::mesh("Gate", "Gate"), None).unwrap();
        let settings = ExportSettings::new(dir.path(), "Yard").with_selected_only(true);
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();
        assert_eq!(graph.expected_events(), 1);

        let mut meshes = MarkerMesh::default();
        let events: Vec<_> = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .unwrap()
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, settings.mesh_path("Fence_002"));
        assert!(!settings.scene_graph_path().exists());
    }
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_mesh_end_to_end() {
        let dir = TempDir::new().unwrap();
        let mut scene = load(&dir, "single.json", SINGLE_DUMP);
        let settings = ExportSettings::new(dir.path().join("project"), "Single");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();
        assert_eq!(graph.expected_events(), 3);

        let mut meshes = MarkerMesh::default();
        let summary = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, Some(dir.path()))
            .unwrap()
            .run_to_end();
        assert_eq!(summary.written, 3);

        let tree: SceneGraphDocument =
            serde_json::from_str(&fs::read_to_string(settings.scene_graph_path()).unwrap()).unwrap();
        assert_eq!(tree.children.len(), 1);
        let node = &tree.children[0];
        assert_eq!(node.mesh.as_deref(), Some("Crate"));
        assert_eq!(node.materials(), ["Wood"]);
        assert_eq!(node.transform.rotate, [0.0, 0.0, 0.0]);
        assert!(node.children.is_none());

        let wood: MaterialDocument =
            serde_json::from_str(&fs::read_to_string(settings.material_path("Wood")).unwrap()).unwrap();
        assert_eq!(wood.get("baseColor.color"), Some(&PropertyValue::Color([0.8, 0.8, 0.8])));
        assert!(wood.get("baseColor.textureMap").is_none());

        assert_eq!(fs::read_dir(settings.textures_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(settings.meshes_dir()).unwrap().count(), 1);

        let log = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "log"))
            .unwrap();
        assert!(fs::read_to_string(log).unwrap().trim_end().ends_with("[3/3] exported"));
    }
}

mod precondition_tests {
    use super::*;

    #[test]
    fn test_images_not_ready() {
        let dir = TempDir::new().unwrap();
        let mut scene = load(&dir, "single.json", SINGLE_DUMP);
        scene.add_image(Image::new("loading.png", "PNG").without_data());
        let settings = ExportSettings::new(dir.path(), "Single");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut meshes = MarkerMesh::default();
        let err = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ImagesNotReady));
        assert!(err.retry_hint().is_some());
        assert!(!settings.scene_dir().exists());
    }

    #[test]
    fn test_invalid_axes() {
        let dir = TempDir::new().unwrap();
        let mut scene = load(&dir, "single.json", SINGLE_DUMP);
        let settings = ExportSettings::new(dir.path(), "Single").with_axes(Axis::NegZ, Axis::Z);
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut meshes = MarkerMesh::default();
        let err = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_directory_creation_failure() {
        let dir = TempDir::new().unwrap();
        let mut scene = load(&dir, "single.json", SINGLE_DUMP);
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "not a directory").unwrap();
        let settings = ExportSettings::new(&blocker, "Single");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut meshes = MarkerMesh::default();
        let err = ExportRun::start(&mut scene, &graph, &settings, &mut meshes, &FsImageIo, None)
            .err()
            .unwrap();
        assert!(matches!(err, Error::DirectoryCreation { .. }));
        assert!(meshes.exported.is_empty());
    }
}
