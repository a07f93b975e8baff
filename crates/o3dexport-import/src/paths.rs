//! Locations of an exported scene inside a project

use std::path::{Path, PathBuf};

/// Extension the asset processor gives built models
pub const MODEL_PRODUCT_EXTENSION: &str = "fbx.azmodel";

/// Extension the asset processor gives built materials
pub const MATERIAL_PRODUCT_EXTENSION: &str = "azmaterial";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    project_root: PathBuf,
    scene_name: String,
}

impl AssetPaths {
    pub fn new(project_root: impl Into<PathBuf>, scene_name: impl Into<String>) -> Self {
        Self { project_root: project_root.into(), scene_name: scene_name.into() }
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// `Assets/Scenes/<scene>`
    pub fn scene_dir(&self) -> String {
        format!("Assets/Scenes/{}", self.scene_name)
    }

    /// `<project>/Assets/Scenes/<scene>/<scene>.sgr`
    pub fn scene_graph_path(&self) -> PathBuf {
        self.project_root
            .join("Assets")
            .join("Scenes")
            .join(&self.scene_name)
            .join(format!("{}.sgr", self.scene_name))
    }

    /// Product path of a built mesh, relative to the project
    pub fn mesh_product_path(&self, mesh: &str) -> String {
        format!("{}/Meshes/{}.{}", self.scene_dir(), mesh, MODEL_PRODUCT_EXTENSION)
    }

    /// Product path of a built material, relative to the project
    pub fn material_product_path(&self, material: &str) -> String {
        format!("{}/Materials/{}.{}", self.scene_dir(), material, MATERIAL_PRODUCT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_paths() {
        let paths = AssetPaths::new("/games/Village", "Town");
        assert_eq!(paths.mesh_product_path("Wall_001"), "Assets/Scenes/Town/Meshes/Wall_001.fbx.azmodel");
        assert_eq!(paths.material_product_path("Brick"), "Assets/Scenes/Town/Materials/Brick.azmaterial");
        assert!(paths.scene_graph_path().ends_with("Assets/Scenes/Town/Town.sgr"));
    }
}
