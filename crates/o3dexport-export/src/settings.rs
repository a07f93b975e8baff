//! Export settings and the derived output layout

use std::path::{Path, PathBuf};

use o3dexport_core::{Axis, Error, Result};
use serde::{Deserialize, Serialize};

/// Marker files of an engine project or gem directory
pub const PROJECT_MARKERS: [&str; 2] = ["project.json", "gem.json"];

/// Prefix engine asset paths are resolved against
pub const PROJECT_ROOT_ALIAS: &str = "@projectroot@";

/// Extension of the scene-graph document
pub const SCENE_GRAPH_EXTENSION: &str = "sgr";
/// Extension of material documents
pub const MATERIAL_EXTENSION: &str = "material";
/// Extension of exported meshes
pub const MESH_EXTENSION: &str = "fbx";

/// Kind of asset an export unit produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetCategory {
    Texture,
    Material,
    Mesh,
    SceneGraph,
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetCategory::Texture => "texture",
            AssetCategory::Material => "material",
            AssetCategory::Mesh => "mesh",
            AssetCategory::SceneGraph => "scene graph",
        };
        f.write_str(name)
    }
}

/// Which categories may replace files left by an earlier export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwritePolicy {
    pub textures: bool,
    pub materials: bool,
    pub meshes: bool,
    pub scene_graph: bool,
}

impl OverwritePolicy {
    pub fn all() -> Self {
        Self { textures: true, materials: true, meshes: true, scene_graph: true }
    }

    pub fn allows(&self, category: AssetCategory) -> bool {
        match category {
            AssetCategory::Texture => self.textures,
            AssetCategory::Material => self.materials,
            AssetCategory::Mesh => self.meshes,
            AssetCategory::SceneGraph => self.scene_graph,
        }
    }
}

/// Immutable settings of one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Project or gem directory the `Assets/` tree is written into
    pub output_root: PathBuf,
    pub scene_name: String,
    pub forward_axis: Axis,
    pub up_axis: Axis,
    pub overwrite: OverwritePolicy,
    pub flip_normal_x: bool,
    pub flip_normal_y: bool,
    /// Drop unsupported or missing images instead of refusing the run
    pub allow_invalid_textures: bool,
    /// Export the selected objects only, without a scene graph
    pub selected_only: bool,
}

impl ExportSettings {
    pub fn new(output_root: impl Into<PathBuf>, scene_name: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            scene_name: scene_name.into(),
            forward_axis: Axis::Y,
            up_axis: Axis::Z,
            overwrite: OverwritePolicy::default(),
            flip_normal_x: false,
            flip_normal_y: true,
            allow_invalid_textures: false,
            selected_only: false,
        }
    }

    pub fn with_axes(mut self, forward: Axis, up: Axis) -> Self {
        self.forward_axis = forward;
        self.up_axis = up;
        self
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_normal_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_normal_x = flip_x;
        self.flip_normal_y = flip_y;
        self
    }

    pub fn with_allow_invalid_textures(mut self, allow: bool) -> Self {
        self.allow_invalid_textures = allow;
        self
    }

    pub fn with_selected_only(mut self, selected_only: bool) -> Self {
        self.selected_only = selected_only;
        self
    }

    /// Checks the settings can drive an export
    pub fn validate(&self) -> Result<()> {
        if self.scene_name.trim().is_empty() {
            return Err(Error::invalid_config("scene name is empty"));
        }
        if self.scene_name.contains(['/', '\\']) {
            return Err(Error::invalid_config(format!(
                "scene name '{}' contains a path separator",
                self.scene_name
            )));
        }
        if self.forward_axis.unsigned() == self.up_axis.unsigned() {
            return Err(Error::invalid_config(format!(
                "forward axis {} and up axis {} must differ",
                self.forward_axis, self.up_axis
            )));
        }
        Ok(())
    }

    /// `Assets/Scenes/<scene>` relative to the output root, `/` separated
    pub fn scene_asset_dir(&self) -> String {
        format!("Assets/Scenes/{}", self.scene_name)
    }

    /// Directory relative to the output root that textures are written to
    pub fn texture_asset_dir(&self) -> String {
        format!("{}/Textures", self.scene_asset_dir())
    }

    pub fn scene_dir(&self) -> PathBuf {
        self.output_root.join("Assets").join("Scenes").join(&self.scene_name)
    }

    pub fn textures_dir(&self) -> PathBuf {
        self.scene_dir().join("Textures")
    }

    pub fn materials_dir(&self) -> PathBuf {
        self.scene_dir().join("Materials")
    }

    pub fn meshes_dir(&self) -> PathBuf {
        self.scene_dir().join("Meshes")
    }

    /// `<scene dir>/<scene>.sgr`
    pub fn scene_graph_path(&self) -> PathBuf {
        self.scene_dir()
            .join(format!("{}.{}", self.scene_name, SCENE_GRAPH_EXTENSION))
    }

    pub fn material_path(&self, material: &str) -> PathBuf {
        self.materials_dir().join(format!("{}.{}", material, MATERIAL_EXTENSION))
    }

    pub fn mesh_path(&self, sanitized_mesh: &str) -> PathBuf {
        self.meshes_dir().join(format!("{}.{}", sanitized_mesh, MESH_EXTENSION))
    }

    /// Output directories in creation order
    pub fn output_dirs(&self) -> [PathBuf; 4] {
        [self.scene_dir(), self.textures_dir(), self.materials_dir(), self.meshes_dir()]
    }
}

/// True when `dir` holds a `project.json` or `gem.json`
pub fn is_project_dir(dir: &Path) -> bool {
    PROJECT_MARKERS.iter().any(|marker| dir.join(marker).is_file())
}

/// Fails with [`Error::NotAProjectDirectory`] unless `dir` is a project or gem
pub fn ensure_project_dir(dir: &Path) -> Result<()> {
    if is_project_dir(dir) {
        Ok(())
    } else {
        Err(Error::NotAProjectDirectory(dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExportSettings::new("/project", "Village");
        assert_eq!(settings.forward_axis, Axis::Y);
        assert_eq!(settings.up_axis, Axis::Z);
        assert!(settings.flip_normal_y);
        assert!(!settings.flip_normal_x);
        assert_eq!(settings.overwrite, OverwritePolicy::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_layout() {
        let settings = ExportSettings::new("/project", "Village");
        assert_eq!(settings.textures_dir(), PathBuf::from("/project/Assets/Scenes/Village/Textures"));
        assert_eq!(
            settings.scene_graph_path(),
            PathBuf::from("/project/Assets/Scenes/Village/Village.sgr")
        );
        assert_eq!(
            settings.material_path("Brick"),
            PathBuf::from("/project/Assets/Scenes/Village/Materials/Brick.material")
        );
        assert_eq!(settings.texture_asset_dir(), "Assets/Scenes/Village/Textures");
    }

    #[test]
    fn test_axes_must_differ_ignoring_sign() {
        let settings = ExportSettings::new("/project", "Village").with_axes(Axis::NegZ, Axis::Z);
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig { .. })));

        let settings = ExportSettings::new("/project", "Village").with_axes(Axis::NegY, Axis::Z);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_scene_name() {
        assert!(ExportSettings::new("/project", "  ").validate().is_err());
    }

    #[test]
    fn test_project_dir_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_project_dir(dir.path()));
        assert!(ensure_project_dir(dir.path()).is_err());

        std::fs::write(dir.path().join("gem.json"), "{}").unwrap();
        assert!(is_project_dir(dir.path()));
    }
}
