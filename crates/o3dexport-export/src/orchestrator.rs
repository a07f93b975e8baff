//! Export orchestration
//!
//! [`ExportRun`] writes a discovered [`SceneGraph`] one unit at a time:
//! every texture and its channel variants, then materials, then meshes, then
//! the scene-graph document of whole-scene exports. Each unit yields one
//! [`ProgressEvent`]; the caller drives the run by pulling events and may
//! stop at any point with [`ExportRun::cancel`].

use std::fmt;
use std::path::{Path, PathBuf};

use o3dexport_core::{Error, Result};
use o3dexport_scene::Scene;

use crate::asset::{ColorChannel, TextureAsset};
use crate::discover::{discover, export_roots, SceneGraph};
use crate::json::DocumentWriter;
use crate::log::ExportLog;
use crate::material::{emit, EmitOptions, O3Material};
use crate::mesh::{export_reset_mesh, MeshExporter};
use crate::naming::TextureNameRegistry;
use crate::settings::{AssetCategory, ExportSettings};
use crate::textures::ImageIo;

/// Discovers what `settings` asks to export from `scene`
pub fn plan_export(scene: &Scene, settings: &ExportSettings, registry: &mut TextureNameRegistry) -> Result<SceneGraph> {
    let (roots, recursive) = export_roots(scene, settings.selected_only);
    discover(scene, &roots, recursive, registry, settings.allow_invalid_textures)
}

/// Result of one export unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Written,
    /// The file existed and overwriting this category is off
    Skipped,
    Failed(String),
}

impl UnitOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitOutcome::Failed(_))
    }
}

/// One finished export unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position in the run
    pub index: usize,
    pub total: usize,
    pub category: AssetCategory,
    pub name: String,
    pub path: PathBuf,
    pub outcome: UnitOutcome,
}

impl ProgressEvent {
    /// Completed fraction of the run
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.index as f32 / self.total as f32
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {} '{}' ", self.index, self.total, self.category, self.name)?;
        match &self.outcome {
            UnitOutcome::Written => write!(f, "exported to {}", self.path.display()),
            UnitOutcome::Skipped => write!(f, "skipped, {} exists", self.path.display()),
            UnitOutcome::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// Counts of a finished or cancelled run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub expected: usize,
    pub cancelled: bool,
}

impl ExportSummary {
    /// Units that left a usable file behind
    pub fn exported(&self) -> usize {
        self.written + self.skipped
    }

    fn record(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Written => self.written += 1,
            UnitOutcome::Skipped => self.skipped += 1,
            UnitOutcome::Failed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    /// `variant` 0 is the texture itself, `n` its n-th channel variant
    ExportingTextures { texture: usize, variant: usize },
    ExportingMaterials { index: usize },
    ExportingMeshes { index: usize },
    ExportingSceneGraph,
    Done,
    Cancelled,
}

/// A running export
pub struct ExportRun<'a> {
    scene: &'a mut Scene,
    graph: &'a SceneGraph,
    settings: &'a ExportSettings,
    mesh_exporter: &'a mut dyn MeshExporter,
    image_io: &'a dyn ImageIo,
    emit_options: EmitOptions,
    writer: DocumentWriter,
    log: Option<ExportLog>,
    state: RunState,
    emitted: usize,
    summary: ExportSummary,
}

impl<'a> ExportRun<'a> {
    /// Checks the run preconditions and creates the output directories.
    ///
    /// Fails without touching any asset when the settings are invalid, an
    /// image is still loading, nothing would be written or an output
    /// directory cannot be created. With `log_dir` set, an export log is
    /// opened there.
    pub fn start(
        scene: &'a mut Scene,
        graph: &'a SceneGraph,
        settings: &'a ExportSettings,
        mesh_exporter: &'a mut dyn MeshExporter,
        image_io: &'a dyn ImageIo,
        log_dir: Option<&Path>,
    ) -> Result<Self> {
        settings.validate()?;
        if !scene.images_ready() {
            return Err(Error::ImagesNotReady);
        }
        if graph.is_empty() {
            return Err(Error::NothingToExport);
        }

        for dir in settings.output_dirs() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreation { path: dir.clone(), source })?;
        }

        let log = match log_dir {
            Some(dir) => match ExportLog::create(dir, &settings.scene_name) {
                Ok(log) => Some(log),
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), error = %err, "cannot open export log");
                    None
                }
            },
            None => None,
        };

        let expected = graph.expected_events();
        tracing::info!(scene = %settings.scene_name, expected, "starting export");

        Ok(Self {
            scene,
            graph,
            settings,
            mesh_exporter,
            image_io,
            emit_options: EmitOptions::from_settings(settings),
            writer: DocumentWriter::new(),
            log,
            state: RunState::Init,
            emitted: 0,
            summary: ExportSummary { expected, ..ExportSummary::default() },
        })
    }

    pub fn expected_events(&self) -> usize {
        self.summary.expected
    }

    pub fn summary(&self) -> ExportSummary {
        self.summary
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(ExportLog::path)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Done | RunState::Cancelled)
    }

    /// Stops the run. Files already written stay; the log is closed.
    pub fn cancel(&mut self) -> ExportSummary {
        if !self.is_finished() {
            self.state = RunState::Cancelled;
            self.summary.cancelled = true;
            tracing::info!(done = self.emitted, total = self.summary.expected, "export cancelled");
            if let Some(log) = self.log.as_mut() {
                log.line(&format!("cancelled after [{}/{}]", self.emitted, self.summary.expected));
                log.close_silently();
            }
        }
        self.summary
    }

    /// Pulls every remaining event and returns the summary
    pub fn run_to_end(mut self) -> ExportSummary {
        while self.advance().is_some() {}
        self.summary
    }

    /// Performs the next export unit
    pub fn advance(&mut self) -> Option<ProgressEvent> {
        let graph = self.graph;
        loop {
            match self.state {
                RunState::Init => {
                    self.state = RunState::ExportingTextures { texture: 0, variant: 0 };
                }
                RunState::ExportingTextures { texture, variant } => {
                    let Some(asset) = graph.textures().as_slice().get(texture) else {
                        self.state = RunState::ExportingMaterials { index: 0 };
                        continue;
                    };
                    let event = if variant == 0 {
                        self.export_texture(asset)
                    } else {
                        let variants = asset.variant_names();
                        let Some((channel, file_name)) = variants.get(variant - 1) else {
                            self.state = RunState::ExportingTextures { texture: texture + 1, variant: 0 };
                            continue;
                        };
                        self.export_variant(asset, *channel, file_name)
                    };
                    self.state = RunState::ExportingTextures { texture, variant: variant + 1 };
                    return Some(event);
                }
                RunState::ExportingMaterials { index } => {
                    let Some(material) = graph.materials().get(index) else {
                        self.state = RunState::ExportingMeshes { index: 0 };
                        continue;
                    };
                    self.state = RunState::ExportingMaterials { index: index + 1 };
                    return Some(self.export_material(material));
                }
                RunState::ExportingMeshes { index } => {
                    let Some(mesh) = graph.meshes().get(index) else {
                        self.state = RunState::ExportingSceneGraph;
                        continue;
                    };
                    self.state = RunState::ExportingMeshes { index: index + 1 };
                    let path = self.settings.mesh_path(&mesh.sanitized_name);
                    let axes = (self.settings.forward_axis, self.settings.up_axis);
                    let owner = mesh.owner;
                    return Some(self.unit(AssetCategory::Mesh, &mesh.sanitized_name, path, |run, path| {
                        export_reset_mesh(&mut *run.mesh_exporter, &mut *run.scene, owner, axes, path)
                    }));
                }
                RunState::ExportingSceneGraph => {
                    self.state = RunState::Done;
                    if let Some(tree) = graph.tree() {
                        let path = self.settings.scene_graph_path();
                        return Some(self.unit(AssetCategory::SceneGraph, &tree.name, path, |run, path| {
                            run.writer.write_scene_graph(tree, path)?;
                            Ok(())
                        }));
                    }
                }
                RunState::Done => {
                    self.finish();
                    return None;
                }
                RunState::Cancelled => return None,
            }
        }
    }

    fn export_texture(&mut self, asset: &TextureAsset) -> ProgressEvent {
        let path = self.settings.textures_dir().join(&asset.sanitized_name);
        self.unit(AssetCategory::Texture, &asset.sanitized_name, path, |run, path| {
            let image = run
                .scene
                .image(&asset.original_name)
                .ok_or_else(|| Error::ImageNotFound { name: asset.original_name.clone() })?;
            run.image_io.save_image(image, path)?;
            Ok(())
        })
    }

    fn export_variant(&mut self, asset: &TextureAsset, channel: ColorChannel, file_name: &str) -> ProgressEvent {
        let source = self.settings.textures_dir().join(&asset.sanitized_name);
        let path = self.settings.textures_dir().join(file_name);
        self.unit(AssetCategory::Texture, file_name, path, |run, path| {
            run.image_io.extract_channel(&source, channel, path)?;
            Ok(())
        })
    }

    fn export_material(&mut self, material: &O3Material) -> ProgressEvent {
        let path = self.settings.material_path(&material.name);
        self.unit(AssetCategory::Material, &material.name, path, |run, path| {
            let document = emit(&material.translation, run.graph.textures(), &run.emit_options);
            run.writer.write_material(&document, path)?;
            Ok(())
        })
    }

    /// Runs one unit unless its file exists and may not be replaced
    fn unit<F>(&mut self, category: AssetCategory, name: &str, path: PathBuf, write: F) -> ProgressEvent
    where
        F: FnOnce(&mut Self, &Path) -> Result<()>,
    {
        let outcome = if path.exists() && !self.settings.overwrite.allows(category) {
            tracing::debug!(%category, name, path = %path.display(), "keeping existing file");
            UnitOutcome::Skipped
        } else {
            match write(self, &path) {
                Ok(()) => {
                    tracing::info!(%category, name, path = %path.display(), "exported");
                    UnitOutcome::Written
                }
                Err(err) => {
                    tracing::error!(%category, name, error = %err, "export failed");
                    UnitOutcome::Failed(err.to_string())
                }
            }
        };

        self.emitted += 1;
        self.summary.record(&outcome);
        let event = ProgressEvent {
            index: self.emitted,
            total: self.summary.expected,
            category,
            name: name.to_string(),
            path,
            outcome,
        };
        if let Some(log) = self.log.as_mut() {
            log.line(&event.to_string());
        }
        event
    }

    fn finish(&mut self) {
        if let Some(mut log) = self.log.take() {
            log.close(self.summary.exported(), self.summary.expected);
        }
        if self.emitted != self.summary.expected {
            tracing::warn!(emitted = self.emitted, expected = self.summary.expected, "event count mismatch");
        }
    }
}

impl Iterator for ExportRun<'_> {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<ProgressEvent> {
        self.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_finished() {
            (0, Some(0))
        } else {
            let remaining = self.summary.expected.saturating_sub(self.emitted);
            (remaining, Some(remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use o3dexport_core::Axis;
    use o3dexport_scene::{ObjectId, SceneObject};

    struct TouchMesh;

    impl MeshExporter for TouchMesh {
        fn export_mesh(&mut self, _scene: &Scene, _object: ObjectId, _axes: (Axis, Axis), target: &Path) -> Result<()> {
            std::fs::write(target, b"mesh")?;
            Ok(())
        }
    }

    #[test]
    fn test_event_display() {
        let event = ProgressEvent {
            index: 2,
            total: 5,
            category: AssetCategory::Material,
            name: "Brick".to_string(),
            path: PathBuf::from("Brick.material"),
            outcome: UnitOutcome::Skipped,
        };
        assert_eq!(event.to_string(), "[2/5] material 'Brick' skipped, Brick.material exists");
        assert!((event.fraction() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_nothing_to_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("Empty");
        let settings = ExportSettings::new(dir.path(), "Empty").with_selected_only(true);
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut mesh = TouchMesh;
        let err = ExportRun::start(&mut scene, &graph, &settings, &mut mesh, &crate::textures::FsImageIo, None)
            .err()
            .unwrap();
        assert!(matches!(err, Error::NothingToExport));
        assert!(!settings.scene_dir().exists());
    }

    #[test]
    fn test_cancel_stops_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new("Village");
        scene.add_object(SceneObject::mesh("A", "A"), None).unwrap();
        scene.add_object(SceneObject::mesh("B", "B"), None).unwrap();
        let settings = ExportSettings::new(dir.path(), "Village");
        let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new()).unwrap();

        let mut mesh = TouchMesh;
        let mut run =
            ExportRun::start(&mut scene, &graph, &settings, &mut mesh, &crate::textures::FsImageIo, Some(dir.path()))
                .unwrap();
        assert_eq!(run.expected_events(), 3);
        let first = run.next().unwrap();
        assert_eq!(first.category, AssetCategory::Mesh);

        let summary = run.cancel();
        assert!(summary.cancelled);
        assert_eq!(summary.written, 1);
        assert!(run.next().is_none());

        let log = std::fs::read_to_string(run.log_path().unwrap()).unwrap();
        assert!(log.contains("cancelled after [1/3]"));
        assert!(!settings.scene_graph_path().exists());
    }
}
